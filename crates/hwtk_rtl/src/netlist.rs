//! The arena-backed RTL graph: expression building, assignments, static
//! evaluation, and structural checks.

use crate::arena::Arena;
use crate::assignment::Assignment;
use crate::error::RtlError;
use crate::ids::{AssignmentId, NodeRef, OperatorId, SignalId};
use crate::operator::{OpKind, Operand, Operator, Term};
use crate::signal::{SimEnvId, Signal, SignalKind};
use crate::types::{HdlType, Width};
use crate::value::{Payload, Value};
use hwtk_common::Bits;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

/// Default prefix of auto-named nets.
pub const DEFAULT_ANONYMOUS_PREFIX: &str = "sig_";

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&mut self, sig: SignalId, other: impl Into<Term>) -> Result<SignalId, RtlError> {
                self.nary_op(sig, OpKind::$kind, [other.into()])
            }
        )*
    };
}

/// All signals, operators, and assignments of one unit.
///
/// Nodes are never removed. `Clone` is a deep copy; ids stay valid in the copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Netlist {
    signals: Arena<SignalId, Signal>,
    operators: Arena<OperatorId, Operator>,
    assignments: Arena<AssignmentId, Assignment>,
    anonymous_prefix: String,
}

/// Bookkeeping of one static evaluation pass.
#[derive(Debug, Default)]
struct EvalWalk {
    /// Nets on the current evaluation path.
    active: BTreeSet<SignalId>,
    /// Nets already folded.
    done: BTreeSet<SignalId>,
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Netlist {
    /// Creates an empty netlist naming anonymous nets `sig_<n>`.
    pub fn new() -> Self {
        Self::with_anonymous_prefix(DEFAULT_ANONYMOUS_PREFIX)
    }

    /// Creates an empty netlist with a custom prefix for anonymous nets.
    pub fn with_anonymous_prefix(prefix: impl Into<String>) -> Self {
        Self {
            signals: Arena::new(),
            operators: Arena::new(),
            assignments: Arena::new(),
            anonymous_prefix: prefix.into(),
        }
    }

    // ---- lookup ----------------------------------------------------------

    /// Returns a signal.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another netlist.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Mutable variant of [`signal`](Self::signal).
    pub fn signal_mut(&mut self, id: SignalId) -> &mut Signal {
        &mut self.signals[id]
    }

    /// Returns a signal, or `None` for foreign ids.
    pub fn try_signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.try_get(id)
    }

    /// Returns an operator.
    pub fn operator(&self, id: OperatorId) -> &Operator {
        &self.operators[id]
    }

    /// Returns an assignment.
    pub fn assignment(&self, id: AssignmentId) -> &Assignment {
        &self.assignments[id]
    }

    /// Iterates over all signals in creation order.
    pub fn signals(&self) -> impl Iterator<Item = (SignalId, &Signal)> {
        self.signals.iter()
    }

    /// Iterates over all operators in creation order.
    pub fn operators(&self) -> impl Iterator<Item = (OperatorId, &Operator)> {
        self.operators.iter()
    }

    /// Iterates over all assignments in creation order.
    pub fn assignments(&self) -> impl Iterator<Item = (AssignmentId, &Assignment)> {
        self.assignments.iter()
    }

    /// Number of signals.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Finds a signal by name. Anonymous names are searchable too.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// Type of an operand.
    pub fn operand_type(&self, operand: &Operand) -> HdlType {
        match operand {
            Operand::Value(v) => v.ty().clone(),
            Operand::Signal(s) => self.signals[*s].ty.clone(),
        }
    }

    /// Current value of an operand.
    pub fn operand_value(&self, operand: &Operand) -> Value {
        match operand {
            Operand::Value(v) => v.clone(),
            Operand::Signal(s) => self.signals[*s].value.clone(),
        }
    }

    // ---- signal creation -------------------------------------------------

    /// Creates a named wire. Name uniqueness is the caller's concern.
    pub fn sig(&mut self, name: impl Into<String>, ty: HdlType) -> SignalId {
        self.signals
            .alloc(Signal::new(name.into(), false, ty, SignalKind::Wire))
    }

    /// Creates a named wire with a default used while nothing drives it.
    pub fn sig_with_default(
        &mut self,
        name: impl Into<String>,
        ty: HdlType,
        default: impl Into<Term>,
    ) -> Result<SignalId, RtlError> {
        let default = self.check_operand(default.into())?;
        let id = self.sig(name, ty);
        self.set_default(id, default);
        Ok(id)
    }

    /// Replaces the default of `id`. A default that names another net makes
    /// `id` listen to that net.
    fn set_default(&mut self, id: SignalId, default: Operand) {
        if let Some(Operand::Signal(old)) = self.signals[id].default {
            self.signals[old].endpoints.remove(&NodeRef::Default(id));
        }
        if let Operand::Signal(src) = default {
            self.signals[src].endpoints.insert(NodeRef::Default(id));
        }
        self.signals[id].default = Some(default);
    }

    /// Creates an auto-named wire.
    pub fn anonymous(&mut self, ty: HdlType) -> SignalId {
        let name = format!("{}{}", self.anonymous_prefix, self.signals.next_id().as_raw());
        self.signals.alloc(Signal::new(name, true, ty, SignalKind::Wire))
    }

    /// Creates an auto-named, driver-less net holding `value`.
    pub fn constant(&mut self, value: Value) -> SignalId {
        let id = self.anonymous(value.ty().clone());
        let s = &mut self.signals[id];
        s.default = Some(Operand::Value(value.clone()));
        s.previous = value.clone();
        s.value = value;
        id
    }

    /// Creates a parameter net holding `value`.
    pub fn param(&mut self, name: impl Into<String>, value: Value) -> SignalId {
        let id = self
            .signals
            .alloc(Signal::new(name.into(), false, value.ty().clone(), SignalKind::Param));
        self.set_param(id, value);
        id
    }

    /// Replaces the value of a parameter (or any driver-less net).
    ///
    /// Everything computed from it is re-folded on the next static evaluation.
    pub fn set_param(&mut self, id: SignalId, value: Value) {
        self.set_default(id, Operand::Value(value.clone()));
        self.signals[id].value = value;
    }

    /// Creates a register clocked by `clk` together with its `<name>_next`
    /// shadow net.
    ///
    /// The register starts at `reset` (uninitialized if `None`); the shadow
    /// defaults to the register so an unassigned register holds its value.
    pub fn reg(
        &mut self,
        name: impl Into<String>,
        ty: HdlType,
        clk: SignalId,
        reset: Option<Value>,
    ) -> Result<SignalId, RtlError> {
        self.check_signal(clk)?;
        let name = name.into();
        let reg = self.signals.next_id();
        let next = SignalId::from_raw(reg.as_raw() + 1);
        self.signals.alloc(Signal::new(
            name.clone(),
            false,
            ty.clone(),
            SignalKind::Register { next, clk },
        ));
        self.signals.alloc(Signal::new(
            format!("{name}_next"),
            false,
            ty,
            SignalKind::Next { register: reg },
        ));
        if let Some(v) = reset {
            let r = &mut self.signals[reg];
            r.default = Some(Operand::Value(v.clone()));
            r.previous = v.clone();
            r.value = v;
        }
        self.set_default(next, Operand::Signal(reg));
        Ok(reg)
    }

    /// The shadow net of a register, or the signal itself otherwise.
    pub fn write_target(&self, sig: SignalId) -> SignalId {
        match self.signals[sig].kind {
            SignalKind::Register { next, .. } => next,
            _ => sig,
        }
    }

    // ---- operand validation ----------------------------------------------

    /// Checks that `sig` belongs to this netlist.
    pub fn check_signal(&self, sig: SignalId) -> Result<SignalId, RtlError> {
        if self.signals.contains(sig) {
            Ok(sig)
        } else {
            Err(RtlError::InvalidOperand {
                found: format!("{sig}, which is not part of this netlist"),
            })
        }
    }

    /// Accepts values and signals of this netlist; rejects everything else.
    pub fn check_operand(&self, term: Term) -> Result<Operand, RtlError> {
        match term {
            Term::Value(v) => Ok(Operand::Value(v)),
            Term::Signal(s) => self.check_signal(s).map(Operand::Signal),
            Term::Interface(name) => Err(RtlError::InvalidOperand {
                found: format!("interface `{name}`"),
            }),
            Term::Type(ty) => Err(RtlError::InvalidOperand {
                found: format!("type {ty}"),
            }),
        }
    }

    // ---- expression building ---------------------------------------------

    /// Applies a unary operator, reusing the result of an earlier identical
    /// request on the same signal.
    pub fn unary_op(&mut self, sig: SignalId, kind: OpKind) -> Result<SignalId, RtlError> {
        self.check_signal(sig)?;
        if !kind.is_unary() {
            return Err(RtlError::InvalidOperand {
                found: format!("a single operand for {kind}"),
            });
        }
        if let Some(op) = self.signals[sig].used_ops.get(&kind) {
            return Ok(self.operators[*op].result);
        }
        let op = self.build_operator(kind, vec![Operand::Signal(sig)])?;
        self.signals[sig].used_ops.insert(kind, op);
        Ok(self.operators[op].result)
    }

    /// Applies an n-ary operator to `sig` followed by `operands`.
    ///
    /// Never cached: every call creates a fresh operator and result net.
    /// Every operand is validated before the graph is touched.
    pub fn nary_op(
        &mut self,
        sig: SignalId,
        kind: OpKind,
        operands: impl IntoIterator<Item = Term>,
    ) -> Result<SignalId, RtlError> {
        let mut ops = vec![Operand::Signal(self.check_signal(sig)?)];
        for term in operands {
            ops.push(self.check_operand(term)?);
        }
        let arity_ok = match kind.arity() {
            Some(n) => ops.len() == n,
            None => ops.len() >= 2,
        };
        if !arity_ok || kind.is_unary() {
            return Err(RtlError::InvalidOperand {
                found: format!("{} operands for {kind}", ops.len()),
            });
        }
        let op = self.build_operator(kind, ops)?;
        Ok(self.operators[op].result)
    }

    fn build_operator(&mut self, kind: OpKind, operands: Vec<Operand>) -> Result<OperatorId, RtlError> {
        let ty = self.result_type(kind, &operands)?;
        let result = self.anonymous(ty);
        let op = self.operators.alloc(Operator {
            kind,
            operands,
            result,
        });
        let r = &mut self.signals[result];
        r.drivers.insert(NodeRef::Operator(op));
        r.origin = Some(op);
        let inputs: Vec<SignalId> = self.operators[op].signal_operands().collect();
        for s in inputs {
            self.signals[s].endpoints.insert(NodeRef::Operator(op));
        }
        trace!(%op, %kind, result = %self.signals[result].name, "operator built");
        Ok(op)
    }

    fn result_type(&mut self, kind: OpKind, operands: &[Operand]) -> Result<HdlType, RtlError> {
        Ok(match kind {
            OpKind::RisingEdge | OpKind::FallingEdge => HdlType::Bool,
            k if k.is_comparison() => HdlType::Bool,
            OpKind::Index => HdlType::Bit,
            OpKind::Ternary => self.operand_type(&operands[1]),
            OpKind::Concat => {
                let mut fixed = 0u32;
                let mut dynamic = Vec::new();
                for o in operands {
                    match self.operand_type(o) {
                        HdlType::Vector {
                            width: Width::Signal(w),
                            ..
                        } => dynamic.push(w),
                        ty => fixed += ty.fixed_width().unwrap_or(0),
                    }
                }
                match dynamic.split_first() {
                    None => HdlType::vector(fixed),
                    Some((first, rest)) => {
                        let mut terms: Vec<Term> = rest.iter().map(|w| Term::Signal(*w)).collect();
                        terms.push(Term::Value(Value::int(i64::from(fixed))));
                        HdlType::vector_of(self.nary_op(*first, OpKind::Add, terms)?)
                    }
                }
            }
            OpKind::Slice => {
                let signed = match self.operand_type(&operands[0]) {
                    HdlType::Vector { signed, .. } => signed,
                    _ => None,
                };
                let bound = |o: &Operand| match o {
                    Operand::Value(v) => v.as_i64(),
                    Operand::Signal(_) => None,
                };
                let width = match (bound(&operands[1]), bound(&operands[2])) {
                    (Some(hi), Some(lo)) => Width::Fixed(
                        hi.checked_sub(lo)
                            .and_then(|span| span.checked_add(1))
                            .and_then(|w| u32::try_from(w).ok())
                            .unwrap_or(0),
                    ),
                    _ => {
                        let hi = self.lift(&operands[1]);
                        let span = self.nary_op(hi, OpKind::Sub, [Term::from(operands[2].clone())])?;
                        Width::Signal(self.nary_op(span, OpKind::Add, [Term::from(1)])?)
                    }
                };
                HdlType::Vector { width, signed }
            }
            _ => self.operand_type(&operands[0]),
        })
    }

    fn lift(&mut self, operand: &Operand) -> SignalId {
        match operand {
            Operand::Signal(s) => *s,
            Operand::Value(v) => self.constant(v.clone()),
        }
    }

    /// `NOT sig`, cached.
    pub fn op_not(&mut self, sig: SignalId) -> Result<SignalId, RtlError> {
        self.unary_op(sig, OpKind::Not)
    }

    /// `-sig`, cached.
    pub fn op_neg(&mut self, sig: SignalId) -> Result<SignalId, RtlError> {
        self.unary_op(sig, OpKind::Neg)
    }

    /// `RISING_EDGE(sig)`, cached.
    pub fn op_rising_edge(&mut self, sig: SignalId) -> Result<SignalId, RtlError> {
        self.unary_op(sig, OpKind::RisingEdge)
    }

    /// `FALLING_EDGE(sig)`, cached.
    pub fn op_falling_edge(&mut self, sig: SignalId) -> Result<SignalId, RtlError> {
        self.unary_op(sig, OpKind::FallingEdge)
    }

    binary_ops! {
        /// `sig AND other`.
        op_and => And,
        /// `sig OR other`.
        op_or => Or,
        /// `sig XOR other`.
        op_xor => Xor,
        /// `sig + other`.
        op_add => Add,
        /// `sig - other`.
        op_sub => Sub,
        /// `sig * other`.
        op_mul => Mul,
        /// `sig / other`.
        op_div => Div,
        /// `sig = other`.
        op_eq => Eq,
        /// `sig /= other`.
        op_neq => Neq,
        /// `sig < other`.
        op_lt => Lt,
        /// `sig <= other`.
        op_le => Le,
        /// `sig > other`.
        op_gt => Gt,
        /// `sig >= other`.
        op_ge => Ge,
        /// `sig & other`, `sig` being the high part.
        op_concat => Concat,
        /// `sig(other)`.
        op_index => Index,
    }

    /// `sig(hi DOWNTO lo)`.
    pub fn op_slice(
        &mut self,
        sig: SignalId,
        hi: impl Into<Term>,
        lo: impl Into<Term>,
    ) -> Result<SignalId, RtlError> {
        self.nary_op(sig, OpKind::Slice, [hi.into(), lo.into()])
    }

    /// `cond ? then : otherwise`.
    pub fn op_ternary(
        &mut self,
        cond: SignalId,
        then: impl Into<Term>,
        otherwise: impl Into<Term>,
    ) -> Result<SignalId, RtlError> {
        self.nary_op(cond, OpKind::Ternary, [then.into(), otherwise.into()])
    }

    /// The boolean reading of `sig`, per its type's conversion rule.
    pub fn op_is_on(&mut self, sig: SignalId) -> Result<SignalId, RtlError> {
        self.check_signal(sig)?;
        let ty = self.signals[sig].ty.clone();
        ty.convert_to_bool(self, sig)
    }

    // ---- assignments -----------------------------------------------------

    /// `dst <= src`, unconditionally.
    pub fn assign(&mut self, dst: SignalId, src: impl Into<Term>) -> Result<AssignmentId, RtlError> {
        self.assign_when(dst, src, [])
    }

    /// `dst <= src` while every signal in `cond` is `true`.
    ///
    /// Writes to a register go to its shadow net. When the destination's
    /// only driver is an index or slice operator (`a(i) <= src`), that
    /// operator is moved from the destination's drivers to its endpoints,
    /// turning the selection into a write-through.
    pub fn assign_when(
        &mut self,
        dst: SignalId,
        src: impl Into<Term>,
        cond: impl IntoIterator<Item = SignalId>,
    ) -> Result<AssignmentId, RtlError> {
        let src = self.check_operand(src.into())?;
        self.check_signal(dst)?;
        let cond: BTreeSet<SignalId> = cond.into_iter().collect();
        for c in &cond {
            self.check_signal(*c)?;
        }
        let dst = self.write_target(dst);
        let indexed = self.is_indexed_by_sole_driver(dst).map(NodeRef::Operator);
        if cond.is_empty() {
            let taken = self.signals[dst]
                .drivers
                .iter()
                .any(|d| Some(*d) != indexed && self.is_unconditional(*d));
            if taken {
                return Err(RtlError::MultipleDrivers {
                    signal: self.signals[dst].name.clone(),
                });
            }
        }
        if let Some(op) = indexed {
            let s = &mut self.signals[dst];
            s.drivers.remove(&op);
            s.endpoints.insert(op);
        }
        let assignment = Assignment { src, dst, cond };
        let inputs: Vec<SignalId> = assignment.inputs().collect();
        let id = self.assignments.alloc(assignment);
        self.signals[dst].drivers.insert(NodeRef::Assignment(id));
        for s in inputs {
            self.signals[s].endpoints.insert(NodeRef::Assignment(id));
        }
        trace!(assignment = %id, dst = %self.signals[dst].name, "assignment built");
        Ok(id)
    }

    fn is_unconditional(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Operator(_) => true,
            NodeRef::Assignment(a) => !self.assignments[a].is_conditional(),
            NodeRef::Default(_) => false,
        }
    }

    /// Returns the operator if `sig` is driven solely by an index or slice.
    pub fn is_indexed_by_sole_driver(&self, sig: SignalId) -> Option<OperatorId> {
        match self.signals[sig].sole_driver()? {
            NodeRef::Operator(op) if self.operators[op].kind.is_selection() => Some(op),
            _ => None,
        }
    }

    /// Returns `true` if `op` is a selection whose result is written through
    /// into its base rather than computed from it.
    pub fn is_write_through(&self, op: OperatorId) -> bool {
        let o = &self.operators[op];
        o.kind.is_selection() && !self.signals[o.result].drivers.contains(&NodeRef::Operator(op))
    }

    /// Returns the only driver of `sig`.
    pub fn single_driver(&self, sig: SignalId) -> Result<NodeRef, RtlError> {
        let s = &self.signals[sig];
        s.sole_driver().ok_or_else(|| RtlError::DriverCount {
            signal: s.name.clone(),
            count: s.drivers.len(),
        })
    }

    /// Decides whether two nets always carry the same value.
    ///
    /// Identical ids are the same. Otherwise both must have the same kind and
    /// exactly one driver each, and those drivers must be structurally equal.
    pub fn are_same_signals(&self, a: SignalId, b: SignalId) -> bool {
        if a == b {
            return true;
        }
        let (sa, sb) = (&self.signals[a], &self.signals[b]);
        if std::mem::discriminant(&sa.kind) != std::mem::discriminant(&sb.kind) {
            return false;
        }
        match (sa.sole_driver(), sb.sole_driver()) {
            (Some(NodeRef::Operator(x)), Some(NodeRef::Operator(y))) => {
                x == y || self.operators[x].same_structure(&self.operators[y])
            }
            (Some(NodeRef::Assignment(x)), Some(NodeRef::Assignment(y))) => {
                x == y || self.assignments[x].same_structure(&self.assignments[y])
            }
            _ => false,
        }
    }

    // ---- evaluation ------------------------------------------------------

    /// Folds the value of `sig` from its drivers, recursively.
    ///
    /// Drivers are applied in order, so a later driver whose guards hold
    /// overrides an earlier one; see [`resolve_drivers`](Self::resolve_drivers).
    /// A net without drivers takes its default, but only while its value is
    /// still entirely unknown; a default naming another net is folded first.
    /// Write-through selections are applied last. Every net is folded at
    /// most once per call.
    pub fn static_eval(&mut self, sig: SignalId) -> Result<Value, RtlError> {
        self.check_signal(sig)?;
        let mut walk = EvalWalk::default();
        self.static_eval_in(sig, &mut walk)
    }

    /// Folds every net once, in dependency order.
    pub fn static_eval_all(&mut self) -> Result<(), RtlError> {
        let order = self.dependency_order()?;
        let mut walk = EvalWalk::default();
        for sig in order {
            self.static_eval_in(sig, &mut walk)?;
        }
        Ok(())
    }

    fn static_eval_in(&mut self, sig: SignalId, walk: &mut EvalWalk) -> Result<Value, RtlError> {
        if walk.done.contains(&sig) {
            return Ok(self.signals[sig].value.clone());
        }
        if !walk.active.insert(sig) {
            return Err(RtlError::CombinationalLoop {
                signal: self.signals[sig].name.clone(),
            });
        }
        let drivers: Vec<NodeRef> = self.signals[sig].drivers.iter().copied().collect();
        if drivers.is_empty() {
            if let Some(Operand::Signal(src)) = self.signals[sig].default {
                self.static_eval_in(src, walk)?;
            }
            if self.signals[sig].value.is_uninitialized() {
                if let Some(default) = self.signals[sig].default.clone() {
                    let v = self.operand_value(&default);
                    let ty = self.signals[sig].ty.clone();
                    self.signals[sig].value = fit_to(v, &ty);
                }
            }
        } else {
            if let Some(Operand::Signal(src)) = self.signals[sig].default {
                self.static_eval_in(src, walk)?;
            }
            for driver in drivers {
                for input in self.node_inputs(driver) {
                    self.static_eval_in(input, walk)?;
                }
            }
            if let Some(v) = self.resolve_drivers(sig)? {
                self.signals[sig].value = v;
            }
        }
        let write_throughs: Vec<OperatorId> = self.write_throughs_into(sig).collect();
        for op in write_throughs {
            let result = self.operators[op].result;
            self.static_eval_in(result, walk)?;
            if let Some(v) = self.write_through(op) {
                self.signals[sig].value = v;
            }
        }
        walk.active.remove(&sig);
        walk.done.insert(sig);
        Ok(self.signals[sig].value.clone())
    }

    /// Nets a node reads, each listed once.
    pub fn node_inputs(&self, node: NodeRef) -> Vec<SignalId> {
        let mut inputs: Vec<SignalId> = match node {
            NodeRef::Operator(op) => self.operators[op].signal_operands().collect(),
            NodeRef::Assignment(a) => self.assignments[a].inputs().collect(),
            NodeRef::Default(sig) => self.signals[sig]
                .default
                .as_ref()
                .and_then(Operand::as_signal)
                .into_iter()
                .collect(),
        };
        inputs.sort_unstable();
        inputs.dedup();
        inputs
    }

    /// The net a node writes.
    pub fn node_output(&self, node: NodeRef) -> SignalId {
        match node {
            NodeRef::Operator(op) => self.operators[op].result,
            NodeRef::Assignment(a) => self.assignments[a].dst,
            NodeRef::Default(sig) => sig,
        }
    }

    /// Evaluates one driver from the current values of its inputs.
    ///
    /// Returns `None` for an assignment whose guards do not all hold.
    pub fn compute(&mut self, node: NodeRef) -> Result<Option<Value>, RtlError> {
        match node {
            NodeRef::Operator(id) => {
                let op = self.operators[id].clone();
                let values: Vec<Value> = op.operands.iter().map(|o| self.operand_value(o)).collect();
                let ty = self.signals[op.result].ty.clone().resolved(self)?;
                Ok(Some(op.kind.eval(&values, &ty)))
            }
            NodeRef::Assignment(id) => {
                let a = &self.assignments[id];
                let enabled = a
                    .cond
                    .iter()
                    .all(|c| self.signals[*c].value.as_bool() == Some(true));
                if !enabled {
                    return Ok(None);
                }
                let v = self.operand_value(&a.src);
                let ty = self.signals[a.dst].ty.clone();
                Ok(Some(fit_to(v, &ty)))
            }
            NodeRef::Default(sig) => {
                let s = &self.signals[sig];
                Ok(s.default.as_ref().map(|d| fit_to(self.operand_value(d), &s.ty)))
            }
        }
    }

    /// Resolves a net from all of its drivers: the last one that produces a
    /// value wins. When every driver is a guarded assignment whose guards do
    /// not hold, the net falls back to its default. Returns `None` if there
    /// is nothing to write.
    pub fn resolve_drivers(&mut self, sig: SignalId) -> Result<Option<Value>, RtlError> {
        let drivers: Vec<NodeRef> = self.signals[sig].drivers.iter().copied().collect();
        let mut out = None;
        for d in drivers {
            if let Some(v) = self.compute(d)? {
                out = Some(v);
            }
        }
        if out.is_none() {
            let ty = self.signals[sig].ty.clone();
            out = self.signals[sig]
                .default
                .as_ref()
                .map(|d| fit_to(self.operand_value(d), &ty));
        }
        Ok(out)
    }

    /// Write-through selections whose base is `sig`.
    pub fn write_throughs_into(&self, sig: SignalId) -> impl Iterator<Item = OperatorId> + '_ {
        self.signals[sig].endpoints.iter().filter_map(move |e| match e {
            NodeRef::Operator(op)
                if self.is_write_through(*op)
                    && self.operators[*op].operands[0] == Operand::Signal(sig) =>
            {
                Some(*op)
            }
            _ => None,
        })
    }

    /// The value the base of a write-through selection takes once the
    /// selected part is replaced by the selection's current value.
    ///
    /// Returns `None` if the base or the bounds are not known well enough.
    pub fn write_through(&self, op: OperatorId) -> Option<Value> {
        let o = &self.operators[op];
        let base_sig = o.operands[0].as_signal()?;
        let base = &self.signals[base_sig].value;
        let mut bits = base.as_bits()?.clone();
        let part = self.signals[o.result].value.as_bits()?.clone();
        let lo = match o.kind {
            OpKind::Index => self.operand_value(&o.operands[1]).as_i64()?,
            _ => self.operand_value(&o.operands[2]).as_i64()?,
        };
        if !bits.splice(u32::try_from(lo).ok()?, &part) {
            return None;
        }
        Some(Value::from_bits(base.ty().clone(), bits))
    }

    // ---- structure -------------------------------------------------------

    /// Reports a combinational loop, if the graph has one.
    ///
    /// Register shadow nets are not connected to their registers, so loops
    /// through a register are legal.
    pub fn check_combinational_loops(&self) -> Result<(), RtlError> {
        self.dependency_order().map(|_| ())
    }

    /// Every net, ordered so that each comes after the nets it is computed
    /// from. Fails on a combinational loop.
    pub fn dependency_order(&self) -> Result<Vec<SignalId>, RtlError> {
        let mut graph: DiGraph<SignalId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self.signals.ids().map(|s| graph.add_node(s)).collect();
        let node = |s: SignalId| nodes[s.as_raw() as usize];
        for (id, op) in self.operators.iter() {
            if self.is_write_through(id) {
                let base = op.operands[0].as_signal();
                if let Some(base) = base {
                    graph.add_edge(node(op.result), node(base), ());
                }
                continue;
            }
            for s in op.signal_operands() {
                graph.add_edge(node(s), node(op.result), ());
            }
        }
        for (_, a) in self.assignments.iter() {
            for s in a.inputs() {
                graph.add_edge(node(s), node(a.dst), ());
            }
        }
        for (id, s) in self.signals.iter() {
            if let Some(Operand::Signal(src)) = s.default {
                graph.add_edge(node(src), node(id), ());
            }
        }
        if let Some(e) = graph
            .edge_indices()
            .filter_map(|e| graph.edge_endpoints(e))
            .find(|(a, b)| a == b)
        {
            return Err(self.loop_error(graph[e.0]));
        }
        petgraph::algo::toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
            .map_err(|cycle| self.loop_error(graph[cycle.node_id()]))
    }

    fn loop_error(&self, sig: SignalId) -> RtlError {
        RtlError::CombinationalLoop {
            signal: self.signals[sig].name.clone(),
        }
    }

    /// Stamps every signal with a simulation environment.
    pub fn bind_all(&mut self, env: SimEnvId) {
        for (_, s) in self.signals.iter_mut() {
            s.sim_env = Some(env);
        }
    }
}

/// Adapts a value to the type of the net receiving it: integers written to
/// bit nets become two's complement bits of the net's width, booleans written
/// to a `Bit` become `'0'`/`'1'`.
pub fn fit_to(value: Value, ty: &HdlType) -> Value {
    match (value.payload(), ty) {
        (Payload::Int(v), HdlType::Bit | HdlType::Vector { .. }) if value.is_valid() => {
            match ty.fixed_width() {
                Some(w) => Value::from_bits(ty.clone(), Bits::from_i64(*v, w)).with_event(value.has_event()),
                None => value,
            }
        }
        (Payload::Bool(b), HdlType::Bit) if value.is_valid() => {
            Value::bit(*b).with_event(value.has_event())
        }
        _ => value,
    }
}
