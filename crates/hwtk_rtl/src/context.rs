//! Per-unit build scope and flattening into an entity and architecture.

use crate::error::RtlError;
use crate::hdl::{
    Architecture, Branch, Component, ComponentInstance, Entity, Expr, GenericDecl, PortDecl,
    PortDirection, SignalDecl, Statement,
};
use crate::ids::{NodeRef, SignalId};
use crate::netlist::Netlist;
use crate::operator::{Operand, Term};
use crate::signal::{Signal, SignalKind};
use crate::types::HdlType;
use crate::value::Value;
use hwtk_common::ContentHash;
use hwtk_config::ElaborateConfig;
use std::collections::BTreeSet;
use tracing::debug;

/// The transient build scope of one unit.
///
/// Owns the unit's netlist and keeps named signals unique. After
/// [`synthesize`](Self::synthesize) only the produced entity and
/// architecture are needed.
#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    config: ElaborateConfig,
    netlist: Netlist,
    names: BTreeSet<String>,
    generics: Vec<GenericDecl>,
    components: Vec<(ContentHash, Component)>,
    instances: Vec<ComponentInstance>,
}

impl Context {
    /// Creates an empty scope for the unit `name`.
    pub fn new(name: impl Into<String>, config: &ElaborateConfig) -> Self {
        Self {
            name: name.into(),
            netlist: Netlist::with_anonymous_prefix(config.anonymous_prefix.clone()),
            config: config.clone(),
            names: BTreeSet::new(),
            generics: Vec::new(),
            components: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// The unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying netlist.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Mutable access for building expressions and assignments.
    pub fn netlist_mut(&mut self) -> &mut Netlist {
        &mut self.netlist
    }

    /// Consumes the scope, keeping only the netlist.
    pub fn into_netlist(self) -> Netlist {
        self.netlist
    }

    fn claim(&mut self, name: &str) -> Result<(), RtlError> {
        if !self.names.insert(name.to_string()) {
            return Err(RtlError::DuplicateName {
                name: name.to_string(),
                scope: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Creates a uniquely named wire.
    pub fn sig(&mut self, name: &str, ty: HdlType) -> Result<SignalId, RtlError> {
        self.claim(name)?;
        Ok(self.netlist.sig(name, ty))
    }

    /// Creates a uniquely named wire with a default.
    pub fn sig_with_default(
        &mut self,
        name: &str,
        ty: HdlType,
        default: impl Into<Term>,
    ) -> Result<SignalId, RtlError> {
        // validate before claiming so a bad default leaves the name free
        let default = self.netlist.check_operand(default.into())?;
        self.claim(name)?;
        self.netlist.sig_with_default(name, ty, default)
    }

    /// Creates a uniquely named register and its `<name>_next` shadow net.
    pub fn reg(
        &mut self,
        name: &str,
        ty: HdlType,
        clk: SignalId,
        reset: Option<Value>,
    ) -> Result<SignalId, RtlError> {
        self.netlist.check_signal(clk)?;
        let next = format!("{name}_next");
        if self.names.contains(&next) {
            return Err(RtlError::DuplicateName {
                name: next,
                scope: self.name.clone(),
            });
        }
        self.claim(name)?;
        self.claim(&next)?;
        self.netlist.reg(name, ty, clk, reset)
    }

    /// Separator joining the parts of generated names.
    pub fn separator(&self) -> &str {
        &self.config.name_separator
    }

    /// Name of the net bridging interface `path` of sub-unit `sub`.
    pub fn bridge_name(&self, sub: &str, path: &str) -> String {
        format!(
            "{}{sub}{}{path}",
            self.config.bridge_prefix, self.config.name_separator
        )
    }

    /// Declares an entity generic.
    pub fn add_generic(&mut self, generic: GenericDecl) {
        self.generics.push(generic);
    }

    /// Records a sub-unit instantiation. Identical component declarations
    /// are emitted once.
    pub fn add_instance(&mut self, component: Component, instance: ComponentInstance) {
        let hash = ContentHash::of_display(&component.entity);
        if !self.components.iter().any(|(h, _)| *h == hash) {
            self.components.push((hash, component));
        }
        debug!(unit = %self.name, instance = %instance.name, "instance recorded");
        self.instances.push(instance);
    }

    /// Flattens the scope.
    ///
    /// `ports` become entity ports in the given order: `OUT` when something
    /// inside drives them, `IN` otherwise. Every other named net becomes a
    /// signal declaration. Operator results are inlined into the statements
    /// that read them and all widths are folded.
    ///
    /// Fails with [`RtlError::DriverCount`] if an inlined operator result was
    /// also assigned.
    pub fn synthesize(&mut self, ports: &[SignalId]) -> Result<(Entity, Architecture), RtlError> {
        let mut entity = Entity::new(self.name.clone());
        entity.generics = self.generics.clone();
        for &p in ports {
            self.netlist.check_signal(p)?;
            let s = self.netlist.signal(p);
            let direction = if s.drivers.is_empty() {
                PortDirection::In
            } else {
                PortDirection::Out
            };
            let name = s.name.clone();
            let ty = s.ty.clone().resolved(&mut self.netlist)?;
            entity.ports.push(PortDecl::new(name, direction, ty));
        }

        let port_set: BTreeSet<SignalId> = ports.iter().copied().collect();
        let ids: Vec<SignalId> = self.netlist.signals().map(|(id, _)| id).collect();
        let mut signals = Vec::new();
        let mut statements = Vec::new();
        for id in ids {
            let s = self.netlist.signal(id);
            if s.is_inline_result() {
                // an inlined expression cannot carry a second driver
                self.netlist.single_driver(id)?;
            }
            if s.origin.is_some() || s.is_inline_constant() || s.kind == SignalKind::Param {
                continue;
            }
            if !port_set.contains(&id) {
                let default = match &s.default {
                    Some(Operand::Value(v)) => Some(v.clone()),
                    _ => None,
                };
                let ty = s.ty.clone().resolved(&mut self.netlist)?;
                signals.push(SignalDecl {
                    name: self.netlist.signal(id).name.clone(),
                    ty,
                    default,
                });
            }
            if let Some(st) = self.assignment_statement(id) {
                statements.push(st);
            }
        }
        // selections written through have no net of their own
        let selections: Vec<SignalId> = self
            .netlist
            .signals()
            .filter(|(_, s)| s.origin.is_some() && !s.is_inline_result())
            .map(|(id, _)| id)
            .collect();
        for id in selections {
            if let Some(st) = self.assignment_statement(id) {
                statements.push(st);
            }
        }
        for (_, s) in self.netlist.signals() {
            if let SignalKind::Register { next, clk } = s.kind {
                statements.push(Statement::Clocked {
                    clk: self.netlist.signal(clk).name.clone(),
                    target: s.name.clone(),
                    next: self.netlist.signal(next).name.clone(),
                });
            }
        }
        statements.extend(self.instances.iter().cloned().map(Statement::Instance));

        let architecture = Architecture {
            name: self.config.architecture_name.clone(),
            entity_name: self.name.clone(),
            components: self.components.iter().map(|(_, c)| c.clone()).collect(),
            signals,
            statements,
        };
        debug!(
            unit = %self.name,
            ports = entity.ports.len(),
            signals = architecture.signals.len(),
            statements = architecture.statements.len(),
            "context synthesized"
        );
        Ok((entity, architecture))
    }

    /// The statement driving `id`, if its drivers are assignments or it
    /// copies another net by default.
    fn assignment_statement(&self, id: SignalId) -> Option<Statement> {
        let s = self.netlist.signal(id);
        let assignments: Vec<_> = s
            .drivers
            .iter()
            .filter_map(|d| match d {
                NodeRef::Assignment(a) => Some(self.netlist.assignment(*a)),
                _ => None,
            })
            .collect();
        let fallback = s.default.as_ref().map(|d| self.operand_expr(d));
        if assignments.is_empty() {
            return match (&s.default, s.is_register()) {
                (Some(Operand::Signal(_)), false) => Some(Statement::Assign {
                    target: self.target_expr(s),
                    branches: Vec::new(),
                    otherwise: fallback,
                }),
                _ => None,
            };
        }
        // an unconditional driver shadows everything declared before it
        let start = assignments
            .iter()
            .rposition(|a| !a.is_conditional())
            .unwrap_or(0);
        let mut otherwise = fallback.filter(|_| !s.is_register());
        let mut branches = Vec::new();
        for a in &assignments[start..] {
            let value = self.operand_expr(&a.src);
            if a.is_conditional() {
                branches.push(Branch {
                    value,
                    conditions: a.cond.iter().map(|c| self.sig_expr(*c)).collect(),
                });
            } else {
                otherwise = Some(value);
            }
        }
        branches.reverse();
        Some(Statement::Assign {
            target: self.target_expr(s),
            branches,
            otherwise,
        })
    }

    fn target_expr(&self, s: &Signal) -> Expr {
        match s.origin {
            Some(op) if !s.is_inline_result() => {
                let o = self.netlist.operator(op);
                Expr::Op {
                    kind: o.kind,
                    operands: o.operands.iter().map(|x| self.operand_expr(x)).collect(),
                }
            }
            _ => Expr::Signal(s.name.clone()),
        }
    }

    fn operand_expr(&self, operand: &Operand) -> Expr {
        match operand {
            Operand::Value(v) => Expr::Literal(v.clone()),
            Operand::Signal(s) => self.sig_expr(*s),
        }
    }

    fn sig_expr(&self, id: SignalId) -> Expr {
        let s = self.netlist.signal(id);
        match (s.origin, &s.default) {
            (Some(op), _) if s.is_inline_result() => {
                let o = self.netlist.operator(op);
                Expr::Op {
                    kind: o.kind,
                    operands: o.operands.iter().map(|x| self.operand_expr(x)).collect(),
                }
            }
            (_, Some(Operand::Value(v))) if s.is_inline_constant() => Expr::Literal(v.clone()),
            _ => Expr::Signal(s.name.clone()),
        }
    }
}
