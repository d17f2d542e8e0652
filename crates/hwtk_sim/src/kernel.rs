//! The simulation kernel: a `(time, delta)` event queue over a netlist.
//!
//! Writes compare the new value of a net against the value last
//! propagated. Only a change schedules the net's endpoints, and they all
//! run in the next delta cycle. [`Simulator::settle`] drains the queue one
//! delta at a time, so every reader of a changed net sees the change before
//! anything of the following delta runs. Topology is never touched; only
//! values change.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use hwtk_common::InternalError;
use hwtk_config::{Period, SimConfig};
use hwtk_rtl::{fit_to, Netlist, NodeRef, SignalId, SignalKind, SimEnvId, Value};
use tracing::{debug, trace};

use crate::error::SimError;
use crate::time::SimTime;

/// A node scheduled for re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SimEvent {
    time: SimTime,
    seq: u64,
    node: NodeRef,
}

/// A discrete-event simulator owning one netlist.
#[derive(Debug)]
pub struct Simulator {
    netlist: Netlist,
    config: SimConfig,
    env: SimEnvId,
    time: SimTime,
    queue: BinaryHeap<Reverse<SimEvent>>,
    seq: u64,
    evals: BTreeMap<NodeRef, usize>,
}

impl Simulator {
    /// Binds every signal of `netlist` to a fresh environment and gives it
    /// its statically evaluated initial value.
    ///
    /// Every net is folded once, in dependency order. Fails if the netlist
    /// has a combinational loop.
    pub fn new(mut netlist: Netlist, config: SimConfig) -> Result<Self, SimError> {
        netlist.static_eval_all()?;
        let env = SimEnvId::fresh();
        netlist.bind_all(env);
        let ids: Vec<SignalId> = netlist.signals().map(|(id, _)| id).collect();
        for &id in &ids {
            let s = netlist.signal_mut(id);
            s.previous = s.value.clone();
        }
        debug!(signals = ids.len(), env = ?env, "simulator initialized");
        Ok(Self {
            netlist,
            config,
            env,
            time: SimTime::zero(),
            queue: BinaryHeap::new(),
            seq: 0,
            evals: BTreeMap::new(),
        })
    }

    /// The simulated netlist.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Gives the netlist back, values included.
    pub fn into_netlist(self) -> Netlist {
        self.netlist
    }

    /// The environment every signal is bound to.
    pub fn env(&self) -> SimEnvId {
        self.env
    }

    /// Current logical time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Current value of `sig`.
    pub fn value(&self, sig: SignalId) -> &Value {
        &self.netlist.signal(sig).value
    }

    /// Current value of the signal called `name`.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.netlist.find_signal(name).map(|id| self.value(id))
    }

    /// How often `node` has been re-evaluated by propagation.
    pub fn eval_count(&self, node: NodeRef) -> usize {
        self.evals.get(&node).copied().unwrap_or(0)
    }

    fn check_bound(&self, sig: SignalId) -> Result<(), SimError> {
        match self.netlist.try_signal(sig) {
            Some(s) if s.sim_env == Some(self.env) => Ok(()),
            Some(s) => Err(SimError::NotInitialized {
                signal: s.name.clone(),
            }),
            None => Err(SimError::NotInitialized {
                signal: sig.to_string(),
            }),
        }
    }

    /// Writes `value` to `sig` and settles.
    ///
    /// A register is not changed; the value lands on its `next` shadow and
    /// becomes visible on the next clock edge.
    pub fn write(&mut self, sig: SignalId, value: Value) -> Result<(), SimError> {
        self.check_bound(sig)?;
        let target = self.netlist.write_target(sig);
        let ty = self.netlist.signal(target).ty.clone();
        self.apply(target, fit_to(value, &ty));
        self.settle()
    }

    /// Sets a net and schedules its endpoints if the value changed.
    fn apply(&mut self, sig: SignalId, value: Value) {
        let at = self.time.next_delta();
        let s = self.netlist.signal_mut(sig);
        if value == s.previous {
            s.value = value;
            return;
        }
        s.value = value.clone();
        s.previous = value;
        let endpoints: Vec<NodeRef> = s.endpoints.iter().copied().collect();
        if self.config.log {
            trace!(signal = %s.name, value = %s.value, time = %self.time, "signal changed");
        }
        for node in endpoints {
            self.seq += 1;
            self.queue.push(Reverse(SimEvent {
                time: at,
                seq: self.seq,
                node,
            }));
        }
    }

    /// Runs delta cycles until nothing is scheduled.
    ///
    /// All events of one delta are applied before any event of the next.
    /// A node scheduled several times within one delta runs once.
    pub fn settle(&mut self) -> Result<(), SimError> {
        let mut deltas = 0u32;
        while let Some(Reverse(first)) = self.queue.pop() {
            let now = first.time;
            self.time = now;
            let mut batch = BTreeSet::from([first.node]);
            while self.queue.peek().is_some_and(|Reverse(e)| e.time == now) {
                if let Some(Reverse(e)) = self.queue.pop() {
                    batch.insert(e.node);
                }
            }
            deltas += 1;
            if deltas > self.config.max_deltas {
                self.queue.clear();
                return Err(SimError::DeltaCycleLimit {
                    ps: now.ps,
                    max_deltas: self.config.max_deltas,
                });
            }
            if self.config.log {
                debug!(time = %now, nodes = batch.len(), "delta cycle");
            }
            for node in batch {
                self.evaluate(node)?;
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, node: NodeRef) -> Result<(), SimError> {
        *self.evals.entry(node).or_insert(0) += 1;
        if let NodeRef::Operator(op) = node {
            if self.netlist.is_write_through(op) {
                let base = self.netlist.operator(op).operands[0]
                    .as_signal()
                    .ok_or_else(|| InternalError::new(format!("selection {op} has no base signal")))?;
                if let Some(v) = self.netlist.write_through(op) {
                    self.apply(base, v);
                }
                return Ok(());
            }
        }
        let out = self.netlist.node_output(node);
        if let Some(v) = self.netlist.resolve_drivers(out)? {
            self.apply(out, v);
        }
        Ok(())
    }

    /// Registers clocked by `clk`, with their sampled `next` values.
    fn sample_registers(&self, clk: Option<SignalId>) -> Vec<(SignalId, Value)> {
        self.netlist
            .signals()
            .filter_map(|(id, s)| match s.kind {
                SignalKind::Register { next, clk: c }
                    if clk.is_none_or(|clk| self.netlist.are_same_signals(c, clk)) =>
                {
                    Some((id, self.netlist.signal(next).value.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn drive_clock(&mut self, clk: SignalId, level: bool, event: bool) {
        let ty = self.netlist.signal(clk).ty.clone();
        self.apply(clk, fit_to(Value::boolean(level), &ty).with_event(event));
    }

    /// One full period of `clk`.
    ///
    /// Samples every register clocked by `clk`, drives the clock high with
    /// its event flag set and commits the samples in the same delta, then
    /// settles. The clock is then brought low, settling after each step, so
    /// edge operators see exactly one rising and one falling edge.
    pub fn clock_edge(&mut self, clk: SignalId) -> Result<(), SimError> {
        self.check_bound(clk)?;
        let regs = self.sample_registers(Some(clk));
        if self.config.log {
            debug!(
                clk = %self.netlist.signal(clk).name,
                registers = regs.len(),
                time = %self.time,
                "clock edge"
            );
        }
        self.drive_clock(clk, true, true);
        for (reg, v) in regs {
            self.apply(reg, v.with_event(true));
        }
        self.settle()?;
        self.drive_clock(clk, true, false);
        self.settle()?;
        self.drive_clock(clk, false, true);
        self.settle()?;
        self.drive_clock(clk, false, false);
        self.settle()
    }

    /// Commits every register's `next` value without toggling a clock.
    pub fn commit_registers(&mut self) -> Result<(), SimError> {
        for (reg, v) in self.sample_registers(None) {
            self.apply(reg, v.with_event(true));
        }
        self.settle()
    }

    /// Settles, then moves logical time forward by `by`.
    pub fn advance(&mut self, by: Period) -> Result<(), SimError> {
        self.settle()?;
        self.time = self.time.advance_by(by.as_ps());
        Ok(())
    }

    /// Runs `cycles` clock periods of the configured length.
    pub fn run_clock(&mut self, clk: SignalId, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.clock_edge(clk)?;
            self.advance(self.config.clock_period)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtk_rtl::{HdlType, RtlError};

    fn sim(n: Netlist) -> Simulator {
        Simulator::new(n, SimConfig::default()).unwrap()
    }

    #[test]
    fn initial_values_are_folded() {
        let mut n = Netlist::new();
        let x = n.sig_with_default("x", HdlType::Bit, Value::bit(false)).unwrap();
        let y = n.op_not(x).unwrap();
        let s = sim(n);
        assert_eq!(s.value(y), &Value::bit(true));
        assert_eq!(s.netlist().signal(x).previous, Value::bit(false));
        assert!(s.netlist().signals().all(|(_, sig)| sig.sim_env == Some(s.env())));
    }

    #[test]
    fn change_reaches_each_endpoint_once() {
        let mut n = Netlist::new();
        let x = n.sig_with_default("x", HdlType::Bit, Value::bit(false)).unwrap();
        let y = n.op_not(x).unwrap();
        let z = n.sig("z", HdlType::Bit);
        let a = n.assign(z, x).unwrap();
        let op = NodeRef::Operator(n.signal(y).origin.unwrap());
        let a = NodeRef::Assignment(a);
        let mut s = sim(n);

        s.write(x, Value::bit(true)).unwrap();
        assert_eq!(s.eval_count(op), 1);
        assert_eq!(s.eval_count(a), 1);
        assert_eq!(s.netlist().signal(x).previous, Value::bit(true));
        assert_eq!(s.value(y), &Value::bit(false));
        assert_eq!(s.value(z), &Value::bit(true));

        s.write(x, Value::bit(true)).unwrap();
        assert_eq!(s.eval_count(op), 1);
        assert_eq!(s.eval_count(a), 1);
    }

    #[test]
    fn copied_nets_follow_their_source() {
        let mut n = Netlist::new();
        let a = n.sig_with_default("a", HdlType::Bit, Value::bit(false)).unwrap();
        let b = n.sig_with_default("b", HdlType::Bit, a).unwrap();
        let mut s = sim(n);
        assert_eq!(s.value(b), &Value::bit(false));
        s.write(a, Value::bit(true)).unwrap();
        assert_eq!(s.value(b), &Value::bit(true));
        assert_eq!(s.eval_count(NodeRef::Default(b)), 1);
    }

    #[test]
    fn deep_shared_logic_starts_and_settles() {
        let mut n = Netlist::new();
        let x = n.sig_with_default("x", HdlType::Integer, Value::int(1)).unwrap();
        let mut level = x;
        for _ in 0..48 {
            level = n.op_add(level, level).unwrap();
        }
        let mut s = sim(n);
        assert_eq!(s.value(level), &Value::int(1 << 48));
        s.write(x, Value::int(2)).unwrap();
        assert_eq!(s.value(level), &Value::int(1 << 49));
        let op = NodeRef::Operator(s.netlist().signal(level).origin.unwrap());
        assert_eq!(s.eval_count(op), 1);
    }

    #[test]
    fn unknown_signals_are_rejected() {
        let mut n = Netlist::new();
        n.sig("x", HdlType::Bit);
        let mut s = sim(n);
        let err = s.write(SignalId::from_raw(7), Value::bit(true)).unwrap_err();
        assert_eq!(err, SimError::NotInitialized { signal: "sig#7".into() });
    }

    #[test]
    fn loops_are_rejected_up_front() {
        let mut n = Netlist::new();
        let a = n.sig("a", HdlType::Bit);
        let na = n.op_not(a).unwrap();
        n.assign(a, na).unwrap();
        assert!(matches!(
            Simulator::new(n, SimConfig::default()),
            Err(SimError::Rtl(RtlError::CombinationalLoop { .. }))
        ));
    }

    #[test]
    fn register_updates_only_on_clock_edge() {
        let mut n = Netlist::new();
        let clk = n.sig_with_default("clk", HdlType::Bit, Value::bit(false)).unwrap();
        let d = n
            .sig_with_default("d", HdlType::vector(4), Value::vector(0, 4))
            .unwrap();
        let r = n.reg("r", HdlType::vector(4), clk, Some(Value::vector(0, 4))).unwrap();
        n.assign(r, d).unwrap();
        let next = n.write_target(r);
        let mut s = sim(n);

        s.write(d, Value::vector(5, 4)).unwrap();
        assert_eq!(s.value(r).as_i64(), Some(0));
        assert_eq!(s.value(next).as_i64(), Some(5));

        s.clock_edge(clk).unwrap();
        assert_eq!(s.value(r).as_i64(), Some(5));
        assert_eq!(s.value(clk), &Value::bit(false));

        // writes to the register itself land on the shadow
        s.write(r, Value::vector(9, 4)).unwrap();
        assert_eq!(s.value(r).as_i64(), Some(5));
        assert_eq!(s.value(next).as_i64(), Some(9));
        s.commit_registers().unwrap();
        assert_eq!(s.value(r).as_i64(), Some(9));
    }

    #[test]
    fn counter_counts_clock_periods() {
        let mut n = Netlist::new();
        let clk = n.sig_with_default("clk", HdlType::Bit, Value::bit(false)).unwrap();
        let cnt = n.reg("cnt", HdlType::vector(4), clk, Some(Value::vector(0, 4))).unwrap();
        let inc = n.op_add(cnt, 1).unwrap();
        n.assign(cnt, inc).unwrap();
        let mut s = sim(n);
        s.run_clock(clk, 3).unwrap();
        assert_eq!(s.value(cnt).as_i64(), Some(3));
        assert_eq!(s.time().ps, 30_000);
        assert_eq!(s.time().delta, 0);
    }

    #[test]
    fn rising_edge_is_seen_once() {
        let mut n = Netlist::new();
        let clk = n.sig_with_default("clk", HdlType::Bit, Value::bit(false)).unwrap();
        let edge = n.op_rising_edge(clk).unwrap();
        let seen = n.sig("seen", HdlType::Bit);
        n.assign_when(seen, Value::bit(true), [edge]).unwrap();
        let mut s = sim(n);
        assert_eq!(s.value(edge), &Value::boolean(false));
        assert!(!s.value(seen).is_valid());
        s.clock_edge(clk).unwrap();
        assert_eq!(s.value(seen), &Value::bit(true));
        assert_eq!(s.value(edge), &Value::boolean(false));
    }

    #[test]
    fn write_through_updates_base() {
        let mut n = Netlist::new();
        let v = n
            .sig_with_default("v", HdlType::vector(4), Value::vector(0, 4))
            .unwrap();
        let b = n.sig_with_default("b", HdlType::Bit, Value::bit(false)).unwrap();
        let slot = n.op_index(v, 1).unwrap();
        n.assign(slot, b).unwrap();
        let mut s = sim(n);
        assert_eq!(s.value(v).as_i64(), Some(0));
        s.write(b, Value::bit(true)).unwrap();
        assert_eq!(s.value(v).as_i64(), Some(0b0010));
    }

    #[test]
    fn delta_limit_is_enforced() {
        let mut n = Netlist::new();
        let x = n.sig_with_default("x", HdlType::Bit, Value::bit(false)).unwrap();
        let y = n.op_not(x).unwrap();
        n.op_neg(y).unwrap();
        let config = SimConfig {
            max_deltas: 1,
            ..SimConfig::default()
        };
        let mut s = Simulator::new(n, config).unwrap();
        assert!(matches!(
            s.write(x, Value::bit(true)),
            Err(SimError::DeltaCycleLimit { max_deltas: 1, .. })
        ));
    }
}
