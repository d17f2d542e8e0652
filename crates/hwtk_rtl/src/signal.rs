//! Nets of the RTL graph.

use crate::ids::{NodeRef, OperatorId, SignalId};
use crate::operator::{OpKind, Operand};
use crate::types::HdlType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};

/// Identifies one simulation environment.
///
/// Every signal of a netlist handed to a simulator is stamped with the
/// simulator's id; writes through a simulator check the stamp so a signal
/// that was never bound (or was bound elsewhere) is rejected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SimEnvId(u32);

static NEXT_SIM_ENV: AtomicU32 = AtomicU32::new(1);

impl SimEnvId {
    /// Returns an id no other environment in this process has.
    pub fn fresh() -> Self {
        Self(NEXT_SIM_ENV.fetch_add(1, Ordering::Relaxed))
    }
}

/// The role of a net.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SignalKind {
    /// A plain combinational net.
    Wire,
    /// A unit parameter; its default holds the parameter value.
    Param,
    /// A clocked register. Assignments to it land on `next`, whose value
    /// becomes visible here on a rising edge of `clk`.
    Register {
        /// The shadow net collecting the next state.
        next: SignalId,
        /// The clock.
        clk: SignalId,
    },
    /// The shadow net of a register.
    Next {
        /// The register this net feeds.
        register: SignalId,
    },
}

/// A named, typed net with its driver and endpoint sets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signal {
    /// Net name. Auto-generated for anonymous nets.
    pub name: String,
    /// `true` if the name was generated rather than chosen.
    pub has_generic_name: bool,
    /// Declared type; vector widths may still be signal-given.
    pub ty: HdlType,
    /// Role of the net.
    pub kind: SignalKind,
    /// Value used when nothing drives the net.
    pub default: Option<Operand>,
    /// Nodes writing this net.
    pub drivers: BTreeSet<NodeRef>,
    /// Nodes reading this net.
    pub endpoints: BTreeSet<NodeRef>,
    /// Current value.
    pub value: Value,
    /// Value last propagated to the endpoints.
    pub previous: Value,
    /// The operator whose result this is, if any.
    pub origin: Option<OperatorId>,
    pub(crate) used_ops: BTreeMap<OpKind, OperatorId>,
    /// Simulation environment this net is bound to.
    pub sim_env: Option<SimEnvId>,
}

impl Signal {
    pub(crate) fn new(name: String, has_generic_name: bool, ty: HdlType, kind: SignalKind) -> Self {
        let value = Value::invalid(&ty);
        Self {
            name,
            has_generic_name,
            previous: value.clone(),
            value,
            ty,
            kind,
            default: None,
            drivers: BTreeSet::new(),
            endpoints: BTreeSet::new(),
            origin: None,
            used_ops: BTreeMap::new(),
            sim_env: None,
        }
    }

    /// Returns the driver if there is exactly one.
    pub fn sole_driver(&self) -> Option<NodeRef> {
        match self.drivers.len() {
            1 => self.drivers.iter().next().copied(),
            _ => None,
        }
    }

    /// Returns `true` for clocked registers.
    pub fn is_register(&self) -> bool {
        matches!(self.kind, SignalKind::Register { .. })
    }

    /// Returns `true` for anonymous operator results, which are inlined
    /// into expressions rather than declared.
    pub fn is_inline_result(&self) -> bool {
        self.has_generic_name
            && self
                .origin
                .is_some_and(|op| self.drivers.contains(&NodeRef::Operator(op)))
    }

    /// Returns `true` for anonymous driver-less nets holding a literal.
    pub fn is_inline_constant(&self) -> bool {
        self.has_generic_name
            && self.drivers.is_empty()
            && matches!(self.default, Some(Operand::Value(_)))
    }
}
