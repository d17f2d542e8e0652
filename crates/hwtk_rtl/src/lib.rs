//! The RTL graph at the center of hwtk.
//!
//! A [`Netlist`] holds typed [`Signal`]s, the [`Operator`]s computing them and
//! the [`Assignment`]s copying between them. Expressions are built on the
//! netlist, folded by static evaluation, and flattened by a [`Context`] into
//! an [`Entity`] and an [`Architecture`]. Simulation reuses the same graph
//! and only ever changes values.

#![warn(missing_docs)]

pub mod arena;
pub mod assignment;
pub mod context;
pub mod error;
pub mod hdl;
pub mod ids;
pub mod netlist;
pub mod operator;
pub mod signal;
pub mod types;
pub mod value;

pub use arena::{Arena, ArenaId};
pub use assignment::Assignment;
pub use context::Context;
pub use error::RtlError;
pub use hdl::{
    Architecture, Branch, Component, ComponentInstance, Entity, Expr, GenericDecl, PortDecl,
    PortDirection, SignalDecl, Statement,
};
pub use ids::{AssignmentId, NodeRef, OperatorId, SignalId};
pub use netlist::{fit_to, Netlist};
pub use operator::{OpKind, Operand, Operator, Term};
pub use signal::{SimEnvId, Signal, SignalKind};
pub use types::{HdlType, Width};
pub use value::{Payload, Value};
