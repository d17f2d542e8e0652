//! Discrete-event simulation over an elaborated netlist.
//!
//! A [`Simulator`] takes ownership of a [`Netlist`](hwtk_rtl::Netlist),
//! binds every signal to itself and initializes values by static
//! evaluation. Writes propagate change by change through an explicit
//! `(time, delta)` event queue; registers update only on a clock edge.

#![warn(missing_docs)]

pub mod error;
pub mod kernel;
pub mod time;

pub use error::SimError;
pub use kernel::Simulator;
pub use time::SimTime;
