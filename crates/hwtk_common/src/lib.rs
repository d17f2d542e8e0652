//! Shared foundational types used across the hwtk workspace.
//!
//! This crate provides three-state logic values, packed bit vectors with a
//! per-bit validity plane, content hashing, and common result types.

#![warn(missing_docs)]

pub mod bits;
pub mod hash;
pub mod logic;
pub mod result;

pub use bits::Bits;
pub use hash::ContentHash;
pub use logic::Logic;
pub use result::{HwtkResult, InternalError};
