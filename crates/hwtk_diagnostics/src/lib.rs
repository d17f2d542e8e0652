//! Diagnostic creation, severity management, and plain-text rendering.
//!
//! Hard failures travel as `Result` errors through the elaborator and the
//! simulator. Everything that is worth telling the user but does not stop the
//! run (an interface nobody connected, a parameter nobody reads) is collected
//! as a [`Diagnostic`] in a [`DiagnosticSink`] and rendered by a
//! [`DiagnosticRenderer`].

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
