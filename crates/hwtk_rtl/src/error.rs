//! Errors raised while building or evaluating the expression graph.
//!
//! Codes `E300`--`E306` are structural problems in user expressions; `E399`
//! marks a broken internal invariant.

use hwtk_common::InternalError;
use hwtk_diagnostics::{Diagnostic, DiagnosticCode};

/// Operand is neither a value nor a live signal.
pub const E300: DiagnosticCode = DiagnosticCode::error(300);
/// Signal name already used in the context.
pub const E301: DiagnosticCode = DiagnosticCode::error(301);
/// Second unconditional driver on one net.
pub const E302: DiagnosticCode = DiagnosticCode::error(302);
/// Exactly one driver was required.
pub const E303: DiagnosticCode = DiagnosticCode::error(303);
/// Evaluation re-entered a signal.
pub const E304: DiagnosticCode = DiagnosticCode::error(304);
/// No conversion rule between two types.
pub const E305: DiagnosticCode = DiagnosticCode::error(305);
/// Width does not fold to a constant.
pub const E306: DiagnosticCode = DiagnosticCode::error(306);
/// Internal invariant violation.
pub const E399: DiagnosticCode = DiagnosticCode::error(399);

/// Errors from expression building, static evaluation, and flattening.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RtlError {
    /// An operand was something other than a value or a signal of this netlist.
    #[error("operands in hdl expressions can only be values or signals, got {found}")]
    InvalidOperand {
        /// Description of what was passed.
        found: String,
    },

    /// A signal name is already taken in its context.
    #[error("signal name `{name}` is already used in `{scope}`")]
    DuplicateName {
        /// The requested name.
        name: String,
        /// The context that owns the name.
        scope: String,
    },

    /// A second unconditional driver was added to a net.
    #[error("signal `{signal}` already has an unconditional driver")]
    MultipleDrivers {
        /// The destination net.
        signal: String,
    },

    /// An operation needed exactly one driver.
    #[error("signal `{signal}` has {count} drivers, expected exactly one")]
    DriverCount {
        /// The offending net.
        signal: String,
        /// How many drivers it actually has.
        count: usize,
    },

    /// Evaluation reached a signal that was already being evaluated.
    #[error("combinational loop through signal `{signal}`")]
    CombinationalLoop {
        /// A signal on the loop.
        signal: String,
    },

    /// A type has no conversion to the requested type.
    #[error("cannot convert `{signal}` of type {from} to {to}")]
    TypeConversion {
        /// The signal being converted.
        signal: String,
        /// Its type.
        from: String,
        /// The requested type.
        to: String,
    },

    /// A width expression did not evaluate to a valid non-negative integer.
    #[error("width given by `{signal}` does not fold to a constant")]
    UnresolvedWidth {
        /// The signal holding the width.
        signal: String,
    },

    /// A broken graph invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RtlError {
    /// Returns the stable diagnostic code of this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            RtlError::InvalidOperand { .. } => E300,
            RtlError::DuplicateName { .. } => E301,
            RtlError::MultipleDrivers { .. } => E302,
            RtlError::DriverCount { .. } => E303,
            RtlError::CombinationalLoop { .. } => E304,
            RtlError::TypeConversion { .. } => E305,
            RtlError::UnresolvedWidth { .. } => E306,
            RtlError::Internal(_) => E399,
        }
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            RtlError::MultipleDrivers { .. } => diag.with_help(
                "guard one of the assignments with a condition to give them a priority order",
            ),
            RtlError::CombinationalLoop { .. } => {
                diag.with_note("break the loop with a clocked register")
            }
            _ => diag,
        }
    }
}
