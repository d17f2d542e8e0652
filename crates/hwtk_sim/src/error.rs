//! Simulation errors.

use hwtk_common::InternalError;
use hwtk_diagnostics::{Diagnostic, DiagnosticCode};
use hwtk_rtl::RtlError;

/// Signal written through a simulator it is not bound to.
pub const E500: DiagnosticCode = DiagnosticCode::error(500);
/// Too many delta cycles in one time step.
pub const E501: DiagnosticCode = DiagnosticCode::error(501);
/// Internal invariant violation.
pub const E599: DiagnosticCode = DiagnosticCode::error(599);

/// Errors that can occur while setting up or running a simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The signal has no simulation environment, or a different one.
    #[error("simulator not initialized for signal `{signal}`")]
    NotInitialized {
        /// The written signal.
        signal: String,
    },

    /// Propagation did not settle, which points to oscillating logic.
    #[error("delta cycle limit exceeded at {ps} ps (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time step that did not settle.
        ps: u64,
        /// The configured limit.
        max_deltas: u32,
    },

    /// Building or evaluating the graph failed.
    #[error(transparent)]
    Rtl(#[from] RtlError),

    /// A broken simulator invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl SimError {
    /// Returns the stable diagnostic code of this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            SimError::NotInitialized { .. } => E500,
            SimError::DeltaCycleLimit { .. } => E501,
            SimError::Rtl(e) => e.code(),
            SimError::Internal(_) => E599,
        }
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            SimError::Rtl(e) => e.to_diagnostic(),
            SimError::NotInitialized { .. } => Diagnostic::error(self.code(), self.to_string())
                .with_help("write signals only through the simulator that owns their netlist"),
            _ => Diagnostic::error(self.code(), self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_display() {
        let e = SimError::NotInitialized { signal: "x".into() };
        assert_eq!(e.to_string(), "simulator not initialized for signal `x`");
        assert_eq!(e.code().to_string(), "E500");
        assert_eq!(e.to_diagnostic().help.len(), 1);
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            ps: 100,
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 ps (max 10000 deltas)"
        );
    }

    #[test]
    fn rtl_errors_keep_their_code() {
        let e = SimError::from(RtlError::CombinationalLoop { signal: "a".into() });
        assert_eq!(e.code().to_string(), "E304");
        assert_eq!(e.to_string(), "combinational loop through signal `a`");
    }
}
