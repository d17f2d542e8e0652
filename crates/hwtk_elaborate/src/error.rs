//! Elaboration errors and warning helpers.
//!
//! Error codes `E400`--`E409` cover structural problems in the unit
//! hierarchy. Warning codes `W400`--`W401` cover interfaces that end up
//! connected to nothing.

use hwtk_common::InternalError;
use hwtk_diagnostics::{Diagnostic, DiagnosticCode};
use hwtk_rtl::RtlError;

/// Name used twice among a unit's interfaces, sub-units, or parameters.
pub const E400: DiagnosticCode = DiagnosticCode::error(400);
/// Interface has no matching entity port.
pub const E401: DiagnosticCode = DiagnosticCode::error(401);
/// Interface matches several entity ports.
pub const E402: DiagnosticCode = DiagnosticCode::error(402);
/// Unit exposes no external interface.
pub const E403: DiagnosticCode = DiagnosticCode::error(403);
/// Connection or source names an interface that does not exist.
pub const E404: DiagnosticCode = DiagnosticCode::error(404);
/// Connected interfaces have different shapes or widths.
pub const E405: DiagnosticCode = DiagnosticCode::error(405);
/// Connected leaves cannot be ordered into driver and reader.
pub const E406: DiagnosticCode = DiagnosticCode::error(406);
/// Entity port not owned by any extracted interface.
pub const E407: DiagnosticCode = DiagnosticCode::error(407);
/// Entity description could not be obtained.
pub const E408: DiagnosticCode = DiagnosticCode::error(408);
/// Unknown parameter name.
pub const E409: DiagnosticCode = DiagnosticCode::error(409);
/// Internal invariant violation.
pub const E499: DiagnosticCode = DiagnosticCode::error(499);

/// Interface of the unit itself connected to nothing.
pub const W400: DiagnosticCode = DiagnosticCode::warning(400);
/// Sub-unit port left open.
pub const W401: DiagnosticCode = DiagnosticCode::warning(401);

/// Errors that abort elaboration of a unit and of every ancestor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElabError {
    /// A unit already has an interface, sub-unit, or parameter of this name.
    #[error("unit `{unit}` already has a member named `{name}`")]
    DuplicateName {
        /// Hierarchical unit path.
        unit: String,
        /// The repeated name.
        name: String,
    },

    /// No entity port carries the interface's name.
    #[error("interface `{interface}` of unit `{unit}` matches no entity port")]
    UnmatchedPort {
        /// Hierarchical unit path.
        unit: String,
        /// Interface path.
        interface: String,
    },

    /// Several entity ports carry the interface's name.
    #[error("interface `{interface}` of unit `{unit}` matches {count} entity ports")]
    AmbiguousPort {
        /// Hierarchical unit path.
        unit: String,
        /// Interface path.
        interface: String,
        /// Number of matching ports.
        count: usize,
    },

    /// The unit could never be connected to anything.
    #[error("cannot find any external interface for unit `{unit}`")]
    NoExternalInterface {
        /// Hierarchical unit path.
        unit: String,
    },

    /// A connection endpoint or source path does not resolve.
    #[error("unit `{unit}` has no interface `{path}`")]
    UnknownInterface {
        /// Hierarchical unit path.
        unit: String,
        /// The unresolved path.
        path: String,
    },

    /// Two connected interfaces do not line up.
    #[error("cannot connect `{from}` to `{to}` in unit `{unit}`: {reason}")]
    ShapeMismatch {
        /// Hierarchical unit path.
        unit: String,
        /// Source endpoint.
        from: String,
        /// Destination endpoint.
        to: String,
        /// What differs.
        reason: String,
    },

    /// Two connected leaves are both readers, both drivers, or undirected.
    #[error("cannot connect `{from}` to `{to}` in unit `{unit}`: {reason}")]
    DirectionConflict {
        /// Hierarchical unit path.
        unit: String,
        /// Source endpoint.
        from: String,
        /// Destination endpoint.
        to: String,
        /// The offending directions.
        reason: String,
    },

    /// A parsed entity port was claimed by no interface class.
    #[error("port `{port}` of unit `{unit}` is not part of any interface")]
    UnclaimedPort {
        /// Hierarchical unit path.
        unit: String,
        /// Port name.
        port: String,
    },

    /// The entity parser failed.
    #[error("cannot read entity from `{path}`: {message}")]
    Parse {
        /// Source path handed to the parser.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A parameter name does not exist on the unit.
    #[error("unit `{unit}` has no parameter `{name}`")]
    UnknownParam {
        /// Hierarchical unit path.
        unit: String,
        /// Requested name.
        name: String,
    },

    /// Building the unit's netlist failed.
    #[error(transparent)]
    Rtl(#[from] RtlError),

    /// A broken elaborator invariant.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ElabError {
    /// Returns the stable diagnostic code of this error.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ElabError::DuplicateName { .. } => E400,
            ElabError::UnmatchedPort { .. } => E401,
            ElabError::AmbiguousPort { .. } => E402,
            ElabError::NoExternalInterface { .. } => E403,
            ElabError::UnknownInterface { .. } => E404,
            ElabError::ShapeMismatch { .. } => E405,
            ElabError::DirectionConflict { .. } => E406,
            ElabError::UnclaimedPort { .. } => E407,
            ElabError::Parse { .. } => E408,
            ElabError::UnknownParam { .. } => E409,
            ElabError::Rtl(e) => e.code(),
            ElabError::Internal(_) => E499,
        }
    }

    /// Converts the error into an error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ElabError::Rtl(e) => e.to_diagnostic(),
            ElabError::NoExternalInterface { .. } => Diagnostic::error(self.code(), self.to_string())
                .with_help("mark at least one interface of the unit as external"),
            ElabError::UnclaimedPort { .. } => Diagnostic::error(self.code(), self.to_string())
                .with_help("add an interface class that recognizes this port"),
            _ => Diagnostic::error(self.code(), self.to_string()),
        }
    }
}

/// Creates a warning for an interface of the unit itself that nothing reads
/// or drives.
pub fn warning_unconnected_interface(unit: &str, interface: &str) -> Diagnostic {
    Diagnostic::warning(W400, format!("interface `{interface}` is not connected"))
        .at(unit)
        .with_note("the port is emitted but carries no logic")
}

/// Creates a warning for a sub-unit port left open.
pub fn warning_open_port(unit: &str, instance: &str, interface: &str) -> Diagnostic {
    Diagnostic::warning(W401, format!("port `{interface}` of `{instance}` is left open"))
        .at(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let err = ElabError::NoExternalInterface { unit: "top".into() };
        assert_eq!(err.code().to_string(), "E403");
        assert_eq!(
            err.to_string(),
            "cannot find any external interface for unit `top`"
        );
        let err = ElabError::from(RtlError::MultipleDrivers { signal: "q".into() });
        assert_eq!(err.code().to_string(), "E302");
    }

    #[test]
    fn diagnostics() {
        let err = ElabError::UnclaimedPort {
            unit: "leaf".into(),
            port: "x".into(),
        };
        let diag = err.to_diagnostic();
        assert!(diag.severity.is_error());
        assert_eq!(diag.help.len(), 1);
        let warn = warning_open_port("top", "u0", "b");
        assert_eq!(warn.code.to_string(), "W401");
        assert_eq!(warn.location.as_deref(), Some("top"));
    }
}
