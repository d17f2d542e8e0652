//! Common result and error types for the hwtk workspace.

/// Result type for operations that can only fail on an internal bug.
///
/// User-facing failures (a bad operand, a port that cannot be matched) have
/// their own error enums in the crates that detect them. `InternalError` is
/// reserved for broken graph invariants such as a dangling node id.
pub type HwtkResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in hwtk, not a problem in the design.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the broken invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("dangling operator 7");
        assert_eq!(format!("{err}"), "internal error: dangling operator 7");
    }

    #[test]
    fn from_string() {
        let r: HwtkResult<()> = Err("lost node".to_string().into());
        assert_eq!(r.unwrap_err().message, "lost node");
    }
}
