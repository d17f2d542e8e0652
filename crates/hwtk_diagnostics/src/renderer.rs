//! Plain-text rendering of diagnostics.

use crate::diagnostic::Diagnostic;

/// Formats a diagnostic for some output target.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;

    /// Renders a batch, one diagnostic after another.
    fn render_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.render(d)).collect()
    }
}

/// Renders diagnostics in a rustc-like layout:
///
/// ```text
/// warning[W400]: interface `dout` is never connected
///   --> top
///    = note: ...
///    = help: ...
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}[{}]: {}\n", diag.severity, diag.code, diag.message);
        if let Some(location) = &diag.location {
            out.push_str(&format!("  --> {location}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;

    #[test]
    fn render_with_location_and_notes() {
        let diag = Diagnostic::warning(DiagnosticCode::warning(400), "interface `dout` is never connected")
            .at("top")
            .with_note("it has no source")
            .with_help("remove it");
        let out = TerminalRenderer::new().render(&diag);
        assert!(out.starts_with("warning[W400]: interface `dout` is never connected\n"));
        assert!(out.contains("  --> top\n"));
        assert!(out.contains("= note: it has no source"));
        assert!(out.contains("= help: remove it"));
    }

    #[test]
    fn render_without_location() {
        let diag = Diagnostic::error(DiagnosticCode::error(501), "delta limit");
        let out = TerminalRenderer::new().render(&diag);
        assert_eq!(out, "error[E501]: delta limit\n");
    }

    #[test]
    fn render_all_concatenates() {
        let diags = vec![
            Diagnostic::error(DiagnosticCode::error(1), "a"),
            Diagnostic::error(DiagnosticCode::error(2), "b"),
        ];
        let out = TerminalRenderer::new().render_all(&diags);
        assert_eq!(out.lines().count(), 2);
    }
}
