//! Plain-text rendering of diagnostics against the original source

use super::Diagnostic;
use crate::span::line_column;
use std::fmt::Write;

/// Render a diagnostic with the offending source line and a caret underline.
///
/// ```text
/// error [UNCLOSED_COMMENT] unterminated block comment at 1:7
///   2 + 2 /* oops
///         ^^^^^^^^
/// ```
pub fn format_diagnostic(source: &str, diagnostic: &Diagnostic) -> String {
    let (line, column) = line_column(source, diagnostic.range.start);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}] {} at {line}:{column}",
        diagnostic.severity, diagnostic.code, diagnostic.message
    );

    let line_start = source[..diagnostic.range.start.min(source.len())]
        .rfind('\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let line_end = source[line_start..]
        .find('\n')
        .map(|pos| line_start + pos)
        .unwrap_or(source.len());
    let line_text = &source[line_start..line_end];
    let _ = writeln!(out, "  {line_text}");

    let caret_offset = source[line_start..diagnostic.range.start.min(source.len())]
        .chars()
        .count();
    let caret_len = diagnostic
        .range
        .text(source)
        .chars()
        .take_while(|ch| *ch != '\n')
        .count()
        .max(1);
    let _ = write!(
        out,
        "  {}{}",
        " ".repeat(caret_offset),
        "^".repeat(caret_len)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::span::TextRange;

    #[test]
    fn underlines_offending_text() {
        let source = "name.where(";
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnclosedBracket,
            "unclosed parenthesis",
            TextRange::new(10, 11),
        );
        let rendered = format_diagnostic(source, &diagnostic);
        assert!(rendered.contains("UNCLOSED_BRACKET"));
        assert!(rendered.contains("at 1:11"));
        assert!(rendered.lines().last().unwrap().trim_end().ends_with('^'));
    }

    #[test]
    fn multiline_source_points_at_right_line() {
        let source = "a and\nb orr c";
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnexpectedToken,
            "unexpected token",
            TextRange::new(8, 11),
        );
        let rendered = format_diagnostic(source, &diagnostic);
        assert!(rendered.contains("at 2:3"));
        assert!(rendered.contains("b orr c"));
    }
}
