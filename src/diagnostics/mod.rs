//! Diagnostics shared by the parser and the analyzer
//!
//! Every diagnostic carries a severity, a stable machine-readable code, a
//! human message and a source range inside the original expression text so
//! tooling can underline the fault.

mod formatter;

pub use formatter::format_diagnostic;

use crate::span::TextRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Provides helpful information
    Info,
    /// May indicate a problem but doesn't prevent evaluation
    Warning,
    /// Prevents successful parsing, analysis or evaluation
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable machine-readable diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Function name not present in the registry
    UnknownFunction,
    /// Operator token with no registry entry
    UnknownOperator,
    /// Variable reference with no binding in scope
    UnknownVariable,
    /// Property not found on the navigated type
    UnknownProperty,
    /// Operand or argument type incompatible with the signature
    TypeMismatch,
    /// Wrong number of arguments for a function
    InvalidArgCount,
    /// Operator used in a position its form does not allow
    InvalidOperator,
    /// `(`, `[` or `{` without its closing counterpart
    UnclosedBracket,
    /// String literal not terminated before end of input
    UnclosedString,
    /// Block comment not terminated before end of input
    UnclosedComment,
    /// Token that no rule can accept at this position
    UnexpectedToken,
}

impl DiagnosticCode {
    /// The stable identifier used in serialized output and test assertions.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnknownFunction => "UNKNOWN_FUNCTION",
            DiagnosticCode::UnknownOperator => "UNKNOWN_OPERATOR",
            DiagnosticCode::UnknownVariable => "UNKNOWN_VARIABLE",
            DiagnosticCode::UnknownProperty => "UNKNOWN_PROPERTY",
            DiagnosticCode::TypeMismatch => "TYPE_MISMATCH",
            DiagnosticCode::InvalidArgCount => "INVALID_ARG_COUNT",
            DiagnosticCode::InvalidOperator => "INVALID_OPERATOR",
            DiagnosticCode::UnclosedBracket => "UNCLOSED_BRACKET",
            DiagnosticCode::UnclosedString => "UNCLOSED_STRING",
            DiagnosticCode::UnclosedComment => "UNCLOSED_COMMENT",
            DiagnosticCode::UnexpectedToken => "UNEXPECTED_TOKEN",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic message with its source range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How severe the finding is
    pub severity: Severity,
    /// Stable machine-readable code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
    /// Range inside the original expression text
    pub range: TextRange,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            range,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            range,
        }
    }

    /// Create an info diagnostic.
    pub fn info(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self {
            severity: Severity::Info,
            code,
            message: message.into(),
            range,
        }
    }

    /// Whether this diagnostic has error severity.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} at {}",
            self.severity, self.code, self.message, self.range
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_identifiers() {
        assert_eq!(DiagnosticCode::UnclosedComment.as_str(), "UNCLOSED_COMMENT");
        assert_eq!(DiagnosticCode::TypeMismatch.as_str(), "TYPE_MISMATCH");
        assert_eq!(
            DiagnosticCode::UnexpectedToken.to_string(),
            "UNEXPECTED_TOKEN"
        );
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }
}
