//! Parse errors for fail-fast mode

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::span::TextRange;
use thiserror::Error;

/// A parse failure. Fail-fast parsing surfaces the first fault as this
/// typed error; diagnostic mode collects the same information as
/// [`Diagnostic`]s instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Fault found while tokenizing
    #[error("{0}")]
    Lexical(Diagnostic),
    /// Fault found while parsing the token stream
    #[error("{0}")]
    Syntax(Diagnostic),
}

impl ParseError {
    /// The underlying diagnostic.
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            ParseError::Lexical(diagnostic) | ParseError::Syntax(diagnostic) => diagnostic,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> DiagnosticCode {
        self.diagnostic().code
    }

    /// Source range of the fault.
    pub fn range(&self) -> TextRange {
        self.diagnostic().range
    }

    /// Consume into the underlying diagnostic.
    pub fn into_diagnostic(self) -> Diagnostic {
        match self {
            ParseError::Lexical(diagnostic) | ParseError::Syntax(diagnostic) => diagnostic,
        }
    }
}
