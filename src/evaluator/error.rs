//! Typed evaluation errors
//!
//! Domain-level anomalies (division by zero, coercion failures) yield
//! empty collections and never reach this type; these errors are the truly
//! exceptional conditions. Each carries the source range of the offending
//! node so tooling can underline the fault.

use crate::span::TextRange;
use thiserror::Error;

/// Result alias for evaluation.
pub type EvalResult<T> = Result<T, EvaluationError>;

/// Errors raised by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// An operation required a singleton (or empty) input and got more.
    #[error("expected a single value but found {found} items at {range}")]
    SingletonRequired {
        /// Number of items actually present
        found: usize,
        /// Offending node
        range: TextRange,
    },

    /// A criterion or logic operand was not a boolean singleton.
    #[error("expected a boolean criterion at {range}: {message}")]
    InvalidCriterion {
        /// What was found instead
        message: String,
        /// Offending node
        range: TextRange,
    },

    /// A name was called that the registry does not know.
    #[error("unknown function '{name}' at {range}")]
    UnknownFunction {
        /// The unresolved name
        name: String,
        /// Offending node
        range: TextRange,
    },

    /// A variable reference with no binding in scope.
    #[error("unknown variable '{name}' at {range}")]
    UnknownVariable {
        /// The unresolved name
        name: String,
        /// Offending node
        range: TextRange,
    },

    /// Wrong number of arguments for a function.
    #[error("{function} expects {expected} arguments, found {found} at {range}")]
    InvalidArgumentCount {
        /// Function name
        function: &'static str,
        /// Human-readable expectation, e.g. "1" or "1 to 2"
        expected: String,
        /// Number of arguments supplied
        found: usize,
        /// Offending node
        range: TextRange,
    },

    /// An argument had an unusable type or shape.
    #[error("invalid argument for {function} at {range}: {message}")]
    InvalidArgument {
        /// Function name
        function: &'static str,
        /// What was wrong
        message: String,
        /// Offending node
        range: TextRange,
    },

    /// A type specifier did not name a known type.
    #[error("invalid type specifier '{name}' at {range}")]
    InvalidTypeSpecifier {
        /// The text that failed to resolve
        name: String,
        /// Offending node
        range: TextRange,
    },

    /// Integer arithmetic left the 64-bit range.
    #[error("arithmetic overflow at {range}")]
    ArithmeticOverflow {
        /// Offending node
        range: TextRange,
    },

    /// A malformed regular expression reached `matches`/`replaceMatches`.
    #[error("invalid regular expression at {range}: {message}")]
    InvalidRegex {
        /// Error from the regex engine
        message: String,
        /// Offending node
        range: TextRange,
    },
}

impl EvaluationError {
    /// The source range of the offending node.
    pub fn range(&self) -> TextRange {
        match self {
            EvaluationError::SingletonRequired { range, .. }
            | EvaluationError::InvalidCriterion { range, .. }
            | EvaluationError::UnknownFunction { range, .. }
            | EvaluationError::UnknownVariable { range, .. }
            | EvaluationError::InvalidArgumentCount { range, .. }
            | EvaluationError::InvalidArgument { range, .. }
            | EvaluationError::InvalidTypeSpecifier { range, .. }
            | EvaluationError::ArithmeticOverflow { range }
            | EvaluationError::InvalidRegex { range, .. } => *range,
        }
    }
}
