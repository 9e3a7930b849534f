//! Top-level error type for the engine facade

use crate::evaluator::EvaluationError;
use crate::parser::ParseError;
use thiserror::Error;

/// Result alias for the engine facade.
pub type Result<T> = std::result::Result<T, FhirPathError>;

/// Any failure the engine can surface: a parse fault or a raised
/// evaluation error. Both carry the source range of the fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FhirPathError {
    /// The expression text did not parse
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// Evaluation raised a typed error
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}
