//! Interpreter, evaluation context and evaluation errors

pub mod context;
pub mod error;
mod interpreter;

pub use context::{EvaluationContext, IteratorFrame, RESERVED_VARIABLES, TraceSink};
pub use error::{EvalResult, EvaluationError};
pub use interpreter::{
    EvalScope, EvaluationResult, Evaluator, evaluate, evaluate_with_context, truthiness,
};
