//! FHIRPath expression engine
//!
//! A library that compiles textual FHIRPath expressions into an AST and
//! evaluates them against hierarchical JSON-like data, yielding ordered
//! collections of values under three-valued logic. Five subsystems share
//! one AST: the lexer, the dual-mode Pratt parser, the operation
//! registry, the static type analyzer, and the tree-walking interpreter.
//!
//! ```
//! use fhirpath_engine::FhirPathEngine;
//! use serde_json::json;
//!
//! let mut engine = FhirPathEngine::new();
//! let patient = json!({
//!     "name": [
//!         {"use": "official", "given": ["Peter", "James"]},
//!         {"use": "nickname", "given": ["Jim"]}
//!     ]
//! });
//! let given = engine
//!     .evaluate("name.where(use = 'official').given", &patient)
//!     .unwrap();
//! assert_eq!(given.len(), 2);
//! ```

pub mod analyzer;
pub mod ast;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;
pub mod span;

pub use analyzer::{AnalysisMode, AnalysisResult, AnalyzerOptions, analyze, analyze_with_input};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use engine::FhirPathEngine;
pub use error::{FhirPathError, Result};
pub use evaluator::{
    EvaluationContext, EvaluationError, EvaluationResult, Evaluator, TraceSink, evaluate,
    evaluate_with_context,
};
pub use model::{Collection, ModelProvider, NullModelProvider, Value};
pub use parser::{ParseError, ParseResult, ParserOptions, parse, parse_with_options};
pub use span::TextRange;
