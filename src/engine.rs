//! Engine facade: parse once, evaluate many times
//!
//! Wraps the parser and interpreter behind a single entry point with a
//! bounded compiled-expression cache. Parsing is fail-fast here; use the
//! parser's diagnostic mode directly when partial results are wanted.

use crate::ast::Expression;
use crate::error::Result;
use crate::evaluator::{EvaluationContext, Evaluator};
use crate::model::provider::{ModelProvider, NullModelProvider};
use crate::model::value::Collection;
use crate::parser::parse;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;

static NULL_PROVIDER: NullModelProvider = NullModelProvider;

/// Main entry point for parsing and evaluating expressions.
pub struct FhirPathEngine<'p> {
    provider: &'p dyn ModelProvider,
    /// Compiled expressions keyed by source text
    expression_cache: FxHashMap<String, Arc<Expression>>,
    /// Cache bound; the cache is cleared wholesale when it fills up
    max_cache_size: usize,
}

impl Default for FhirPathEngine<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl FhirPathEngine<'static> {
    /// An engine without a model provider: model-type checks fall back to
    /// resource-type name matching.
    pub fn new() -> Self {
        Self::with_provider(&NULL_PROVIDER)
    }
}

impl<'p> FhirPathEngine<'p> {
    /// An engine consulting `provider` for `is`/`as`/`ofType` checks.
    pub fn with_provider(provider: &'p dyn ModelProvider) -> Self {
        Self {
            provider,
            expression_cache: FxHashMap::default(),
            max_cache_size: 1000,
        }
    }

    /// Evaluate `expression` against JSON input data.
    pub fn evaluate(&mut self, expression: &str, input: &JsonValue) -> Result<Collection> {
        let ast = self.get_or_compile(expression)?;
        let input = Collection::from_json(input);
        let result = Evaluator::new(self.provider).evaluate(&ast, input, None)?;
        Ok(result.value)
    }

    /// Evaluate with an explicit starting context (environment variables,
    /// trace sink).
    pub fn evaluate_with_context(
        &mut self,
        expression: &str,
        input: &JsonValue,
        context: EvaluationContext,
    ) -> Result<Collection> {
        let ast = self.get_or_compile(expression)?;
        let input = Collection::from_json(input);
        let result = Evaluator::new(self.provider).evaluate(&ast, input, Some(context))?;
        Ok(result.value)
    }

    /// Parse `expression`, reusing the cached AST when possible.
    pub fn get_or_compile(&mut self, expression: &str) -> Result<Arc<Expression>> {
        if let Some(ast) = self.expression_cache.get(expression) {
            return Ok(Arc::clone(ast));
        }
        let ast = Arc::new(parse(expression)?);
        if self.expression_cache.len() >= self.max_cache_size {
            self.expression_cache.clear();
        }
        self.expression_cache
            .insert(expression.to_string(), Arc::clone(&ast));
        Ok(ast)
    }
}
