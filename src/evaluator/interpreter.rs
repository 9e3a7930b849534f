//! Tree-walking interpreter
//!
//! Dispatches per node, threading an evaluation context left to right
//! through `.` chains. Operator and function semantics live in registry
//! evaluate hooks; the interpreter implements the structural rules: dot
//! navigation, property access, indexing, collection literals, variables,
//! and empty-propagation per the entry's signature.

use super::context::{EvaluationContext, IteratorFrame};
use super::error::{EvalResult, EvaluationError};
use crate::ast::{BinaryOperator, Expression, ExpressionKind, FunctionCall, Variable};
use crate::model::provider::{ModelProvider, NullModelProvider};
use crate::model::value::{Collection, Value};
use crate::registry::{Argument, Invocation, OperationDef, ParameterKind, registry};
use crate::span::TextRange;

static NULL_PROVIDER: NullModelProvider = NullModelProvider;

/// Output of an evaluation: the value and the (possibly extended) context.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// The resulting collection
    pub value: Collection,
    /// The context after evaluation; carries `defineVariable` bindings
    pub context: EvaluationContext,
}

/// Evaluate `ast` against `input` with a fresh context and no model
/// provider.
pub fn evaluate(ast: &Expression, input: Collection) -> EvalResult<EvaluationResult> {
    Evaluator::new(&NULL_PROVIDER).evaluate(ast, input, None)
}

/// Evaluate `ast` against `input` with an explicit starting context.
pub fn evaluate_with_context(
    ast: &Expression,
    input: Collection,
    context: EvaluationContext,
) -> EvalResult<EvaluationResult> {
    Evaluator::new(&NULL_PROVIDER).evaluate(ast, input, Some(context))
}

/// The interpreter. Stateless between evaluations; all evaluation state
/// lives in the threaded context, so one instance may be shared freely.
pub struct Evaluator<'p> {
    provider: &'p dyn ModelProvider,
}

impl<'p> Evaluator<'p> {
    /// Create an interpreter consulting `provider` for model-type checks.
    pub fn new(provider: &'p dyn ModelProvider) -> Self {
        Self { provider }
    }

    /// Run an evaluation. Without an explicit context, a fresh one rooted
    /// at `input` is created and `$this` starts as the input itself.
    pub fn evaluate(
        &self,
        ast: &Expression,
        input: Collection,
        context: Option<EvaluationContext>,
    ) -> EvalResult<EvaluationResult> {
        let context = context.unwrap_or_else(|| EvaluationContext::new(input.share()));
        let context = match context.iterator() {
            Some(_) => context,
            None => context.with_iterator(IteratorFrame {
                this: input.share(),
                index: None,
                total: None,
            }),
        };
        let (value, context) = self.eval(ast, &input, &context)?;
        Ok(EvaluationResult { value, context })
    }

    /// Evaluate one node. Returns the value and the context visible to
    /// whatever is chained after this node.
    pub(crate) fn eval(
        &self,
        node: &Expression,
        input: &Collection,
        ctx: &EvaluationContext,
    ) -> EvalResult<(Collection, EvaluationContext)> {
        match &node.kind {
            ExpressionKind::Literal(literal) => {
                let entry = registry().literal(literal);
                let invocation = Invocation {
                    entry,
                    input: input.share(),
                    args: vec![Argument::Literal(literal)],
                    span: node.span,
                };
                let value = self.invoke(entry, &invocation, ctx)?.0;
                Ok((value, ctx.clone()))
            }

            ExpressionKind::Identifier(name) => {
                let mut items = Vec::new();
                for item in input.iter() {
                    items.extend(item.property(name).into_vec());
                }
                Ok((Collection::from_vec(items), ctx.clone()))
            }

            ExpressionKind::TypeIdentifier(name) => {
                let items: Vec<Value> = input
                    .iter()
                    .filter(|item| item.matches_type(name, self.provider))
                    .cloned()
                    .collect();
                Ok((Collection::from_vec(items), ctx.clone()))
            }

            ExpressionKind::Variable(variable) => {
                let value = self.resolve_variable(variable, ctx, node.span)?;
                Ok((value, ctx.clone()))
            }

            ExpressionKind::Binary(binary) if binary.op == BinaryOperator::Dot => {
                self.eval_navigation(&binary.left, &binary.right, input, ctx)
            }

            ExpressionKind::Binary(binary) => {
                let entry = registry().binary(binary.op).ok_or_else(|| {
                    EvaluationError::UnknownFunction {
                        name: binary.op.symbol().to_string(),
                        range: node.span,
                    }
                })?;
                let operands = [&binary.left, &binary.right];
                let mut args = Vec::with_capacity(2);
                for (parameter, operand) in entry.signature.parameters.iter().zip(operands) {
                    args.push(self.prepare_argument(entry, parameter.kind, operand, input, ctx)?);
                }
                let invocation = Invocation {
                    entry,
                    input: input.share(),
                    args,
                    span: node.span,
                };
                if Self::propagates_to_empty(entry, &invocation) {
                    return Ok((Collection::empty(), ctx.clone()));
                }
                self.invoke(entry, &invocation, ctx)
            }

            ExpressionKind::Unary(unary) => {
                let entry = registry().unary(unary.op).ok_or_else(|| {
                    EvaluationError::UnknownFunction {
                        name: unary.op.symbol().to_string(),
                        range: node.span,
                    }
                })?;
                let parameter = entry.signature.parameters[0];
                let argument =
                    self.prepare_argument(entry, parameter.kind, &unary.operand, input, ctx)?;
                let invocation = Invocation {
                    entry,
                    input: input.share(),
                    args: vec![argument],
                    span: node.span,
                };
                if Self::propagates_to_empty(entry, &invocation) {
                    return Ok((Collection::empty(), ctx.clone()));
                }
                self.invoke(entry, &invocation, ctx)
            }

            ExpressionKind::Function(call) => self.eval_function(call, input, ctx, node.span),

            ExpressionKind::Index(index) => {
                let (base, base_ctx) = self.eval(&index.base, input, ctx)?;
                let (indices, _) = self.eval(&index.index, input, ctx)?;
                if indices.is_empty() {
                    return Ok((Collection::empty(), base_ctx));
                }
                let position = match indices.as_singleton() {
                    Some(Value::Integer(i)) => *i,
                    Some(_) => {
                        return Err(EvaluationError::InvalidArgument {
                            function: "[]",
                            message: "index must be an integer".to_string(),
                            range: index.index.span,
                        });
                    }
                    None => {
                        return Err(EvaluationError::SingletonRequired {
                            found: indices.len(),
                            range: index.index.span,
                        });
                    }
                };
                let value = usize::try_from(position)
                    .ok()
                    .and_then(|i| base.get(i))
                    .map(|item| Collection::singleton(item.clone()))
                    .unwrap_or_else(Collection::empty);
                Ok((value, base_ctx))
            }

            ExpressionKind::Collection(elements) => {
                let mut items = Vec::new();
                for element in elements {
                    let (value, _) = self.eval(element, input, ctx)?;
                    items.extend(value.into_vec());
                }
                Ok((Collection::from_vec(items), ctx.clone()))
            }

            // Recovery placeholders evaluate to empty
            ExpressionKind::Error(_) | ExpressionKind::Incomplete(_) => {
                Ok((Collection::empty(), ctx.clone()))
            }
        }
    }

    /// Rule: `A.B` evaluates `A`, then either pipes the whole result into
    /// a function call, or navigates per item with `$this` rebound.
    fn eval_navigation(
        &self,
        left: &Expression,
        right: &Expression,
        input: &Collection,
        ctx: &EvaluationContext,
    ) -> EvalResult<(Collection, EvaluationContext)> {
        let (left_value, left_ctx) = self.eval(left, input, ctx)?;
        match &right.kind {
            ExpressionKind::Function(call) => {
                self.eval_function(call, &left_value, &left_ctx, right.span)
            }
            // In property position an uppercase name is a plain property,
            // not a type filter.
            ExpressionKind::TypeIdentifier(name) => {
                let mut items = Vec::new();
                for item in left_value.iter() {
                    items.extend(item.property(name).into_vec());
                }
                Ok((Collection::from_vec(items), left_ctx))
            }
            _ => {
                let parent_frame = left_ctx.iterator();
                let (index, total) = match parent_frame {
                    Some(frame) => (frame.index, frame.total.clone()),
                    None => (None, None),
                };
                let mut items = Vec::new();
                for item in left_value.iter() {
                    let focus = Collection::singleton(item.clone());
                    let item_ctx = left_ctx.with_iterator(IteratorFrame {
                        this: focus.share(),
                        index,
                        total: total.clone(),
                    });
                    let (value, _) = self.eval(right, &focus, &item_ctx)?;
                    items.extend(value.into_vec());
                }
                Ok((Collection::from_vec(items), left_ctx))
            }
        }
    }

    fn eval_function(
        &self,
        call: &FunctionCall,
        input: &Collection,
        ctx: &EvaluationContext,
        span: TextRange,
    ) -> EvalResult<(Collection, EvaluationContext)> {
        let entry = registry().function(&call.name).ok_or_else(|| {
            EvaluationError::UnknownFunction {
                name: call.name.clone(),
                range: call.name_span,
            }
        })?;
        if !entry.signature.accepts_arg_count(call.args.len()) {
            return Err(EvaluationError::InvalidArgumentCount {
                function: entry.name,
                expected: entry.signature.arity_description(),
                found: call.args.len(),
                range: span,
            });
        }

        let mut args = Vec::with_capacity(call.args.len());
        for (parameter, arg_node) in entry.signature.parameters.iter().zip(call.args.iter()) {
            args.push(self.prepare_argument(entry, parameter.kind, arg_node, input, ctx)?);
        }

        let invocation = Invocation {
            entry,
            input: input.share(),
            args,
            span,
        };
        if entry.signature.propagates_empty
            && (invocation.input.is_empty() || Self::any_value_arg_empty(&invocation))
        {
            return Ok((Collection::empty(), ctx.clone()));
        }
        self.invoke(entry, &invocation, ctx)
    }

    fn prepare_argument<'a>(
        &self,
        entry: &'static OperationDef,
        kind: ParameterKind,
        node: &'a Expression,
        input: &Collection,
        ctx: &EvaluationContext,
    ) -> EvalResult<Argument<'a>> {
        match kind {
            ParameterKind::Value => {
                let (value, _) = self.eval(node, input, ctx)?;
                Ok(Argument::Value(value))
            }
            ParameterKind::Expression => Ok(Argument::Expression(node)),
            ParameterKind::TypeSpecifier => match node.as_type_name() {
                Some(name) => Ok(Argument::Type(name)),
                None => Err(EvaluationError::InvalidTypeSpecifier {
                    name: format!("argument of {}", entry.name),
                    range: node.span,
                }),
            },
        }
    }

    fn any_value_arg_empty(invocation: &Invocation<'_>) -> bool {
        invocation
            .args
            .iter()
            .any(|arg| matches!(arg, Argument::Value(value) if value.is_empty()))
    }

    fn propagates_to_empty(entry: &'static OperationDef, invocation: &Invocation<'_>) -> bool {
        entry.signature.propagates_empty && Self::any_value_arg_empty(invocation)
    }

    fn invoke(
        &self,
        entry: &'static OperationDef,
        invocation: &Invocation<'_>,
        ctx: &EvaluationContext,
    ) -> EvalResult<(Collection, EvaluationContext)> {
        let evaluate = entry.evaluate.ok_or_else(|| EvaluationError::UnknownFunction {
            name: entry.name.to_string(),
            range: invocation.span,
        })?;
        let mut scope = EvalScope {
            evaluator: self,
            ctx: ctx.clone(),
        };
        let value = evaluate(&mut scope, invocation)?;
        Ok((value, scope.ctx))
    }

    fn resolve_variable(
        &self,
        variable: &Variable,
        ctx: &EvaluationContext,
        span: TextRange,
    ) -> EvalResult<Collection> {
        match variable {
            Variable::This => ctx.this().map(Collection::share).ok_or_else(|| {
                EvaluationError::UnknownVariable {
                    name: "$this".to_string(),
                    range: span,
                }
            }),
            Variable::Index => match ctx.iterator().and_then(|frame| frame.index) {
                Some(index) => Ok(Collection::singleton(Value::Integer(index))),
                None => Err(EvaluationError::UnknownVariable {
                    name: "$index".to_string(),
                    range: span,
                }),
            },
            Variable::Total => match ctx.iterator().and_then(|frame| frame.total.clone()) {
                Some(total) => Ok(total),
                None => Err(EvaluationError::UnknownVariable {
                    name: "$total".to_string(),
                    range: span,
                }),
            },
            Variable::Environment(name) => {
                ctx.variable(name)
                    .ok_or_else(|| EvaluationError::UnknownVariable {
                        name: format!("%{name}"),
                        range: span,
                    })
            }
        }
    }
}

/// What evaluate hooks see: a handle for recursive evaluation plus the
/// current context, which context-transforming operations may replace.
pub struct EvalScope<'e> {
    pub(crate) evaluator: &'e Evaluator<'e>,
    pub(crate) ctx: EvaluationContext,
}

impl EvalScope<'_> {
    /// Evaluate a deferred expression against `input` in the current
    /// context. Context updates made inside are discarded.
    pub fn eval(&self, expression: &Expression, input: &Collection) -> EvalResult<Collection> {
        let (value, _) = self.evaluator.eval(expression, input, &self.ctx)?;
        Ok(value)
    }

    /// Evaluate a deferred expression in an explicit context.
    pub fn eval_in(
        &self,
        expression: &Expression,
        input: &Collection,
        ctx: &EvaluationContext,
    ) -> EvalResult<Collection> {
        let (value, _) = self.evaluator.eval(expression, input, ctx)?;
        Ok(value)
    }

    /// Evaluate a deferred expression per item, with `$this` and `$index`
    /// bound the way the iterator functions do.
    pub fn eval_for_item(
        &self,
        expression: &Expression,
        item: &Value,
        index: usize,
    ) -> EvalResult<Collection> {
        let focus = Collection::singleton(item.clone());
        let ctx = self.ctx.with_iterator(IteratorFrame {
            this: focus.share(),
            index: Some(index as i64),
            total: None,
        });
        self.eval_in(expression, &focus, &ctx)
    }

    /// The current evaluation context.
    pub fn ctx(&self) -> &EvaluationContext {
        &self.ctx
    }

    /// Replace the context (context-transforming operations only).
    pub fn set_ctx(&mut self, ctx: EvaluationContext) {
        self.ctx = ctx;
    }

    /// The model provider in effect.
    pub fn provider(&self) -> &dyn ModelProvider {
        self.evaluator.provider
    }
}

/// Criterion truthiness: empty is false, a single boolean is itself, any
/// other single item is true. A multi-element criterion is a typed error,
/// uniformly across the engine.
pub fn truthiness(value: &Collection, range: TextRange) -> EvalResult<bool> {
    match value.as_slice() {
        [] => Ok(false),
        [Value::Boolean(b)] => Ok(*b),
        [_] => Ok(true),
        items => Err(EvaluationError::SingletonRequired {
            found: items.len(),
            range,
        }),
    }
}
