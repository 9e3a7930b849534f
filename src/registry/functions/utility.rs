//! Utility functions: `trace`, `now`, `today`, `timeOfDay`, `not`,
//! `defineVariable`, `aggregate`

use crate::ast::{ExpressionKind, LiteralValue};
use crate::evaluator::context::EvaluationContext;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::evaluator::{EvalScope, IteratorFrame};
use crate::model::temporal::{Date, DateTime, Time};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::singleton_string;
use crate::registry::operators::logic::negate_collection;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};
use chrono::{Datelike, Local, Timelike};

const fn clock_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: &[],
        output,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: false,
        deterministic: false,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "trace",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[
                Parameter::value("name", ParameterType::String),
                Parameter::expression("projection").optional(),
            ],
            output: ReturnType::PreserveInput,
            cardinality: OutputCardinality::PreserveInput,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_trace),
    },
    OperationDef {
        name: "now",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: clock_signature(ReturnType::DateTime),
        analyze: None,
        evaluate: Some(eval_now),
    },
    OperationDef {
        name: "today",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: clock_signature(ReturnType::Date),
        analyze: None,
        evaluate: Some(eval_today),
    },
    OperationDef {
        name: "timeOfDay",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: clock_signature(ReturnType::Time),
        analyze: None,
        evaluate: Some(eval_time_of_day),
    },
    OperationDef {
        name: "not",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[],
            output: ReturnType::Boolean,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_not),
    },
    OperationDef {
        name: "defineVariable",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[
                Parameter::expression("name"),
                Parameter::collection("value").optional(),
            ],
            output: ReturnType::PreserveInput,
            cardinality: OutputCardinality::PreserveInput,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_define_variable),
    },
    OperationDef {
        name: "aggregate",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[
                Parameter::expression("aggregator"),
                Parameter::collection("init").optional(),
            ],
            output: ReturnType::Any,
            cardinality: OutputCardinality::Collection,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_aggregate),
    },
];

/// Passes the input through unchanged, reporting it (or a projection of
/// it) to the context's trace sink, or the `log` crate without one.
fn eval_trace(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some(name) = singleton_string(invocation, 0)? else {
        return Ok(invocation.input.share());
    };
    let reported = match invocation.expression_arg(1) {
        Some(projection) => scope.eval(projection, &invocation.input)?,
        None => invocation.input.share(),
    };
    match scope.ctx().trace_sink() {
        Some(sink) => sink.trace(&name, &reported),
        None => log::debug!("trace '{name}': {}", reported.to_json()),
    }
    Ok(invocation.input.share())
}

fn eval_now(_scope: &mut EvalScope<'_>, _invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let now = Local::now().fixed_offset();
    let datetime = DateTime {
        date: Date {
            year: now.year(),
            month: Some(now.month()),
            day: Some(now.day()),
        },
        time: Some(Time {
            hour: now.hour(),
            minute: now.minute(),
            second: Some(now.second()),
            millisecond: Some(now.nanosecond() / 1_000_000),
        }),
        offset: Some(*now.offset()),
    };
    Ok(Collection::singleton(Value::DateTime(datetime)))
}

fn eval_today(_scope: &mut EvalScope<'_>, _invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let now = Local::now();
    let date = Date {
        year: now.year(),
        month: Some(now.month()),
        day: Some(now.day()),
    };
    Ok(Collection::singleton(Value::Date(date)))
}

fn eval_time_of_day(
    _scope: &mut EvalScope<'_>,
    _invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let now = Local::now();
    let time = Time {
        hour: now.hour(),
        minute: now.minute(),
        second: Some(now.second()),
        millisecond: Some(now.nanosecond() / 1_000_000),
    };
    Ok(Collection::singleton(Value::Time(time)))
}

fn eval_not(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(negate_collection(&invocation.input))
}

/// Binds a variable in a child scope and passes the input through.
/// Redefining a visible or reserved name silently yields empty.
fn eval_define_variable(
    scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let name_expr = invocation.expression_arg(0).expect("required argument");
    let name = match &name_expr.kind {
        ExpressionKind::Literal(LiteralValue::String(name)) => name.clone(),
        _ => {
            return Err(EvaluationError::InvalidArgument {
                function: "defineVariable",
                message: "the variable name must be a string literal".to_string(),
                range: name_expr.span,
            });
        }
    };

    if EvaluationContext::is_reserved(&name) || scope.ctx().is_defined(&name) {
        return Ok(Collection::empty());
    }

    let value = match invocation.value_arg(1) {
        Some(value) => value.share(),
        None => invocation.input.share(),
    };
    let extended = scope.ctx().define(name, value);
    scope.set_ctx(extended);
    Ok(invocation.input.share())
}

/// Folds the input through the aggregator expression, threading `$total`.
fn eval_aggregate(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let aggregator = invocation.expression_arg(0).expect("required argument");
    let mut total = match invocation.value_arg(1) {
        Some(init) => init.share(),
        None => Collection::empty(),
    };
    for (index, item) in invocation.input.iter().enumerate() {
        let focus = Collection::singleton(item.clone());
        let ctx = scope.ctx().with_iterator(IteratorFrame {
            this: focus.share(),
            index: Some(index as i64),
            total: Some(total.share()),
        });
        total = scope.eval_in(aggregator, &focus, &ctx)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::context::{EvaluationContext, TraceSink};
    use crate::evaluator::{evaluate, evaluate_with_context};
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;
    use std::sync::{Arc, Mutex};

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    #[test]
    fn define_variable_binds_and_passes_through() {
        assert_eq!(
            run("(1 | 2).defineVariable('v').count()").as_slice(),
            &[Value::Integer(2)]
        );
        assert_eq!(
            run("(1).defineVariable('v', 42).select(%v)").as_slice(),
            &[Value::Integer(42)]
        );
    }

    #[test]
    fn define_variable_redefinition_silently_fails() {
        assert!(run("defineVariable('v1','a').defineVariable('v1','b').select(%v1)").is_empty());
        assert!(run("defineVariable('context','x')").is_empty());
        assert!(run("defineVariable('rootResource','x')").is_empty());
    }

    #[test]
    fn define_variable_requires_a_literal_name() {
        let ast = parse("defineVariable('a' + 'b')").unwrap();
        assert!(evaluate(&ast, Collection::empty()).is_err());
    }

    #[test]
    fn sibling_argument_scopes_are_independent() {
        assert_eq!(
            run("'aaa'.replace(defineVariable('p','aaa').select(%p), defineVariable('p','bbb').select(%p))")
                .as_slice(),
            &[Value::String("bbb".into())]
        );
    }

    #[test]
    fn aggregate_threads_total() {
        assert_eq!(
            run("(1 | 2 | 3 | 4).aggregate($this + $total, 0)").as_slice(),
            &[Value::Integer(10)]
        );
        assert_eq!(
            run("(1 | 2 | 3).aggregate($this * $total, 1)").as_slice(),
            &[Value::Integer(6)]
        );
    }

    #[test]
    fn trace_passes_through_and_reports() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<(String, usize)>>);
        impl TraceSink for Recorder {
            fn trace(&self, name: &str, values: &Collection) {
                self.0
                    .lock()
                    .unwrap()
                    .push((name.to_string(), values.len()));
            }
        }

        let recorder = Arc::new(Recorder::default());
        let ast = parse("(1 | 2).trace('items').count()").unwrap();
        let ctx =
            EvaluationContext::new(Collection::empty()).with_trace_sink(recorder.clone());
        let result = evaluate_with_context(&ast, Collection::empty(), ctx).unwrap();
        assert_eq!(result.value.as_slice(), &[Value::Integer(2)]);
        assert_eq!(recorder.0.lock().unwrap().as_slice(), &[("items".into(), 2)]);
    }

    #[test]
    fn clock_functions_yield_singletons() {
        assert_eq!(run("now().count()").as_slice(), &[Value::Integer(1)]);
        assert_eq!(run("today().count()").as_slice(), &[Value::Integer(1)]);
        assert_eq!(run("timeOfDay().count()").as_slice(), &[Value::Integer(1)]);
    }

    #[test]
    fn not_function_matches_prefix_operator() {
        assert_eq!(run("true.not()").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(run("{}.not()").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run("5.not()").as_slice(), &[Value::Boolean(false)]);
        assert!(run("(1 | 2).not()").is_empty());
    }
}
