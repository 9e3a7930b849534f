//! Existence functions: `empty`, `exists`, `all`, `allTrue`, `anyTrue`,
//! `allFalse`, `anyFalse`, `count`, `distinct`, `isDistinct`
//!
//! None of these propagate empty: they are precisely the functions that
//! turn absence into an answer.

use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::evaluator::{EvalScope, truthiness};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::{boolean, integer};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};

const fn no_args(output: ReturnType, cardinality: OutputCardinality) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: &[],
        output,
        cardinality,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "empty",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_empty),
    },
    OperationDef {
        name: "exists",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::expression("criteria").optional()],
            output: ReturnType::Boolean,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_exists),
    },
    OperationDef {
        name: "all",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::expression("criteria")],
            output: ReturnType::Boolean,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_all),
    },
    OperationDef {
        name: "allTrue",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_all_true),
    },
    OperationDef {
        name: "anyTrue",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_any_true),
    },
    OperationDef {
        name: "allFalse",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_all_false),
    },
    OperationDef {
        name: "anyFalse",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_any_false),
    },
    OperationDef {
        name: "count",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Integer, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_count),
    },
    OperationDef {
        name: "distinct",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::PreserveElement, OutputCardinality::Collection),
        analyze: None,
        evaluate: Some(eval_distinct),
    },
    OperationDef {
        name: "isDistinct",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_is_distinct),
    },
];

fn eval_empty(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(boolean(invocation.input.is_empty()))
}

fn eval_exists(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    match invocation.expression_arg(0) {
        None => Ok(boolean(!invocation.input.is_empty())),
        Some(criteria) => {
            for (index, item) in invocation.input.iter().enumerate() {
                let outcome = scope.eval_for_item(criteria, item, index)?;
                if truthiness(&outcome, criteria.span)? {
                    return Ok(boolean(true));
                }
            }
            Ok(boolean(false))
        }
    }
}

/// Short-circuits to false on the first non-truthy item; empty input is
/// vacuously true.
fn eval_all(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let criteria = invocation.expression_arg(0).expect("required argument");
    for (index, item) in invocation.input.iter().enumerate() {
        let outcome = scope.eval_for_item(criteria, item, index)?;
        if !truthiness(&outcome, criteria.span)? {
            return Ok(boolean(false));
        }
    }
    Ok(boolean(true))
}

fn booleans_of(invocation: &Invocation<'_>) -> EvalResult<Vec<bool>> {
    invocation
        .input
        .iter()
        .map(|item| match item {
            Value::Boolean(b) => Ok(*b),
            other => Err(EvaluationError::InvalidArgument {
                function: invocation.entry.name,
                message: format!("input contains a {} value", other.type_name()),
                range: invocation.span,
            }),
        })
        .collect()
}

fn eval_all_true(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(boolean(booleans_of(invocation)?.iter().all(|b| *b)))
}

fn eval_any_true(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(boolean(booleans_of(invocation)?.iter().any(|b| *b)))
}

fn eval_all_false(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    Ok(boolean(booleans_of(invocation)?.iter().all(|b| !*b)))
}

fn eval_any_false(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    Ok(boolean(booleans_of(invocation)?.iter().any(|b| !*b)))
}

fn eval_count(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(integer(invocation.input.len() as i64))
}

fn eval_distinct(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(invocation.input.distinct())
}

fn eval_is_distinct(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    Ok(boolean(
        invocation.input.distinct().len() == invocation.input.len(),
    ))
}
