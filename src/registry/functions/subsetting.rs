//! Subsetting functions: `single`, `first`, `last`, `tail`, `skip`,
//! `take`, `intersect`, `exclude`

use crate::evaluator::EvalScope;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::singleton_integer;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};

const fn no_args(cardinality: OutputCardinality) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: &[],
        output: ReturnType::PreserveElement,
        cardinality,
        propagates_empty: false,
        deterministic: true,
    }
}

const NUM_PARAM: &[Parameter] = &[Parameter::value("num", ParameterType::Integer)];

const OTHER_PARAM: &[Parameter] = &[Parameter::collection("other")];

const fn numbered() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: NUM_PARAM,
        output: ReturnType::PreserveElement,
        cardinality: OutputCardinality::Collection,
        propagates_empty: true,
        deterministic: true,
    }
}

const fn against_other() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: OTHER_PARAM,
        output: ReturnType::PreserveElement,
        cardinality: OutputCardinality::Collection,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "single",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_single),
    },
    OperationDef {
        name: "first",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_first),
    },
    OperationDef {
        name: "last",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_last),
    },
    OperationDef {
        name: "tail",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: no_args(OutputCardinality::Collection),
        analyze: None,
        evaluate: Some(eval_tail),
    },
    OperationDef {
        name: "skip",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: numbered(),
        analyze: None,
        evaluate: Some(eval_skip),
    },
    OperationDef {
        name: "take",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: numbered(),
        analyze: None,
        evaluate: Some(eval_take),
    },
    OperationDef {
        name: "intersect",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: against_other(),
        analyze: None,
        evaluate: Some(eval_intersect),
    },
    OperationDef {
        name: "exclude",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: against_other(),
        analyze: None,
        evaluate: Some(eval_exclude),
    },
];

/// Empty stays empty, one element is returned, more is an error.
fn eval_single(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    match invocation.input.len() {
        0 | 1 => Ok(invocation.input.share()),
        found => Err(EvaluationError::SingletonRequired {
            found,
            range: invocation.span,
        }),
    }
}

fn eval_first(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match invocation.input.first() {
        Some(value) => Collection::singleton(value.clone()),
        None => Collection::empty(),
    })
}

fn eval_last(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match invocation.input.last() {
        Some(value) => Collection::singleton(value.clone()),
        None => Collection::empty(),
    })
}

fn eval_tail(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let items: Vec<Value> = invocation.input.iter().skip(1).cloned().collect();
    Ok(Collection::from_vec(items))
}

fn eval_skip(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some(num) = singleton_integer(invocation, 0)? else {
        return Ok(Collection::empty());
    };
    if num <= 0 {
        return Ok(invocation.input.share());
    }
    let items: Vec<Value> = invocation
        .input
        .iter()
        .skip(num as usize)
        .cloned()
        .collect();
    Ok(Collection::from_vec(items))
}

fn eval_take(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some(num) = singleton_integer(invocation, 0)? else {
        return Ok(Collection::empty());
    };
    if num <= 0 {
        return Ok(Collection::empty());
    }
    let items: Vec<Value> = invocation
        .input
        .iter()
        .take(num as usize)
        .cloned()
        .collect();
    Ok(Collection::from_vec(items))
}

/// Items present in both sides, deduplicated, in input order.
fn eval_intersect(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let other = invocation.value_arg(0).expect("required argument");
    let mut items: Vec<Value> = Vec::new();
    for item in invocation.input.iter() {
        if other.contains_equivalent(item) && !items.iter().any(|seen| seen.equivalent(item)) {
            items.push(item.clone());
        }
    }
    Ok(Collection::from_vec(items))
}

/// Items not present in the other side; order and duplicates preserved.
fn eval_exclude(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let other = invocation.value_arg(0).expect("required argument");
    let items: Vec<Value> = invocation
        .input
        .iter()
        .filter(|item| !other.contains_equivalent(item))
        .cloned()
        .collect();
    Ok(Collection::from_vec(items))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::error::EvaluationError;
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    #[test]
    fn positional_subsets() {
        assert_eq!(run("(1 | 2 | 3).first()").as_slice(), &[Value::Integer(1)]);
        assert_eq!(run("(1 | 2 | 3).last()").as_slice(), &[Value::Integer(3)]);
        assert_eq!(
            run("(1 | 2 | 3).tail()").as_slice(),
            &[Value::Integer(2), Value::Integer(3)]
        );
        assert_eq!(
            run("(1 | 2 | 3).skip(1).take(1)").as_slice(),
            &[Value::Integer(2)]
        );
        assert!(run("{}.first()").is_empty());
    }

    #[test]
    fn skip_and_take_edge_cases() {
        assert_eq!(run("(1 | 2).skip(0).count()").as_slice(), &[Value::Integer(2)]);
        assert_eq!(run("(1 | 2).skip(-1).count()").as_slice(), &[Value::Integer(2)]);
        assert!(run("(1 | 2).take(0)").is_empty());
        assert_eq!(run("(1 | 2).take(9).count()").as_slice(), &[Value::Integer(2)]);
    }

    #[test]
    fn single_errors_on_many() {
        assert_eq!(run("(5).single()").as_slice(), &[Value::Integer(5)]);
        assert!(run("{}.single()").is_empty());
        let ast = parse("(1 | 2).single()").unwrap();
        let error = evaluate(&ast, Collection::empty()).unwrap_err();
        assert!(matches!(
            error,
            EvaluationError::SingletonRequired { found: 2, .. }
        ));
    }

    #[test]
    fn intersect_and_exclude() {
        assert_eq!(
            run("(1 | 2 | 3).intersect(2 | 3 | 4)").as_slice(),
            &[Value::Integer(2), Value::Integer(3)]
        );
        assert_eq!(
            run("(1 | 2 | 3).exclude(2)").as_slice(),
            &[Value::Integer(1), Value::Integer(3)]
        );
        assert!(run("(1 | 2).intersect({})").is_empty());
    }

    #[test]
    fn indexer_returns_single_items() {
        assert_eq!(run("(1 | 2 | 3)[1]").as_slice(), &[Value::Integer(2)]);
        assert!(run("(1 | 2 | 3)[9]").is_empty());
        assert!(run("(1 | 2 | 3)[-1]").is_empty());
        assert!(run("(1 | 2)[{}]").is_empty());
    }
}
