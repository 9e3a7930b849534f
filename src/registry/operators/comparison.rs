//! Comparison and equality operators
//!
//! `<`/`<=`/`>`/`>=` require comparable singleton operands and yield empty
//! on incomparable kinds or undecidable precision. `=`/`!=` compare whole
//! collections element-wise in order and propagate empty; `~`/`!~` are
//! total, order-insensitive, and treat two empty collections as
//! equivalent.

use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::value::Collection;
use crate::registry::helpers::{boolean, singleton};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence,
};
use std::cmp::Ordering;

const OPERANDS: &[Parameter] = &[
    Parameter::collection("left"),
    Parameter::collection("right"),
];

const fn comparison_signature(propagates_empty: bool) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: OPERANDS,
        output: ReturnType::Boolean,
        cardinality: OutputCardinality::Singleton,
        propagates_empty,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "=",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("=", precedence::EQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_equal),
    },
    OperationDef {
        name: "!=",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("!=", precedence::EQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_not_equal),
    },
    OperationDef {
        name: "~",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("~", precedence::EQUALITY),
        signature: comparison_signature(false),
        analyze: None,
        evaluate: Some(eval_equivalent),
    },
    OperationDef {
        name: "!~",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("!~", precedence::EQUALITY),
        signature: comparison_signature(false),
        analyze: None,
        evaluate: Some(eval_not_equivalent),
    },
    OperationDef {
        name: "<",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("<", precedence::INEQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_less),
    },
    OperationDef {
        name: "<=",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("<=", precedence::INEQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_less_or_equal),
    },
    OperationDef {
        name: ">",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix(">", precedence::INEQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_greater),
    },
    OperationDef {
        name: ">=",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix(">=", precedence::INEQUALITY),
        signature: comparison_signature(true),
        analyze: None,
        evaluate: Some(eval_greater_or_equal),
    },
];

fn eval_equal(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    Ok(match left.equals(right) {
        Some(result) => boolean(result),
        None => Collection::empty(),
    })
}

fn eval_not_equal(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    Ok(match left.equals(right) {
        Some(result) => boolean(!result),
        None => Collection::empty(),
    })
}

fn eval_equivalent(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    Ok(boolean(left.equivalent(right)))
}

fn eval_not_equivalent(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    Ok(boolean(!left.equivalent(right)))
}

fn compare(
    invocation: &Invocation<'_>,
    accept: fn(Ordering) -> bool,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    let (Some(left), Some(right)) = (
        singleton(left, invocation.span)?,
        singleton(right, invocation.span)?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(match left.compare(right) {
        Some(ordering) => boolean(accept(ordering)),
        None => Collection::empty(),
    })
}

fn eval_less(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    compare(invocation, Ordering::is_lt)
}

fn eval_less_or_equal(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    compare(invocation, Ordering::is_le)
}

fn eval_greater(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    compare(invocation, Ordering::is_gt)
}

fn eval_greater_or_equal(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    compare(invocation, Ordering::is_ge)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    fn truth(source: &str) -> Option<bool> {
        match run(source).as_slice() {
            [] => None,
            [Value::Boolean(b)] => Some(*b),
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn equality_of_singletons() {
        assert_eq!(truth("1 = 1"), Some(true));
        assert_eq!(truth("1 = 2"), Some(false));
        assert_eq!(truth("1 = 1.0"), Some(true));
        assert_eq!(truth("'a' = 'A'"), Some(false));
        assert_eq!(truth("1 != 2"), Some(true));
    }

    #[test]
    fn equality_with_empty_is_empty() {
        assert_eq!(truth("{} = {}"), None);
        assert_eq!(truth("1 = {}"), None);
        assert_eq!(truth("{} != 1"), None);
    }

    #[test]
    fn collection_equality_is_ordered() {
        assert_eq!(truth("(1 | 2) = (1 | 2)"), Some(true));
        assert_eq!(truth("(1 | 2) = (2 | 1)"), Some(false));
    }

    #[test]
    fn equivalence_is_total_and_case_insensitive() {
        assert_eq!(truth("{} ~ {}"), Some(true));
        assert_eq!(truth("'abc' ~ 'ABC'"), Some(true));
        assert_eq!(truth("5 ~ 5.0"), Some(true));
        assert_eq!(truth("1 !~ 2"), Some(true));
        assert_eq!(truth("{} !~ {}"), Some(false));
    }

    #[test]
    fn ordering_comparisons() {
        assert_eq!(truth("3 < 4"), Some(true));
        assert_eq!(truth("4 <= 4"), Some(true));
        assert_eq!(truth("'abc' > 'abb'"), Some(true));
        assert_eq!(truth("3 'mg' < 4 'mg'"), Some(true));
        assert_eq!(truth("@2023-01-01 < @2024-01-01"), Some(true));
    }

    #[test]
    fn incomparable_operands_yield_empty() {
        assert_eq!(truth("1 < 'a'"), None);
        assert_eq!(truth("3 'mg' < 4 'kg'"), None);
        assert_eq!(truth("@2023 < @2023-05-02"), None);
        assert_eq!(truth("1 < {}"), None);
    }

    #[test]
    fn timezone_aware_datetime_comparison() {
        assert_eq!(
            truth("@2023-01-01T14:30+01:00 = @2023-01-01T13:30Z"),
            Some(true)
        );
    }
}
