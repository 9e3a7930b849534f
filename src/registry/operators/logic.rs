//! Three-valued logic operators
//!
//! `and`, `or`, `xor`, `implies` take deferred operands so short-circuit
//! evaluation stays observationally identical to strict left-to-right
//! three-valued logic. The empty collection is the unknown value. Prefix
//! `not` lives here too, with its explicit non-propagating table.

use crate::ast::Expression;
use crate::evaluator::EvalScope;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::boolean;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence,
};

const LOGIC_OPERANDS: &[Parameter] =
    &[Parameter::expression("left"), Parameter::expression("right")];

const fn logic_signature() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: LOGIC_OPERANDS,
        output: ReturnType::Boolean,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "and",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("and", precedence::AND),
        signature: logic_signature(),
        analyze: None,
        evaluate: Some(eval_and),
    },
    OperationDef {
        name: "or",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("or", precedence::OR),
        signature: logic_signature(),
        analyze: None,
        evaluate: Some(eval_or),
    },
    OperationDef {
        name: "xor",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("xor", precedence::OR),
        signature: logic_signature(),
        analyze: None,
        evaluate: Some(eval_xor),
    },
    OperationDef {
        name: "implies",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix_right("implies", precedence::IMPLIES),
        signature: logic_signature(),
        analyze: None,
        evaluate: Some(eval_implies),
    },
    OperationDef {
        name: "unary-not",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::prefix("not"),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::collection("operand")],
            output: ReturnType::Boolean,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_not_prefix),
    },
];

/// The three truth values; empty collections are `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

fn truth_of(
    scope: &EvalScope<'_>,
    expression: &Expression,
    input: &Collection,
) -> EvalResult<Truth> {
    let value = scope.eval(expression, input)?;
    match value.as_slice() {
        [] => Ok(Truth::Unknown),
        [Value::Boolean(true)] => Ok(Truth::True),
        [Value::Boolean(false)] => Ok(Truth::False),
        [other] => Err(EvaluationError::InvalidCriterion {
            message: format!("found a single {} value", other.type_name()),
            range: expression.span,
        }),
        items => Err(EvaluationError::SingletonRequired {
            found: items.len(),
            range: expression.span,
        }),
    }
}

fn from_truth(truth: Truth) -> Collection {
    match truth {
        Truth::True => boolean(true),
        Truth::False => boolean(false),
        Truth::Unknown => Collection::empty(),
    }
}

/// `false` dominates; unknown only survives when no operand is false.
fn eval_and(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left_expr = invocation.expression_arg(0).expect("logic operand");
    let left = truth_of(scope, left_expr, &invocation.input)?;
    if left == Truth::False {
        return Ok(boolean(false));
    }
    let right_expr = invocation.expression_arg(1).expect("logic operand");
    let right = truth_of(scope, right_expr, &invocation.input)?;
    Ok(from_truth(match (left, right) {
        (_, Truth::False) => Truth::False,
        (Truth::True, Truth::True) => Truth::True,
        _ => Truth::Unknown,
    }))
}

/// `true` dominates symmetrically.
fn eval_or(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left_expr = invocation.expression_arg(0).expect("logic operand");
    let left = truth_of(scope, left_expr, &invocation.input)?;
    if left == Truth::True {
        return Ok(boolean(true));
    }
    let right_expr = invocation.expression_arg(1).expect("logic operand");
    let right = truth_of(scope, right_expr, &invocation.input)?;
    Ok(from_truth(match (left, right) {
        (_, Truth::True) => Truth::True,
        (Truth::False, Truth::False) => Truth::False,
        _ => Truth::Unknown,
    }))
}

/// Any unknown operand makes the result unknown.
fn eval_xor(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left_expr = invocation.expression_arg(0).expect("logic operand");
    let right_expr = invocation.expression_arg(1).expect("logic operand");
    let left = truth_of(scope, left_expr, &invocation.input)?;
    let right = truth_of(scope, right_expr, &invocation.input)?;
    Ok(from_truth(match (left, right) {
        (Truth::Unknown, _) | (_, Truth::Unknown) => Truth::Unknown,
        (a, b) => {
            if (a == Truth::True) != (b == Truth::True) {
                Truth::True
            } else {
                Truth::False
            }
        }
    }))
}

/// `false implies X` is true; `{} implies true` is true; the remaining
/// unknown-involving cases stay unknown.
fn eval_implies(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left_expr = invocation.expression_arg(0).expect("logic operand");
    let left = truth_of(scope, left_expr, &invocation.input)?;
    if left == Truth::False {
        return Ok(boolean(true));
    }
    let right_expr = invocation.expression_arg(1).expect("logic operand");
    let right = truth_of(scope, right_expr, &invocation.input)?;
    Ok(from_truth(match (left, right) {
        (_, Truth::True) => Truth::True,
        (Truth::True, Truth::False) => Truth::False,
        _ => Truth::Unknown,
    }))
}

/// Shared by the prefix operator and the `not()` function: negate a
/// boolean, empty becomes true, a non-boolean singleton becomes false,
/// and a multi-element operand becomes empty.
pub(crate) fn negate_collection(operand: &Collection) -> Collection {
    match operand.as_slice() {
        [] => boolean(true),
        [Value::Boolean(b)] => boolean(!*b),
        [_] => boolean(false),
        _ => Collection::empty(),
    }
}

fn eval_not_prefix(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let operand = invocation.value_arg(0).expect("unary operand");
    Ok(negate_collection(operand))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;

    fn truth(source: &str) -> Option<bool> {
        let ast = parse(source).unwrap();
        let value = evaluate(&ast, Collection::empty()).unwrap().value;
        match value.as_slice() {
            [] => None,
            [Value::Boolean(b)] => Some(*b),
            other => panic!("expected boolean, got {other:?}"),
        }
    }

    #[test]
    fn and_false_dominates() {
        assert_eq!(truth("false and {}"), Some(false));
        assert_eq!(truth("{} and false"), Some(false));
        assert_eq!(truth("true and {}"), None);
        assert_eq!(truth("{} and {}"), None);
        assert_eq!(truth("true and true"), Some(true));
        assert_eq!(truth("true and false"), Some(false));
    }

    #[test]
    fn or_true_dominates() {
        assert_eq!(truth("true or {}"), Some(true));
        assert_eq!(truth("{} or true"), Some(true));
        assert_eq!(truth("false or {}"), None);
        assert_eq!(truth("{} or {}"), None);
        assert_eq!(truth("false or false"), Some(false));
    }

    #[test]
    fn xor_is_strict_about_unknown() {
        assert_eq!(truth("true xor true"), Some(false));
        assert_eq!(truth("true xor false"), Some(true));
        assert_eq!(truth("true xor {}"), None);
        assert_eq!(truth("{} xor false"), None);
    }

    #[test]
    fn implies_truth_table() {
        assert_eq!(truth("false implies false"), Some(true));
        assert_eq!(truth("false implies {}"), Some(true));
        assert_eq!(truth("true implies true"), Some(true));
        assert_eq!(truth("true implies false"), Some(false));
        assert_eq!(truth("true implies {}"), None);
        assert_eq!(truth("{} implies true"), Some(true));
        assert_eq!(truth("{} implies false"), None);
        assert_eq!(truth("{} implies {}"), None);
    }

    #[test]
    fn implies_chains_right_associatively() {
        assert_eq!(truth("false implies false implies false"), Some(true));
    }

    #[test]
    fn prefix_not_table() {
        assert_eq!(truth("not true"), Some(false));
        assert_eq!(truth("not false"), Some(true));
        assert_eq!(truth("not {}"), Some(true));
        assert_eq!(truth("not 5"), Some(false));
        assert_eq!(truth("not (1 | 2)"), None);
    }

    #[test]
    fn short_circuit_skips_errors_on_the_right() {
        // A multi-element criterion errors, but the left side decides first
        assert_eq!(truth("false and (1 | 2)"), Some(false));
        assert_eq!(truth("true or (1 | 2)"), Some(true));
    }
}
