//! Collection operators: `|`, `in`, `contains`
//!
//! The union operator concatenates preserving order, then deduplicates by
//! equivalence. Membership yields `false` (never empty) for an empty
//! operand, and falls back to substring containment when both sides are
//! singleton strings.

use crate::diagnostics::Diagnostic;
use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::types::TypeAnnotation;
use crate::model::value::{Collection, Value};
use crate::registry::helpers::{boolean, singleton};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    AnalyzeContext, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence,
};

const OPERANDS: &[Parameter] = &[
    Parameter::collection("left"),
    Parameter::collection("right"),
];

const fn membership_signature() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: OPERANDS,
        output: ReturnType::Boolean,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "|",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("|", precedence::UNION),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[
                Parameter::collection("left"),
                Parameter::collection("right"),
            ],
            output: ReturnType::Any,
            cardinality: OutputCardinality::Collection,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: Some(analyze_union),
        evaluate: Some(eval_union),
    },
    OperationDef {
        name: "in",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("in", precedence::MEMBERSHIP),
        signature: membership_signature(),
        analyze: None,
        evaluate: Some(eval_in),
    },
    OperationDef {
        name: "contains",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("contains", precedence::MEMBERSHIP),
        signature: membership_signature(),
        analyze: None,
        evaluate: Some(eval_contains),
    },
];

/// The union's element type is only known when both sides agree.
fn analyze_union(ctx: &AnalyzeContext<'_>, _diagnostics: &mut Vec<Diagnostic>) -> TypeAnnotation {
    let left = &ctx.operands[0];
    let right = &ctx.operands[1];
    let ty = if left.ty == right.ty {
        left.ty.clone()
    } else {
        crate::model::types::AnalysisType::Any
    };
    TypeAnnotation::collection(ty)
}

fn eval_union(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    Ok(left.concat(right).distinct())
}

/// Membership test shared by `in` and (mirrored) `contains`.
fn membership(
    item_side: &Collection,
    collection_side: &Collection,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    if item_side.is_empty() || collection_side.is_empty() {
        return Ok(boolean(false));
    }
    let item = singleton(item_side, invocation.span)?.expect("non-empty singleton");
    // Substring containment when both sides are singleton strings
    if let (Value::String(needle), Some(Value::String(haystack))) =
        (item, collection_side.as_singleton())
    {
        return Ok(boolean(haystack.contains(needle.as_str())));
    }
    Ok(boolean(collection_side.contains_equal(item)))
}

fn eval_in(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    membership(left, right, invocation)
}

fn eval_contains(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    membership(right, left, invocation)
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

    #[test]
    fn union_concatenates_in_order() {
        let result = run("1 | 2 | 3");
        let items: Vec<_> = result.iter().cloned().collect();
        assert_eq!(
            items,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn union_deduplicates_by_equivalence() {
        assert_eq!(run("1 | 1").len(), 1);
        assert_eq!(run("1 | 1.0").len(), 1);
        assert_eq!(run("'A' | 'a'").len(), 1);
        assert_eq!(run("{} | {}").len(), 0);
    }

    #[test]
    fn membership_basics() {
        assert_eq!(run("2 in (1 | 2 | 3)").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run("5 in (1 | 2 | 3)").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(
            run("(1 | 2 | 3) contains 2").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn empty_membership_is_false_not_empty() {
        assert_eq!(run("{} in (1 | 2)").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(run("1 in {}").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(run("{} contains 1").as_slice(), &[Value::Boolean(false)]);
    }

    #[test]
    fn singleton_strings_use_substring_containment() {
        assert_eq!(run("'ab' in 'abc'").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(
            run("'abc' contains 'bc'").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(run("'x' in 'abc'").as_slice(), &[Value::Boolean(false)]);
    }
}
