//! Combining functions: `union` (deduplicating) and `combine` (not)

use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::value::Collection;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};

const OTHER_PARAM: &[Parameter] = &[Parameter::collection("other")];

const fn merge_signature() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: OTHER_PARAM,
        output: ReturnType::Any,
        cardinality: OutputCardinality::Collection,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "union",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: merge_signature(),
        analyze: None,
        evaluate: Some(eval_union),
    },
    OperationDef {
        name: "combine",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: merge_signature(),
        analyze: None,
        evaluate: Some(eval_combine),
    },
];

fn eval_union(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let other = invocation.value_arg(0).expect("required argument");
    Ok(invocation.input.concat(other).distinct())
}

fn eval_combine(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let other = invocation.value_arg(0).expect("required argument");
    Ok(invocation.input.concat(other))
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
    fn union_deduplicates_and_combine_does_not() {
        assert_eq!(run("(1 | 2).union(2 | 3).count()").as_slice(), &[Value::Integer(3)]);
        assert_eq!(
            run("(1 | 2).combine(2 | 3).count()").as_slice(),
            &[Value::Integer(4)]
        );
    }

    #[test]
    fn combine_preserves_order() {
        assert_eq!(
            run("(1).combine(2).combine(1)").as_slice(),
            &[Value::Integer(1), Value::Integer(2), Value::Integer(1)]
        );
    }
}
