//! Tree navigation: `children` and `descendants`

use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::value::{Collection, Value};
use crate::registry::signature::{OutputCardinality, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};

const fn tree_signature() -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: &[],
        output: ReturnType::Any,
        cardinality: OutputCardinality::Collection,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "children",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: tree_signature(),
        analyze: None,
        evaluate: Some(eval_children),
    },
    OperationDef {
        name: "descendants",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: tree_signature(),
        analyze: None,
        evaluate: Some(eval_descendants),
    },
];

fn children_of(input: &Collection) -> Vec<Value> {
    let mut items = Vec::new();
    for item in input.iter() {
        items.extend(item.children().into_vec());
    }
    items
}

fn eval_children(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(Collection::from_vec(children_of(&invocation.input)))
}

/// Breadth-first transitive closure of `children`, excluding the input
/// itself.
fn eval_descendants(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let mut results: Vec<Value> = Vec::new();
    let mut frontier = children_of(&invocation.input);
    while !frontier.is_empty() {
        results.extend(frontier.iter().cloned());
        frontier = children_of(&Collection::from_vec(frontier));
    }
    Ok(Collection::from_vec(results))
}
