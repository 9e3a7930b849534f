//! Filtering and projection: `where`, `select`, `repeat`, `ofType`
//!
//! Iterator functions bind `$this`/`$index` per item and process items in
//! input order. `repeat` applies its projection to a fixed point,
//! deduplicating by structural equality so finite inputs terminate.

use crate::diagnostics::Diagnostic;
use crate::evaluator::error::EvalResult;
use crate::evaluator::{EvalScope, truthiness};
use crate::model::types::TypeAnnotation;
use crate::model::value::{Collection, Value};
use crate::registry::operators::type_ops::retain_of_type;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    AnalyzeContext, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo,
};

const PROJECTION_PARAM: &[Parameter] = &[Parameter::expression("projection")];

const fn iterator_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: PROJECTION_PARAM,
        output,
        cardinality: OutputCardinality::Collection,
        propagates_empty: false,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "where",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: iterator_signature(ReturnType::PreserveElement),
        analyze: None,
        evaluate: Some(eval_where),
    },
    OperationDef {
        name: "select",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: iterator_signature(ReturnType::Any),
        analyze: Some(analyze_projection),
        evaluate: Some(eval_select),
    },
    OperationDef {
        name: "repeat",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: iterator_signature(ReturnType::Any),
        analyze: Some(analyze_projection),
        evaluate: Some(eval_repeat),
    },
    OperationDef {
        name: "ofType",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::type_specifier("type")],
            output: ReturnType::Any,
            cardinality: OutputCardinality::Collection,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: Some(analyze_of_type),
        evaluate: Some(eval_of_type),
    },
];

/// The projection's analyzed type is the element type of the result.
fn analyze_projection(
    ctx: &AnalyzeContext<'_>,
    _diagnostics: &mut Vec<Diagnostic>,
) -> TypeAnnotation {
    let element = ctx
        .operands
        .first()
        .map(|annotation| annotation.ty.clone())
        .unwrap_or(crate::model::types::AnalysisType::Any);
    TypeAnnotation::collection(element)
}

/// `ofType` narrows to the named type.
fn analyze_of_type(ctx: &AnalyzeContext<'_>, _diagnostics: &mut Vec<Diagnostic>) -> TypeAnnotation {
    let named = ctx
        .operands
        .first()
        .map(|annotation| annotation.ty.clone())
        .unwrap_or(crate::model::types::AnalysisType::Any);
    TypeAnnotation::collection(named)
}

fn eval_where(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let criteria = invocation.expression_arg(0).expect("required argument");
    let mut retained = Vec::new();
    for (index, item) in invocation.input.iter().enumerate() {
        let outcome = scope.eval_for_item(criteria, item, index)?;
        if truthiness(&outcome, criteria.span)? {
            retained.push(item.clone());
        }
    }
    Ok(Collection::from_vec(retained))
}

fn eval_select(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let projection = invocation.expression_arg(0).expect("required argument");
    let mut projected = Vec::new();
    for (index, item) in invocation.input.iter().enumerate() {
        let outcome = scope.eval_for_item(projection, item, index)?;
        projected.extend(outcome.into_vec());
    }
    Ok(Collection::from_vec(projected))
}

/// Applies the projection to new items until no new items appear. The
/// output excludes the original input, like a transitive closure.
fn eval_repeat(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let projection = invocation.expression_arg(0).expect("required argument");
    let mut results: Vec<Value> = Vec::new();
    let mut frontier: Vec<Value> = invocation.input.iter().cloned().collect();

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (index, item) in frontier.iter().enumerate() {
            let outcome = scope.eval_for_item(projection, item, index)?;
            for produced in outcome.into_vec() {
                let seen = results.iter().any(|r| r.equivalent(&produced))
                    || next.iter().any(|n: &Value| n.equivalent(&produced));
                if !seen {
                    next.push(produced);
                }
            }
        }
        results.extend(next.iter().cloned());
        frontier = next;
    }

    Ok(Collection::from_vec(results))
}

fn eval_of_type(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let type_name = invocation.type_arg(0).expect("type argument");
    Ok(retain_of_type(scope, &invocation.input, type_name))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;
    use serde_json::json;

    fn run(source: &str) -> Collection {
        run_with(source, Collection::empty())
    }

    fn run_with(source: &str, input: Collection) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, input).unwrap().value
    }

    #[test]
    fn where_retains_matching_items() {
        assert_eq!(
            run("(1 | 2 | 3 | 4).where($this > 2).count()").as_slice(),
            &[Value::Integer(2)]
        );
        assert!(run("(1 | 2).where(false)").is_empty());
    }

    #[test]
    fn where_true_is_identity() {
        assert_eq!(
            run("(1 | 2 | 3).where(true) ~ (1 | 2 | 3)").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn select_projects_and_flattens() {
        assert_eq!(
            run("(1 | 2).select($this + 10)").as_slice(),
            &[Value::Integer(11), Value::Integer(12)]
        );
        assert_eq!(
            run("(1 | 2).select($this) ~ (1 | 2)").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn select_exposes_index() {
        assert_eq!(
            run("('a' | 'b' | 'c').select($index)").as_slice(),
            &[Value::Integer(0), Value::Integer(1), Value::Integer(2)]
        );
    }

    #[test]
    fn where_over_nested_objects() {
        let input = Collection::from_json(&json!({
            "name": [
                {"use": "official", "given": ["Peter", "James"]},
                {"use": "nickname", "given": ["Jim"]}
            ]
        }));
        let result = run_with("name.where(use = 'official').given", input);
        assert_eq!(
            result.as_slice(),
            &[
                Value::String("Peter".into()),
                Value::String("James".into())
            ]
        );
    }

    #[test]
    fn repeat_reaches_a_fixed_point() {
        let input = Collection::from_json(&json!({
            "item": [
                {"name": "a", "item": [{"name": "b", "item": [{"name": "c"}]}]},
                {"name": "d"}
            ]
        }));
        let result = run_with("repeat(item).select(name).count()", input);
        assert_eq!(result.as_slice(), &[Value::Integer(4)]);
    }

    #[test]
    fn of_type_filters_by_type() {
        assert_eq!(
            run("(1 | 'a' | 2.5 | true).ofType(Integer)").as_slice(),
            &[Value::Integer(1)]
        );
        assert_eq!(run("(1 | 'a').ofType(String)").len(), 1);
    }
}
