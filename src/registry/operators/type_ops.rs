//! Type operations: infix `is`/`as` plus their method forms and `ofType`
//! lives in the filtering family
//!
//! `is` tests every element of the left side against the named type;
//! `as` filters, retaining only matching elements. Model types are
//! checked through the model provider; system types directly.

use crate::diagnostics::Diagnostic;
use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::types::{AnalysisType, TypeAnnotation};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::boolean;
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    AnalyzeContext, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence,
};

const TYPE_TEST_PARAMS: &[Parameter] = &[
    Parameter::collection("value"),
    Parameter::type_specifier("type"),
];

const TYPE_METHOD_PARAMS: &[Parameter] = &[Parameter::type_specifier("type")];

const fn type_test_signature(output: ReturnType, cardinality: OutputCardinality) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: TYPE_TEST_PARAMS,
        output,
        cardinality,
        propagates_empty: true,
        deterministic: true,
    }
}

const fn type_method_signature(output: ReturnType, cardinality: OutputCardinality) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: TYPE_METHOD_PARAMS,
        output,
        cardinality,
        propagates_empty: true,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "is",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("is", precedence::TYPE_TEST),
        signature: type_test_signature(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_is_operator),
    },
    OperationDef {
        name: "as",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("as", precedence::TYPE_TEST),
        signature: type_test_signature(ReturnType::Any, OutputCardinality::PreserveInput),
        analyze: Some(analyze_cast),
        evaluate: Some(eval_as_operator),
    },
    // Method forms: `value.is(Type)`, `value.as(Type)`
    OperationDef {
        name: "is",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: type_method_signature(ReturnType::Boolean, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_is_function),
    },
    OperationDef {
        name: "as",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: type_method_signature(ReturnType::Any, OutputCardinality::PreserveInput),
        analyze: Some(analyze_cast),
        evaluate: Some(eval_as_function),
    },
];

/// The cast's output type is the named type; the annotation of the type
/// operand already carries it.
fn analyze_cast(ctx: &AnalyzeContext<'_>, _diagnostics: &mut Vec<Diagnostic>) -> TypeAnnotation {
    let named = ctx
        .operands
        .last()
        .map(|annotation| annotation.ty.clone())
        .unwrap_or(AnalysisType::Any);
    // Operator form carries the value as the first operand; the method
    // form casts the input itself.
    let singleton = match ctx.operands {
        [value, _] => value.singleton,
        _ => ctx.input.singleton,
    };
    TypeAnnotation {
        ty: named,
        singleton,
    }
}

fn all_match(scope: &EvalScope<'_>, values: &Collection, type_name: &str) -> bool {
    values
        .iter()
        .all(|value| value.matches_type(type_name, scope.provider()))
}

fn filter_matching(scope: &EvalScope<'_>, values: &Collection, type_name: &str) -> Collection {
    values
        .iter()
        .filter(|value| value.matches_type(type_name, scope.provider()))
        .cloned()
        .collect()
}

fn eval_is_operator(
    scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let values = invocation.value_arg(0).expect("binary operand");
    let type_name = invocation.type_arg(1).expect("type operand");
    Ok(boolean(all_match(scope, values, type_name)))
}

fn eval_as_operator(
    scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let values = invocation.value_arg(0).expect("binary operand");
    let type_name = invocation.type_arg(1).expect("type operand");
    Ok(filter_matching(scope, values, type_name))
}

fn eval_is_function(
    scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let type_name = invocation.type_arg(0).expect("type argument");
    Ok(boolean(all_match(scope, &invocation.input, type_name)))
}

fn eval_as_function(
    scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let type_name = invocation.type_arg(0).expect("type argument");
    Ok(filter_matching(scope, &invocation.input, type_name))
}

/// Shared by `ofType` in the filtering family.
pub(crate) fn retain_of_type(
    scope: &EvalScope<'_>,
    values: &Collection,
    type_name: &str,
) -> Collection {
    filter_matching(scope, values, type_name)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;
    use serde_json::json;

    fn run_with(source: &str, input: Collection) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, input).unwrap().value
    }

    fn run(source: &str) -> Collection {
        run_with(source, Collection::empty())
    }

    #[test]
    fn is_checks_system_types() {
        assert_eq!(run("5 is Integer").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run("5 is Decimal").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(run("'a' is String").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(
            run("true is System.Boolean").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(
            run("@2023-01-01 is Date").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn is_on_empty_is_empty() {
        assert!(run("{} is Integer").is_empty());
    }

    #[test]
    fn is_requires_every_element_to_match() {
        assert_eq!(
            run("(1 | 2) is Integer").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(
            run("(1 | 'a') is Integer").as_slice(),
            &[Value::Boolean(false)]
        );
    }

    #[test]
    fn as_filters_by_type() {
        assert_eq!(run("(1 | 'a' | 2) as Integer").len(), 2);
        assert!(run("'a' as Integer").is_empty());
        assert_eq!(run("5 as Integer").as_slice(), &[Value::Integer(5)]);
    }

    #[test]
    fn method_forms_work_after_a_dot() {
        assert_eq!(run("5.is(Integer)").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run("'a'.as(Integer)").len(), 0);
    }

    #[test]
    fn resource_types_match_by_resource_type_field() {
        let input = Collection::from_json(&json!({"resourceType": "Patient", "id": "p1"}));
        assert_eq!(
            run_with("$this is Patient", input.share()).as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(
            run_with("$this is Observation", input).as_slice(),
            &[Value::Boolean(false)]
        );
    }
}
