//! End-to-end evaluation scenarios against JSON input data

use fhirpath_engine::{Collection, FhirPathEngine, Value, evaluate, parse};
use pretty_assertions::assert_eq;
use serde_json::json;

fn patient() -> serde_json::Value {
    json!({
        "resourceType": "Patient",
        "name": [
            {"use": "official", "given": ["Peter", "James"], "family": "Chalmers"},
            {"use": "nickname", "given": ["Jim"]}
        ],
        "birthDate": "1974-12-25",
        "active": true
    })
}

fn run(expression: &str, input: &serde_json::Value) -> Collection {
    FhirPathEngine::new()
        .evaluate(expression, input)
        .unwrap_or_else(|e| panic!("{expression:?} failed: {e}"))
}

fn strings(collection: &Collection) -> Vec<String> {
    collection
        .iter()
        .map(|value| match value {
            Value::String(s) => s.clone(),
            other => panic!("expected string, got {other:?}"),
        })
        .collect()
}

fn booleans(collection: &Collection) -> Vec<bool> {
    collection
        .iter()
        .map(|value| match value {
            Value::Boolean(b) => *b,
            other => panic!("expected boolean, got {other:?}"),
        })
        .collect()
}

#[test]
fn filtered_navigation_returns_matching_given_names() {
    let result = run("name.where(use = 'official').given", &patient());
    assert_eq!(strings(&result), vec!["Peter", "James"]);
}

#[test]
fn defined_variables_are_visible_down_the_chain() {
    let result = run(
        "defineVariable('n1', name.first()).select(%n1.given)",
        &patient(),
    );
    assert_eq!(strings(&result), vec!["Peter", "James"]);
}

#[test]
fn variable_scopes_in_sibling_arguments_are_independent() {
    let result = run(
        "'aaa'.replace(defineVariable('p','aaa').select(%p), defineVariable('p','bbb').select(%p))",
        &json!({}),
    );
    assert_eq!(strings(&result), vec!["bbb"]);
}

#[test]
fn variable_redefinition_silently_yields_empty() {
    let result = run(
        "defineVariable('v1','a').defineVariable('v1','b').select(%v1)",
        &patient(),
    );
    assert!(result.is_empty());
    assert!(run("defineVariable('context','x')", &patient()).is_empty());
}

#[test]
fn defined_variables_do_not_leak_into_union_branches() {
    // The right branch of | must not see the left branch's binding, so
    // the whole expression errors on the unknown variable.
    let ast = parse("(defineVariable('q', 1).select(%q)) | %q").unwrap();
    let outcome = evaluate(&ast, Collection::from_json(&json!(1)));
    assert!(outcome.is_err());
}

#[test]
fn empty_equality_is_unknown_and_collections_compare_in_order() {
    assert!(run("{} = {}", &json!({})).is_empty());
    assert_eq!(booleans(&run("(1 | 2) = (1 | 2)", &json!({}))), vec![true]);
    assert_eq!(booleans(&run("(1 | 2) = (2 | 1)", &json!({}))), vec![false]);
}

#[test]
fn comments_are_trivia() {
    assert_eq!(
        booleans(&run("2 + 2 /* comment */ = 4", &json!({}))),
        vec![true]
    );
    assert_eq!(booleans(&run("2 + 2 = 4 // done", &json!({}))), vec![true]);
}

#[test]
fn union_deduplicates_by_equivalence() {
    assert_eq!(
        booleans(&run("(1 | 2 | 3).count() = 3", &json!({}))),
        vec![true]
    );
    assert_eq!(booleans(&run("(1 | 1).count() = 1", &json!({}))), vec![true]);
}

#[test]
fn dot_navigation_distributes_over_union() {
    let input = patient();
    let left = run("(name.first() | name.last()).given", &input);
    let right = run("name.first().given | name.last().given", &input);
    assert_eq!(
        booleans(&run(
            "(name.first() | name.last()).given ~ (name.first().given | name.last().given)",
            &input
        )),
        vec![true]
    );
    assert_eq!(left.len(), right.len());
}

#[test]
fn singleton_equality_is_reflexive() {
    for expression in ["5 = 5", "'x' = 'x'", "true = true", "@2023-05-02 = @2023-05-02"] {
        assert_eq!(booleans(&run(expression, &json!({}))), vec![true], "{expression}");
    }
    assert!(run("{} = 5", &json!({})).is_empty());
    assert!(run("5 = {}", &json!({})).is_empty());
}

#[test]
fn double_negation_is_identity() {
    assert_eq!(booleans(&run("true.not().not()", &json!({}))), vec![true]);
    assert_eq!(booleans(&run("false.not().not()", &json!({}))), vec![false]);
    assert_eq!(booleans(&run("{}.not()", &json!({}))), vec![true]);
}

#[test]
fn where_never_grows_the_collection() {
    let input = patient();
    assert_eq!(
        booleans(&run(
            "name.where(use = 'official').count() <= name.count()",
            &input
        )),
        vec![true]
    );
    assert_eq!(
        booleans(&run("name.where(true) ~ name", &input)),
        vec![true]
    );
    assert_eq!(
        booleans(&run("name.select($this) ~ name", &input)),
        vec![true]
    );
}

#[test]
fn empty_operands_propagate_through_scalar_operators() {
    for expression in [
        "1 + {}",
        "{} - 1",
        "{} * 2",
        "{} / 2",
        "1 div {}",
        "{} mod 2",
        "1 < {}",
        "{} >= 1",
        "{} = 1",
        "'a'.indexOf({})",
        "{}.substring(0)",
        "{} is Integer",
    ] {
        assert!(run(expression, &json!({})).is_empty(), "{expression}");
    }
}

#[test]
fn iterator_variables_expose_position_and_item() {
    let result = run("name.given.select($this.length() + $index)", &patient());
    // Peter(5)+0, James(5)+1, Jim(3)+2
    assert_eq!(
        result.as_slice(),
        &[Value::Integer(5), Value::Integer(6), Value::Integer(5)]
    );
}

#[test]
fn aggregate_computes_folds() {
    let result = run(
        "name.given.aggregate($total + $this.length(), 0)",
        &patient(),
    );
    assert_eq!(result.as_slice(), &[Value::Integer(13)]);
}

#[test]
fn indexing_is_zero_based() {
    assert_eq!(
        strings(&run("name[1].given", &patient())),
        vec!["Jim".to_string()]
    );
    assert!(run("name[5]", &patient()).is_empty());
}

#[test]
fn environment_context_variable_is_the_original_input() {
    assert_eq!(
        booleans(&run("name.first().select(%context.active)", &patient())),
        vec![true]
    );
}

#[test]
fn resource_type_filters_at_the_head_of_a_path() {
    assert_eq!(
        strings(&run("Patient.name.first().family", &patient())),
        vec!["Chalmers".to_string()]
    );
    assert!(run("Observation.name", &patient()).is_empty());
}

#[test]
fn reparsing_yields_identical_ast_and_ranges() {
    let source = "name.where(use = 'official').given[0]";
    assert_eq!(parse(source).unwrap(), parse(source).unwrap());
}

#[test]
fn string_values_of_fields_are_plain_strings() {
    assert_eq!(
        strings(&run("birthDate", &patient())),
        vec!["1974-12-25".to_string()]
    );
    assert_eq!(
        booleans(&run("birthDate.toDate() < today()", &patient())),
        vec![true]
    );
}

#[test]
fn deep_chains_thread_context_left_to_right() {
    let result = run(
        "defineVariable('a', 1).defineVariable('b', 2).select(%a + %b)",
        &patient(),
    );
    assert_eq!(result.as_slice(), &[Value::Integer(3)]);
}
