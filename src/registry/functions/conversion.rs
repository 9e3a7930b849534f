//! Conversion functions: `iif` and the `toX` / `convertsToX` family
//!
//! `iif` is lazy in both branches and mirrors the three-valued criterion
//! rules: a non-boolean or empty criterion selects the otherwise-branch.
//! Conversions return empty when the value has no defined conversion.

use crate::diagnostics::Diagnostic;
use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::quantity::Quantity;
use crate::model::temporal::{CalendarUnit, Date, DateTime, Time};
use crate::model::types::TypeAnnotation;
use crate::model::value::{Collection, Value};
use crate::registry::helpers::{boolean, singleton};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    AnalyzeContext, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const fn conversion_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: true,
        parameters: &[],
        output,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: true,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "iif",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: true,
            parameters: &[
                Parameter::expression("criterion"),
                Parameter::expression("true-result"),
                Parameter::expression("otherwise-result").optional(),
            ],
            output: ReturnType::Any,
            cardinality: OutputCardinality::Collection,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: Some(analyze_iif),
        evaluate: Some(eval_iif),
    },
    OperationDef {
        name: "toBoolean",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Boolean),
        analyze: None,
        evaluate: Some(eval_to_boolean),
    },
    OperationDef {
        name: "toInteger",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Integer),
        analyze: None,
        evaluate: Some(eval_to_integer),
    },
    OperationDef {
        name: "toDecimal",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Decimal),
        analyze: None,
        evaluate: Some(eval_to_decimal),
    },
    OperationDef {
        name: "toString",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::String),
        analyze: None,
        evaluate: Some(eval_to_string),
    },
    OperationDef {
        name: "toQuantity",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Quantity),
        analyze: None,
        evaluate: Some(eval_to_quantity),
    },
    OperationDef {
        name: "toDate",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Date),
        analyze: None,
        evaluate: Some(eval_to_date),
    },
    OperationDef {
        name: "toDateTime",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::DateTime),
        analyze: None,
        evaluate: Some(eval_to_datetime),
    },
    OperationDef {
        name: "toTime",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Time),
        analyze: None,
        evaluate: Some(eval_to_time),
    },
    OperationDef {
        name: "convertsToBoolean",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Boolean),
        analyze: None,
        evaluate: Some(eval_converts_to_boolean),
    },
    OperationDef {
        name: "convertsToInteger",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Boolean),
        analyze: None,
        evaluate: Some(eval_converts_to_integer),
    },
    OperationDef {
        name: "convertsToDecimal",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Boolean),
        analyze: None,
        evaluate: Some(eval_converts_to_decimal),
    },
    OperationDef {
        name: "convertsToString",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: conversion_signature(ReturnType::Boolean),
        analyze: None,
        evaluate: Some(eval_converts_to_string),
    },
];

/// When both branches agree on a type, `iif` has it; otherwise `Any`.
fn analyze_iif(ctx: &AnalyzeContext<'_>, _diagnostics: &mut Vec<Diagnostic>) -> TypeAnnotation {
    match ctx.operands {
        [_, then_branch, else_branch] if then_branch == else_branch => then_branch.clone(),
        [_, then_branch] => TypeAnnotation {
            ty: then_branch.ty.clone(),
            singleton: false,
        },
        _ => TypeAnnotation::any(),
    }
}

fn eval_iif(scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    // A multi-item input has no single focus for the criterion
    if invocation.input.len() > 1 {
        return Ok(Collection::empty());
    }
    let criterion = invocation.expression_arg(0).expect("required argument");
    let frame = crate::evaluator::IteratorFrame {
        this: invocation.input.share(),
        index: None,
        total: None,
    };
    let ctx = scope.ctx().with_iterator(frame);
    let outcome = scope.eval_in(criterion, &invocation.input, &ctx)?;

    let is_true = matches!(outcome.as_singleton(), Some(Value::Boolean(true)));
    if is_true {
        let then_branch = invocation.expression_arg(1).expect("required argument");
        return scope.eval_in(then_branch, &invocation.input, &ctx);
    }
    // Empty, false, non-boolean or multi-element criteria all select the
    // otherwise-branch
    match invocation.expression_arg(2) {
        Some(else_branch) => scope.eval_in(else_branch, &invocation.input, &ctx),
        None => Ok(Collection::empty()),
    }
}

fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(1) => Some(true),
        Value::Integer(0) => Some(false),
        Value::Decimal(d) if *d == Decimal::ONE => Some(true),
        Value::Decimal(d) if d.is_zero() => Some(false),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
            "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        Value::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn to_string_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => None,
        other => Some(other.to_string()),
    }
}

fn to_quantity(value: &Value) -> Option<Quantity> {
    match value {
        Value::Quantity(q) => Some(q.clone()),
        Value::Integer(i) => Some(Quantity::dimensionless(Decimal::from(*i))),
        Value::Decimal(d) => Some(Quantity::dimensionless(*d)),
        Value::Boolean(b) => Some(Quantity::dimensionless(if *b {
            Decimal::ONE
        } else {
            Decimal::ZERO
        })),
        Value::String(s) => parse_quantity_text(s),
        _ => None,
    }
}

/// `"5.5 'mg'"`, `"2 weeks"` or a bare number.
fn parse_quantity_text(text: &str) -> Option<Quantity> {
    let text = text.trim();
    let (number, unit) = match text.split_once(' ') {
        Some((number, unit)) => (number, Some(unit.trim())),
        None => (text, None),
    };
    let value = Decimal::from_str(number).ok()?;
    match unit {
        None => Some(Quantity::dimensionless(value)),
        Some(unit) => {
            let unit = if unit.len() >= 2 && unit.starts_with('\'') && unit.ends_with('\'') {
                &unit[1..unit.len() - 1]
            } else {
                CalendarUnit::parse(unit)?;
                unit
            };
            Some(Quantity::new(value, unit))
        }
    }
}

fn convert(
    invocation: &Invocation<'_>,
    conversion: impl Fn(&Value) -> Option<Value>,
) -> EvalResult<Collection> {
    match singleton(&invocation.input, invocation.span)? {
        Some(value) => Ok(match conversion(value) {
            Some(converted) => Collection::singleton(converted),
            None => Collection::empty(),
        }),
        None => Ok(Collection::empty()),
    }
}

fn eval_to_boolean(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| to_boolean(value).map(Value::Boolean))
}

fn eval_to_integer(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| to_integer(value).map(Value::Integer))
}

fn eval_to_decimal(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| to_decimal(value).map(Value::Decimal))
}

fn eval_to_string(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| {
        to_string_value(value).map(Value::String)
    })
}

fn eval_to_quantity(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| to_quantity(value).map(Value::Quantity))
}

fn eval_to_date(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    convert(invocation, |value| match value {
        Value::Date(d) => Some(Value::Date(*d)),
        Value::DateTime(dt) => Some(Value::Date(dt.date)),
        Value::String(s) => Date::parse(s).map(Value::Date),
        _ => None,
    })
}

fn eval_to_datetime(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    convert(invocation, |value| match value {
        Value::DateTime(dt) => Some(Value::DateTime(*dt)),
        Value::Date(d) => Some(Value::DateTime(DateTime::from_date(*d))),
        Value::String(s) => DateTime::parse(s)
            .or_else(|| Date::parse(s).map(DateTime::from_date))
            .map(Value::DateTime),
        _ => None,
    })
}

fn eval_to_time(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    convert(invocation, |value| match value {
        Value::Time(t) => Some(Value::Time(*t)),
        Value::String(s) => Time::parse(s).map(Value::Time),
        _ => None,
    })
}

fn converts(
    invocation: &Invocation<'_>,
    probe: impl Fn(&Value) -> bool,
) -> EvalResult<Collection> {
    match singleton(&invocation.input, invocation.span)? {
        Some(value) => Ok(boolean(probe(value))),
        None => Ok(Collection::empty()),
    }
}

fn eval_converts_to_boolean(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    converts(invocation, |value| to_boolean(value).is_some())
}

fn eval_converts_to_integer(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    converts(invocation, |value| to_integer(value).is_some())
}

fn eval_converts_to_decimal(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    converts(invocation, |value| to_decimal(value).is_some())
}

fn eval_converts_to_string(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    converts(invocation, |value| to_string_value(value).is_some())
}

/// Used by the strings family: `join` renders items through the same
/// canonical conversion as `toString`.
pub(crate) fn render(value: &Value) -> Option<String> {
    to_string_value(value)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::registry::helpers::string;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    #[test]
    fn iif_branches_on_the_criterion() {
        assert_eq!(run("iif(true, 'a', 'b')"), string("a"));
        assert_eq!(run("iif(false, 'a', 'b')"), string("b"));
        assert_eq!(run("iif({}, 'a', 'b')"), string("b"));
        assert!(run("iif(false, 'a')").is_empty());
    }

    #[test]
    fn iif_is_lazy_in_the_untaken_branch() {
        // The untaken branch would error on a multi-element criterion
        assert_eq!(run("iif(true, 'a', (1|2).single())"), string("a"));
    }

    #[test]
    fn iif_on_multi_item_input_is_empty() {
        assert!(run("(1 | 2).iif(true, 'a', 'b')").is_empty());
    }

    #[test]
    fn boolean_conversions() {
        assert_eq!(run("'true'.toBoolean()").as_slice(), &[Value::Boolean(true)]);
        assert_eq!(run("'No'.toBoolean()").as_slice(), &[Value::Boolean(false)]);
        assert_eq!(run("1.toBoolean()").as_slice(), &[Value::Boolean(true)]);
        assert!(run("'maybe'.toBoolean()").is_empty());
        assert_eq!(
            run("'yes'.convertsToBoolean()").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn integer_conversions() {
        assert_eq!(run("'42'.toInteger()").as_slice(), &[Value::Integer(42)]);
        assert_eq!(run("true.toInteger()").as_slice(), &[Value::Integer(1)]);
        assert!(run("'4.2'.toInteger()").is_empty());
        assert!(run("(4.2).toInteger()").is_empty());
    }

    #[test]
    fn string_conversions() {
        assert_eq!(run("42.toString()"), string("42"));
        assert_eq!(run("(4.5).toString()"), string("4.5"));
        assert_eq!(run("true.toString()"), string("true"));
        assert_eq!(run("@2023-05-02.toString()"), string("2023-05-02"));
        assert_eq!(run("(5 'mg').toString()"), string("5 'mg'"));
    }

    #[test]
    fn quantity_conversions() {
        let result = run("'5.5 \\'mg\\''.toQuantity()");
        assert_eq!(result.first().unwrap().to_string(), "5.5 'mg'");
        let result = run("'2 weeks'.toQuantity()");
        assert_eq!(result.first().unwrap().to_string(), "2 weeks");
        assert!(run("'five'.toQuantity()").is_empty());
    }

    #[test]
    fn temporal_conversions() {
        assert_eq!(
            run("'2023-05-02'.toDate()").first().unwrap().to_string(),
            "2023-05-02"
        );
        assert_eq!(
            run("@2023-05-02.toDateTime()")
                .first()
                .unwrap()
                .to_string(),
            "2023-05-02T"
        );
        assert_eq!(
            run("'14:30'.toTime()").first().unwrap().to_string(),
            "14:30"
        );
    }

    #[test]
    fn conversions_propagate_empty() {
        assert!(run("{}.toInteger()").is_empty());
        assert!(run("{}.convertsToBoolean()").is_empty());
    }
}
