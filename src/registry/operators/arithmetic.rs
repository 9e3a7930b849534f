//! Arithmetic and additive operators: `+`, `-`, `*`, `/`, `div`, `mod`,
//! `&` and unary `+`/`-`
//!
//! Integer pairs stay integer (with overflow errors), mixed numerics
//! promote to decimal, `+` concatenates strings, and `+`/`-` on temporal
//! values with a calendar quantity perform date arithmetic. Division by
//! zero and coercion failures yield empty. `&` never propagates: an
//! empty operand counts as the empty string.

use crate::diagnostics::Diagnostic;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::evaluator::EvalScope;
use crate::model::temporal::{date_add, datetime_add, time_add};
use crate::model::types::{AnalysisType, SystemType, TypeAnnotation};
use crate::model::value::{Collection, Value};
use crate::registry::helpers::{decimal_of, singleton};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{
    AnalyzeContext, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

const BINARY_OPERANDS: &[Parameter] = &[
    Parameter::value("left", ParameterType::Any),
    Parameter::value("right", ParameterType::Any),
];

const CONCAT_OPERANDS: &[Parameter] = &[
    Parameter::collection("left"),
    Parameter::collection("right"),
];

const fn binary_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: BINARY_OPERANDS,
        output,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: true,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "+",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("+", precedence::ADDITIVE),
        signature: binary_signature(ReturnType::PromoteNumeric),
        analyze: Some(analyze_additive),
        evaluate: Some(eval_add),
    },
    OperationDef {
        name: "-",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("-", precedence::ADDITIVE),
        signature: binary_signature(ReturnType::PromoteNumeric),
        analyze: Some(analyze_additive),
        evaluate: Some(eval_subtract),
    },
    OperationDef {
        name: "*",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("*", precedence::MULTIPLICATIVE),
        signature: binary_signature(ReturnType::PromoteNumeric),
        analyze: None,
        evaluate: Some(eval_multiply),
    },
    OperationDef {
        name: "/",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("/", precedence::MULTIPLICATIVE),
        signature: binary_signature(ReturnType::Decimal),
        analyze: None,
        evaluate: Some(eval_divide),
    },
    OperationDef {
        name: "div",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("div", precedence::MULTIPLICATIVE),
        signature: binary_signature(ReturnType::Integer),
        analyze: None,
        evaluate: Some(eval_integer_divide),
    },
    OperationDef {
        name: "mod",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("mod", precedence::MULTIPLICATIVE),
        signature: binary_signature(ReturnType::PromoteNumeric),
        analyze: None,
        evaluate: Some(eval_modulo),
    },
    OperationDef {
        name: "&",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix("&", precedence::ADDITIVE),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: CONCAT_OPERANDS,
            output: ReturnType::String,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_concatenate),
    },
    OperationDef {
        name: "unary+",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::prefix("+"),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::value("operand", ParameterType::Any)],
            output: ReturnType::PreserveInput,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_unary_plus),
    },
    OperationDef {
        name: "unary-",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::prefix("-"),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::value("operand", ParameterType::Numeric)],
            output: ReturnType::PromoteNumeric,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_negate),
    },
];

/// `+`/`-` on strings and temporals do not promote numerically; give the
/// analyzer the precise output type.
fn analyze_additive(ctx: &AnalyzeContext<'_>, _diagnostics: &mut Vec<Diagnostic>) -> TypeAnnotation {
    let left = &ctx.operands[0];
    let right = &ctx.operands[1];
    let ty = match (&left.ty, &right.ty) {
        (AnalysisType::System(SystemType::String), AnalysisType::System(SystemType::String)) => {
            AnalysisType::System(SystemType::String)
        }
        (
            AnalysisType::System(
                temporal @ (SystemType::Date | SystemType::DateTime | SystemType::Time),
            ),
            AnalysisType::System(SystemType::Quantity),
        ) => AnalysisType::System(*temporal),
        (AnalysisType::System(SystemType::Quantity), AnalysisType::System(SystemType::Quantity)) => {
            AnalysisType::System(SystemType::Quantity)
        }
        _ => {
            return ctx
                .entry
                .signature
                .output_annotation(ctx.input, ctx.operands);
        }
    };
    TypeAnnotation::singleton(ty)
}

fn operands<'a>(
    invocation: &'a Invocation<'_>,
) -> EvalResult<Option<(&'a Value, &'a Value)>> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    let left = singleton(left, invocation.span)?;
    let right = singleton(right, invocation.span)?;
    Ok(left.zip(right))
}

fn eval_add(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let sum = a
                .checked_add(*b)
                .ok_or(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                })?;
            Some(Value::Integer(sum))
        }
        (Value::String(a), Value::String(b)) => Some(Value::String(format!("{a}{b}"))),
        (Value::Date(date), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| date_add(date, q.value, unit))
            .map(Value::Date),
        (Value::DateTime(datetime), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| datetime_add(datetime, q.value, unit))
            .map(Value::DateTime),
        (Value::Time(time), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| time_add(time, q.value, unit))
            .map(Value::Time),
        (Value::Quantity(a), Value::Quantity(b)) => a.checked_add(b).map(Value::Quantity),
        _ => numeric_pair(left, right).and_then(|(a, b)| a.checked_add(b).map(Value::Decimal)),
    };
    Ok(to_collection(result))
}

fn eval_subtract(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let difference = a
                .checked_sub(*b)
                .ok_or(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                })?;
            Some(Value::Integer(difference))
        }
        (Value::Date(date), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| date_add(date, -q.value, unit))
            .map(Value::Date),
        (Value::DateTime(datetime), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| datetime_add(datetime, -q.value, unit))
            .map(Value::DateTime),
        (Value::Time(time), Value::Quantity(q)) => q
            .calendar_unit()
            .and_then(|unit| time_add(time, -q.value, unit))
            .map(Value::Time),
        (Value::Quantity(a), Value::Quantity(b)) => a.checked_sub(b).map(Value::Quantity),
        _ => numeric_pair(left, right).and_then(|(a, b)| a.checked_sub(b).map(Value::Decimal)),
    };
    Ok(to_collection(result))
}

fn eval_multiply(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let product = a
                .checked_mul(*b)
                .ok_or(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                })?;
            Some(Value::Integer(product))
        }
        (Value::Quantity(q), other) | (other, Value::Quantity(q)) => {
            decimal_of(other).and_then(|factor| q.scale(factor).map(Value::Quantity))
        }
        _ => numeric_pair(left, right).and_then(|(a, b)| a.checked_mul(b).map(Value::Decimal)),
    };
    Ok(to_collection(result))
}

fn eval_divide(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Quantity(q), other) => {
            decimal_of(other).and_then(|divisor| q.divide(divisor).map(Value::Quantity))
        }
        _ => match numeric_pair(left, right) {
            Some((_, divisor)) if divisor.is_zero() => None,
            Some((a, b)) => a.checked_div(b).map(Value::Decimal),
            None => None,
        },
    };
    Ok(to_collection(result))
}

/// `div` truncates toward zero and always yields an integer.
fn eval_integer_divide(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Integer(_), Value::Integer(0)) => None,
        (Value::Integer(a), Value::Integer(b)) => match a.checked_div(*b) {
            Some(quotient) => Some(Value::Integer(quotient)),
            None => {
                return Err(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                });
            }
        },
        _ => match numeric_pair(left, right) {
            Some((_, divisor)) if divisor.is_zero() => None,
            Some((a, b)) => a
                .checked_div(b)
                .map(|quotient| quotient.trunc())
                .and_then(|quotient| quotient.to_i64())
                .map(Value::Integer),
            None => None,
        },
    };
    Ok(to_collection(result))
}

fn eval_modulo(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let Some((left, right)) = operands(invocation)? else {
        return Ok(Collection::empty());
    };
    let result = match (left, right) {
        (Value::Integer(_), Value::Integer(0)) => None,
        (Value::Integer(a), Value::Integer(b)) => a.checked_rem(*b).map(Value::Integer),
        _ => match numeric_pair(left, right) {
            Some((_, divisor)) if divisor.is_zero() => None,
            Some((a, b)) => a.checked_rem(b).map(Value::Decimal),
            None => None,
        },
    };
    Ok(to_collection(result))
}

fn eval_unary_plus(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let operand = invocation.value_arg(0).expect("unary operand");
    singleton(operand, invocation.span)?;
    Ok(operand.share())
}

fn eval_negate(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let operand = invocation.value_arg(0).expect("unary operand");
    let result = match singleton(operand, invocation.span)? {
        Some(Value::Integer(i)) => {
            i.checked_neg()
                .map(Value::Integer)
                .ok_or(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                })
                .map(Some)?
        }
        Some(Value::Decimal(d)) => Some(Value::Decimal(-*d)),
        Some(Value::Quantity(q)) => q.scale(Decimal::NEGATIVE_ONE).map(Value::Quantity),
        _ => None,
    };
    Ok(to_collection(result))
}

/// `&` treats an empty side as the empty string and yields empty when a
/// side is a non-string singleton.
fn concat_side(side: &Collection, span: crate::span::TextRange) -> EvalResult<Option<String>> {
    Ok(match singleton(side, span)? {
        None => Some(String::new()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => None,
    })
}

fn eval_concatenate(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let left = invocation.value_arg(0).expect("binary operand");
    let right = invocation.value_arg(1).expect("binary operand");
    let (Some(left), Some(right)) = (
        concat_side(left, invocation.span)?,
        concat_side(right, invocation.span)?,
    ) else {
        return Ok(Collection::empty());
    };
    Ok(Collection::singleton(Value::String(format!("{left}{right}"))))
}

/// Both operands as decimals when both are numeric.
fn numeric_pair(left: &Value, right: &Value) -> Option<(Decimal, Decimal)> {
    decimal_of(left).zip(decimal_of(right))
}

fn to_collection(value: Option<Value>) -> Collection {
    match value {
        Some(value) => Collection::singleton(value),
        None => Collection::empty(),
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    #[test]
    fn integer_arithmetic_stays_integer() {
        assert_eq!(run("2 + 3").as_slice(), &[Value::Integer(5)]);
        assert_eq!(run("2 * 3 - 10").as_slice(), &[Value::Integer(-4)]);
        assert_eq!(run("7 div 2").as_slice(), &[Value::Integer(3)]);
        assert_eq!(run("-7 div 2").as_slice(), &[Value::Integer(-3)]);
        assert_eq!(run("7 mod 2").as_slice(), &[Value::Integer(1)]);
    }

    #[test]
    fn division_always_yields_decimal() {
        assert_eq!(
            run("7 / 2").as_slice(),
            &[Value::Decimal(Decimal::from_str("3.5").unwrap())]
        );
    }

    #[test]
    fn division_by_zero_is_empty() {
        assert!(run("1 / 0").is_empty());
        assert!(run("1 div 0").is_empty());
        assert!(run("1 mod 0").is_empty());
        assert!(run("1.5 / 0.0").is_empty());
    }

    #[test]
    fn mixed_numerics_promote_to_decimal() {
        assert_eq!(
            run("2 + 0.5").as_slice(),
            &[Value::Decimal(Decimal::from_str("2.5").unwrap())]
        );
    }

    #[test]
    fn string_addition_concatenates() {
        assert_eq!(
            run("'ab' + 'cd'").as_slice(),
            &[Value::String("abcd".into())]
        );
    }

    #[test]
    fn empty_operands_propagate() {
        assert!(run("1 + {}").is_empty());
        assert!(run("{} - 1").is_empty());
    }

    #[test]
    fn date_plus_calendar_quantity() {
        let result = run("@2023-01-31 + 1 month");
        assert_eq!(result.len(), 1);
        assert_eq!(result.first().unwrap().to_string(), "2023-02-28");
    }

    #[test]
    fn quantity_addition_requires_matching_units() {
        let result = run("2 'mg' + 3 'mg'");
        assert_eq!(result.first().unwrap().to_string(), "5 'mg'");
        assert!(run("2 'mg' + 3 'kg'").is_empty());
    }

    #[test]
    fn unary_minus_negates() {
        assert_eq!(run("-(2 + 3)").as_slice(), &[Value::Integer(-5)]);
        assert_eq!(run("5 - -5").as_slice(), &[Value::Integer(10)]);
    }

    #[test]
    fn ampersand_concatenates_with_empty_as_empty_string() {
        assert_eq!(
            run("'ab' & 'cd'").as_slice(),
            &[Value::String("abcd".into())]
        );
        assert_eq!(run("'ab' & {}").as_slice(), &[Value::String("ab".into())]);
        assert_eq!(run("{} & {}").as_slice(), &[Value::String("".into())]);
        assert!(run("'ab' & 5").is_empty());
    }

    #[test]
    fn incompatible_operands_yield_empty() {
        assert!(run("'a' + 1").is_empty());
        assert!(run("true * 2").is_empty());
    }
}
