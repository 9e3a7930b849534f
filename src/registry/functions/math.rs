//! Math functions over singleton numeric inputs
//!
//! Integer-preserving where the operation allows it; transcendental
//! functions go through f64 and come back as decimals. Out-of-domain
//! inputs (sqrt of a negative, ln of zero) yield empty.

use crate::evaluator::EvalScope;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::model::quantity::Quantity;
use crate::model::value::{Collection, Value};
use crate::registry::helpers::{decimal_of, integer, singleton, singleton_integer};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

const fn math_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Numeric,
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
        name: "abs",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::PreserveInput),
        analyze: None,
        evaluate: Some(eval_abs),
    },
    OperationDef {
        name: "ceiling",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Integer),
        analyze: None,
        evaluate: Some(eval_ceiling),
    },
    OperationDef {
        name: "floor",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Integer),
        analyze: None,
        evaluate: Some(eval_floor),
    },
    OperationDef {
        name: "round",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Numeric,
            input_singleton: true,
            parameters: &[Parameter::value("precision", ParameterType::Integer).optional()],
            output: ReturnType::Decimal,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_round),
    },
    OperationDef {
        name: "sqrt",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Decimal),
        analyze: None,
        evaluate: Some(eval_sqrt),
    },
    OperationDef {
        name: "truncate",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Integer),
        analyze: None,
        evaluate: Some(eval_truncate),
    },
    OperationDef {
        name: "exp",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Decimal),
        analyze: None,
        evaluate: Some(eval_exp),
    },
    OperationDef {
        name: "ln",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: math_signature(ReturnType::Decimal),
        analyze: None,
        evaluate: Some(eval_ln),
    },
    OperationDef {
        name: "log",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Numeric,
            input_singleton: true,
            parameters: &[Parameter::value("base", ParameterType::Numeric)],
            output: ReturnType::Decimal,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_log),
    },
    OperationDef {
        name: "power",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Numeric,
            input_singleton: true,
            parameters: &[Parameter::value("exponent", ParameterType::Numeric)],
            output: ReturnType::PromoteNumeric,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_power),
    },
];

fn numeric_input<'a>(invocation: &'a Invocation<'_>) -> EvalResult<Option<&'a Value>> {
    singleton(&invocation.input, invocation.span)
}

fn decimal_result(value: Option<Decimal>) -> Collection {
    match value {
        Some(value) => Collection::singleton(Value::Decimal(value)),
        None => Collection::empty(),
    }
}

fn eval_abs(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)? {
        Some(Value::Integer(i)) => match i.checked_abs() {
            Some(absolute) => integer(absolute),
            None => {
                return Err(EvaluationError::ArithmeticOverflow {
                    range: invocation.span,
                });
            }
        },
        Some(Value::Decimal(d)) => Collection::singleton(Value::Decimal(d.abs())),
        Some(Value::Quantity(q)) => Collection::singleton(Value::Quantity(Quantity {
            value: q.value.abs(),
            unit: q.unit.clone(),
        })),
        _ => Collection::empty(),
    })
}

fn eval_ceiling(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)? {
        Some(Value::Integer(i)) => integer(*i),
        Some(Value::Decimal(d)) => match d.ceil().to_i64() {
            Some(value) => integer(value),
            None => Collection::empty(),
        },
        _ => Collection::empty(),
    })
}

fn eval_floor(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)? {
        Some(Value::Integer(i)) => integer(*i),
        Some(Value::Decimal(d)) => match d.floor().to_i64() {
            Some(value) => integer(value),
            None => Collection::empty(),
        },
        _ => Collection::empty(),
    })
}

/// Round half away from zero, to an optional decimal precision.
fn eval_round(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let precision = match invocation.value_arg(0) {
        Some(_) => match singleton_integer(invocation, 0)? {
            Some(precision) if precision >= 0 => precision as u32,
            _ => return Ok(Collection::empty()),
        },
        None => 0,
    };
    Ok(match numeric_input(invocation)? {
        Some(value) => match decimal_of(value) {
            Some(d) => decimal_result(Some(
                d.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero),
            )),
            None => Collection::empty(),
        },
        None => Collection::empty(),
    })
}

fn eval_sqrt(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)?.and_then(decimal_of) {
        Some(d) if d.is_sign_negative() => Collection::empty(),
        Some(d) => decimal_result(d.to_f64().map(f64::sqrt).and_then(Decimal::from_f64)),
        None => Collection::empty(),
    })
}

fn eval_truncate(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)? {
        Some(Value::Integer(i)) => integer(*i),
        Some(Value::Decimal(d)) => match d.trunc().to_i64() {
            Some(value) => integer(value),
            None => Collection::empty(),
        },
        _ => Collection::empty(),
    })
}

fn eval_exp(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)?.and_then(decimal_of) {
        Some(d) => decimal_result(d.to_f64().map(f64::exp).and_then(Decimal::from_f64)),
        None => Collection::empty(),
    })
}

fn eval_ln(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match numeric_input(invocation)?.and_then(decimal_of) {
        Some(d) if d <= Decimal::ZERO => Collection::empty(),
        Some(d) => decimal_result(d.to_f64().map(f64::ln).and_then(Decimal::from_f64)),
        None => Collection::empty(),
    })
}

fn eval_log(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let base = invocation
        .value_arg(0)
        .and_then(|arg| arg.as_singleton())
        .and_then(decimal_of);
    let value = numeric_input(invocation)?.and_then(decimal_of);
    Ok(match (value, base) {
        (Some(value), Some(base))
            if value > Decimal::ZERO && base > Decimal::ZERO && base != Decimal::ONE =>
        {
            decimal_result(
                value
                    .to_f64()
                    .zip(base.to_f64())
                    .map(|(v, b)| v.log(b))
                    .and_then(Decimal::from_f64),
            )
        }
        _ => Collection::empty(),
    })
}

fn eval_power(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let base = numeric_input(invocation)?;
    let exponent = invocation.value_arg(0).and_then(|arg| arg.as_singleton());
    Ok(match (base, exponent) {
        (Some(Value::Integer(base)), Some(Value::Integer(exponent))) if *exponent >= 0 => {
            match u32::try_from(*exponent)
                .ok()
                .and_then(|e| base.checked_pow(e))
            {
                Some(value) => integer(value),
                None => {
                    return Err(EvaluationError::ArithmeticOverflow {
                        range: invocation.span,
                    });
                }
            }
        }
        (Some(base), Some(exponent)) => {
            match (
                decimal_of(base).and_then(|d| d.to_f64()),
                decimal_of(exponent).and_then(|d| d.to_f64()),
            ) {
                (Some(base), Some(exponent)) => {
                    let value = base.powf(exponent);
                    if value.is_finite() {
                        decimal_result(Decimal::from_f64(value))
                    } else {
                        Collection::empty()
                    }
                }
                _ => Collection::empty(),
            }
        }
        _ => Collection::empty(),
    })
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
    fn integer_preserving_operations() {
        assert_eq!(run("(-5).abs()").as_slice(), &[Value::Integer(5)]);
        assert_eq!(run("(2.5).abs().toString()").first().unwrap().to_string(), "2.5");
        assert_eq!(run("(2.1).ceiling()").as_slice(), &[Value::Integer(3)]);
        assert_eq!(run("(-2.1).ceiling()").as_slice(), &[Value::Integer(-2)]);
        assert_eq!(run("(2.9).floor()").as_slice(), &[Value::Integer(2)]);
        assert_eq!(run("(2.9).truncate()").as_slice(), &[Value::Integer(2)]);
        assert_eq!(run("(-2.9).truncate()").as_slice(), &[Value::Integer(-2)]);
    }

    #[test]
    fn rounding_with_precision() {
        assert_eq!(
            run("(3.14159).round(2)").as_slice(),
            &[Value::Decimal(Decimal::from_str("3.14").unwrap())]
        );
        assert_eq!(
            run("(2.5).round()").as_slice(),
            &[Value::Decimal(Decimal::from_str("3").unwrap())]
        );
    }

    #[test]
    fn powers_and_roots() {
        assert_eq!(run("2.power(10)").as_slice(), &[Value::Integer(1024)]);
        assert_eq!(
            run("(16).sqrt()").as_slice(),
            &[Value::Decimal(Decimal::from_str("4").unwrap())]
        );
        assert!(run("(-1).sqrt()").is_empty());
    }

    #[test]
    fn logarithms() {
        assert_eq!(
            run("(8).log(2)").as_slice(),
            &[Value::Decimal(Decimal::from_str("3").unwrap())]
        );
        assert!(run("(0).ln()").is_empty());
        assert!(run("(1).exp().empty()").as_slice() == &[Value::Boolean(false)]);
    }

    #[test]
    fn non_numeric_input_is_empty() {
        assert!(run("'x'.abs()").is_empty());
        assert!(run("{}.sqrt()").is_empty());
    }
}
