//! Literal-kind entries
//!
//! One entry per literal value kind. The parser builds the literal node;
//! these entries own its typing (analyze) and its value construction
//! (evaluate), so literals go through the same registry dispatch as
//! operators and functions.

use crate::ast::LiteralValue;
use crate::evaluator::EvalScope;
use crate::evaluator::error::EvalResult;
use crate::model::quantity::Quantity;
use crate::model::value::{Collection, Value};
use crate::registry::signature::{OutputCardinality, ReturnType, Signature};
use crate::registry::{Argument, Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};

const fn literal_signature(output: ReturnType) -> Signature {
    Signature {
        input: ParameterType::Any,
        input_singleton: false,
        parameters: &[],
        output,
        cardinality: OutputCardinality::Singleton,
        propagates_empty: false,
        deterministic: true,
    }
}

const fn literal_entry(name: &'static str, output: ReturnType) -> OperationDef {
    OperationDef {
        name,
        kind: OperationKind::Literal,
        syntax: SyntaxInfo::literal(),
        signature: literal_signature(output),
        analyze: None,
        evaluate: Some(eval_literal),
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    literal_entry("boolean-literal", ReturnType::Boolean),
    literal_entry("integer-literal", ReturnType::Integer),
    literal_entry("decimal-literal", ReturnType::Decimal),
    literal_entry("string-literal", ReturnType::String),
    literal_entry("date-literal", ReturnType::Date),
    literal_entry("datetime-literal", ReturnType::DateTime),
    literal_entry("time-literal", ReturnType::Time),
    literal_entry("quantity-literal", ReturnType::Quantity),
];

/// The registry key for a literal value's kind.
pub fn kind_name(value: &LiteralValue) -> &'static str {
    match value {
        LiteralValue::Boolean(_) => "boolean-literal",
        LiteralValue::Integer(_) => "integer-literal",
        LiteralValue::Decimal(_) => "decimal-literal",
        LiteralValue::String(_) => "string-literal",
        LiteralValue::Date(_) => "date-literal",
        LiteralValue::DateTime(_) => "datetime-literal",
        LiteralValue::Time(_) => "time-literal",
        LiteralValue::Quantity { .. } => "quantity-literal",
    }
}

fn eval_literal(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let literal = invocation
        .args
        .iter()
        .find_map(|arg| match arg {
            Argument::Literal(literal) => Some(*literal),
            _ => None,
        })
        .expect("literal invocations carry their payload");
    Ok(Collection::singleton(match literal {
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Integer(i) => Value::Integer(*i),
        LiteralValue::Decimal(d) => Value::Decimal(*d),
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Date(d) => Value::Date(*d),
        LiteralValue::DateTime(dt) => Value::DateTime(*dt),
        LiteralValue::Time(t) => Value::Time(*t),
        LiteralValue::Quantity { value, unit } => {
            Value::Quantity(Quantity::new(*value, unit.clone()))
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn every_kind_has_a_name() {
        assert_eq!(kind_name(&LiteralValue::Boolean(true)), "boolean-literal");
        assert_eq!(
            kind_name(&LiteralValue::Quantity {
                value: Decimal::ONE,
                unit: String::new(),
            }),
            "quantity-literal"
        );
    }
}
