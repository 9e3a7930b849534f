//! Shared helpers for evaluate hooks

use super::Invocation;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::model::value::{Collection, Value};
use crate::span::TextRange;
use rust_decimal::Decimal;

/// Unwrap a collection that must be empty or a singleton.
pub(crate) fn singleton<'a>(
    collection: &'a Collection,
    range: TextRange,
) -> EvalResult<Option<&'a Value>> {
    match collection.as_slice() {
        [] => Ok(None),
        [value] => Ok(Some(value)),
        items => Err(EvaluationError::SingletonRequired {
            found: items.len(),
            range,
        }),
    }
}

/// The singleton string of a value argument; `None` when the argument is
/// absent, empty, or not a string.
pub(crate) fn singleton_string(
    invocation: &Invocation<'_>,
    index: usize,
) -> EvalResult<Option<String>> {
    let Some(collection) = invocation.value_arg(index) else {
        return Ok(None);
    };
    match singleton(collection, invocation.span)? {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        _ => Ok(None),
    }
}

/// The singleton integer of a value argument.
pub(crate) fn singleton_integer(
    invocation: &Invocation<'_>,
    index: usize,
) -> EvalResult<Option<i64>> {
    let Some(collection) = invocation.value_arg(index) else {
        return Ok(None);
    };
    match singleton(collection, invocation.span)? {
        Some(Value::Integer(i)) => Ok(Some(*i)),
        _ => Ok(None),
    }
}

/// The numeric magnitude of a value, promoting integers.
pub(crate) fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// The singleton string input of a string function; `None` when the input
/// is empty or not a string (coercion failures yield empty, not errors).
pub(crate) fn string_input(invocation: &Invocation<'_>) -> EvalResult<Option<String>> {
    match singleton(&invocation.input, invocation.span)? {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        _ => Ok(None),
    }
}

pub(crate) fn boolean(value: bool) -> Collection {
    Collection::singleton(Value::Boolean(value))
}

pub(crate) fn integer(value: i64) -> Collection {
    Collection::singleton(Value::Integer(value))
}

pub(crate) fn string(value: impl Into<String>) -> Collection {
    Collection::singleton(Value::String(value.into()))
}
