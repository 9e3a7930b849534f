//! Core value and collection types
//!
//! Every expression evaluates to an ordered sequence of items; the empty
//! sequence stands for "unknown/absent". Items are primitives, quantities,
//! or opaque objects navigated through field access. Equality (tri-state)
//! and equivalence (total) are the single canonical structural comparisons
//! used by `=`, `~`, `in`, deduplication and `distinct`.

use super::provider::ModelProvider;
use super::quantity::Quantity;
use super::temporal::{Date, DateTime, Time};
use super::types::SystemType;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// JSON object backing for complex values.
pub type JsonMap = serde_json::Map<String, JsonValue>;

/// A single item in a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// Arbitrary-precision decimal
    Decimal(Decimal),
    /// String value
    String(String),
    /// Date with precision
    Date(Date),
    /// DateTime with precision and optional offset
    DateTime(DateTime),
    /// Time of day with precision
    Time(Time),
    /// Quantity with optional unit
    Quantity(Quantity),
    /// Opaque object navigated through field access
    Object(Arc<JsonMap>),
}

impl Value {
    /// Convert a non-null, non-array JSON value into an item.
    pub fn from_json_scalar(value: &JsonValue) -> Option<Value> {
        match value {
            JsonValue::Null | JsonValue::Array(_) => None,
            JsonValue::Bool(b) => Some(Value::Boolean(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Decimal(decimal_from_number(n)?),
            }),
            JsonValue::String(s) => Some(Value::String(s.clone())),
            JsonValue::Object(map) => Some(Value::Object(Arc::new(map.clone()))),
        }
    }

    /// Navigate a named field. Non-objects and missing fields contribute
    /// nothing; array-valued fields splice their elements.
    pub fn property(&self, name: &str) -> Collection {
        match self {
            Value::Object(map) => match map.get(name) {
                Some(value) => Collection::from_json(value),
                None => Collection::empty(),
            },
            _ => Collection::empty(),
        }
    }

    /// All direct child values of an object, in field order.
    pub fn children(&self) -> Collection {
        match self {
            Value::Object(map) => {
                let mut items = Vec::new();
                for value in map.values() {
                    push_json(value, &mut items);
                }
                Collection::from_vec(items)
            }
            _ => Collection::empty(),
        }
    }

    /// The value's type name: a system primitive name, or for objects the
    /// `resourceType` field when present.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Time(_) => "Time",
            Value::Quantity(_) => "Quantity",
            Value::Object(map) => map
                .get("resourceType")
                .and_then(JsonValue::as_str)
                .unwrap_or("Object"),
        }
    }

    /// Test this value against a type name (`Boolean`, `System.Integer`,
    /// `Patient`, ...). Model types go through the provider.
    pub fn matches_type(&self, name: &str, provider: &dyn ModelProvider) -> bool {
        if let Some(system) = SystemType::parse(name) {
            return matches!(
                (self, system),
                (Value::Boolean(_), SystemType::Boolean)
                    | (Value::Integer(_), SystemType::Integer)
                    | (Value::Decimal(_), SystemType::Decimal)
                    | (Value::String(_), SystemType::String)
                    | (Value::Date(_), SystemType::Date)
                    | (Value::DateTime(_), SystemType::DateTime)
                    | (Value::Time(_), SystemType::Time)
                    | (Value::Quantity(_), SystemType::Quantity)
            );
        }
        let name = name.strip_prefix("FHIR.").unwrap_or(name);
        match self {
            Value::Object(_) => provider.instance_of(self.type_name(), name),
            _ => false,
        }
    }

    /// Tri-state equality: `None` means unknown (e.g. precision mismatch
    /// between dates, or quantities with incomparable units).
    pub fn equals(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => Some(a == b),
            (Value::Integer(a), Value::Integer(b)) => Some(a == b),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a == b),
            (Value::Integer(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Integer(a)) => {
                Some(Decimal::from(*a) == *b)
            }
            (Value::String(a), Value::String(b)) => Some(a == b),
            (Value::Date(a), Value::Date(b)) => tri_equal(a.cmp_partial(b)),
            (Value::DateTime(a), Value::DateTime(b)) => tri_equal(a.cmp_partial(b)),
            (Value::Date(a), Value::DateTime(b)) => {
                tri_equal(DateTime::from_date(*a).cmp_partial(b))
            }
            (Value::DateTime(a), Value::Date(b)) => {
                tri_equal(a.cmp_partial(&DateTime::from_date(*b)))
            }
            (Value::Time(a), Value::Time(b)) => tri_equal(a.cmp_partial(b)),
            (Value::Quantity(a), Value::Quantity(b)) => a.equals(b),
            (Value::Object(a), Value::Object(b)) => Some(json_equal_map(a, b)),
            _ => Some(false),
        }
    }

    /// Total equivalence: case-insensitive for strings, numeric across
    /// integer/decimal, false (never unknown) on precision or unit
    /// mismatch.
    pub fn equivalent(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
            (Value::Quantity(a), Value::Quantity(b)) => a.equivalent(b),
            (Value::Object(a), Value::Object(b)) => json_equivalent_map(a, b),
            (Value::Date(a), Value::Date(b)) => a.cmp_partial(b) == Some(Ordering::Equal),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp_partial(b) == Some(Ordering::Equal),
            (Value::Time(a), Value::Time(b)) => a.cmp_partial(b) == Some(Ordering::Equal),
            _ => self.equals(other) == Some(true),
        }
    }

    /// Ordering for `<`/`<=`/`>`/`>=`. `None` when the operands are not
    /// comparable (mixed kinds, unit or precision mismatch).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Value::Decimal(a), Value::Integer(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => a.cmp_partial(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp_partial(b),
            (Value::Date(a), Value::DateTime(b)) => DateTime::from_date(*a).cmp_partial(b),
            (Value::DateTime(a), Value::Date(b)) => a.cmp_partial(&DateTime::from_date(*b)),
            (Value::Time(a), Value::Time(b)) => a.cmp_partial(b),
            (Value::Quantity(a), Value::Quantity(b)) => a.cmp_partial(b),
            _ => None,
        }
    }

    /// Render back to JSON for output surfaces.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(d.to_string())),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Date(d) => JsonValue::String(d.to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_string()),
            Value::Time(t) => JsonValue::String(t.to_string()),
            Value::Quantity(q) => {
                let mut map = JsonMap::new();
                map.insert("value".to_string(), JsonValue::String(q.value.to_string()));
                if let Some(unit) = &q.unit {
                    map.insert("unit".to_string(), JsonValue::String(unit.clone()));
                }
                JsonValue::Object(map)
            }
            Value::Object(map) => JsonValue::Object((**map).clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Quantity(q) => write!(f, "{q}"),
            Value::Object(map) => {
                let rendered = serde_json::to_string(map.as_ref()).map_err(|_| fmt::Error)?;
                write!(f, "{rendered}")
            }
        }
    }
}

fn tri_equal(ordering: Option<Ordering>) -> Option<bool> {
    ordering.map(|ord| ord == Ordering::Equal)
}

fn decimal_from_number(n: &serde_json::Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

/// Structural JSON equality with numeric comparison of numbers.
fn json_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            match (decimal_from_number(x), decimal_from_number(y)) {
                (Some(dx), Some(dy)) => dx == dy,
                _ => x == y,
            }
        }
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => json_equal_map(x, y),
        _ => a == b,
    }
}

fn json_equal_map(a: &JsonMap, b: &JsonMap) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| json_equal(value, other)))
}

/// Structural JSON equivalence: strings compare case-insensitively.
fn json_equivalent(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::String(x), JsonValue::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equivalent(x, y))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => json_equivalent_map(x, y),
        _ => json_equal(a, b),
    }
}

fn json_equivalent_map(a: &JsonMap, b: &JsonMap) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| json_equivalent(value, other)))
}

/// An ordered, immutable sequence of items. Cloning shares the backing
/// storage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection(Arc<[Value]>);

impl Collection {
    /// The empty collection.
    pub fn empty() -> Self {
        Self(Arc::from([]))
    }

    /// A one-element collection.
    pub fn singleton(value: Value) -> Self {
        Self(Arc::from([value]))
    }

    /// Build from a vector of items.
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(values.into())
    }

    /// Convert a JSON value: null becomes empty, arrays splice their
    /// elements (recursively), everything else is a single item.
    pub fn from_json(value: &JsonValue) -> Self {
        let mut items = Vec::new();
        push_json(value, &mut items);
        Self::from_vec(items)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Item at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// First item, if any.
    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    /// Last item, if any.
    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    /// The single item when the collection is a singleton.
    pub fn as_singleton(&self) -> Option<&Value> {
        match self.0.as_ref() {
            [value] => Some(value),
            _ => None,
        }
    }

    /// View as a slice.
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Take ownership of the items.
    pub fn into_vec(self) -> Vec<Value> {
        self.0.to_vec()
    }

    /// Zero-copy clone sharing the backing storage.
    pub fn share(&self) -> Self {
        Self(Arc::clone(&self.0))
    }

    /// Concatenate two collections preserving order.
    pub fn concat(&self, other: &Collection) -> Self {
        if self.is_empty() {
            return other.share();
        }
        if other.is_empty() {
            return self.share();
        }
        let mut items = self.0.to_vec();
        items.extend(other.0.iter().cloned());
        Self(items.into())
    }

    /// Whether any item equals `value` (strict equality).
    pub fn contains_equal(&self, value: &Value) -> bool {
        self.0.iter().any(|item| item.equals(value) == Some(true))
    }

    /// Whether any item is equivalent to `value`.
    pub fn contains_equivalent(&self, value: &Value) -> bool {
        self.0.iter().any(|item| item.equivalent(value))
    }

    /// Deduplicate by equivalence, keeping first occurrences in order.
    pub fn distinct(&self) -> Self {
        let mut items: Vec<Value> = Vec::with_capacity(self.len());
        for value in self.iter() {
            if !items.iter().any(|seen| seen.equivalent(value)) {
                items.push(value.clone());
            }
        }
        Self::from_vec(items)
    }

    /// Element-wise tri-state equality: `None` when either side is empty
    /// or an element comparison is unknown.
    pub fn equals(&self, other: &Collection) -> Option<bool> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        if self.len() != other.len() {
            return Some(false);
        }
        let mut unknown = false;
        for (a, b) in self.iter().zip(other.iter()) {
            match a.equals(b) {
                Some(false) => return Some(false),
                Some(true) => {}
                None => unknown = true,
            }
        }
        if unknown { None } else { Some(true) }
    }

    /// Order-insensitive total equivalence; two empty collections are
    /// equivalent.
    pub fn equivalent(&self, other: &Collection) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut used = vec![false; other.len()];
        'outer: for a in self.iter() {
            for (i, b) in other.iter().enumerate() {
                if !used[i] && a.equivalent(b) {
                    used[i] = true;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }

    /// Render to a JSON array.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.iter().map(Value::to_json).collect())
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn push_json(value: &JsonValue, out: &mut Vec<Value>) {
    match value {
        JsonValue::Null => {}
        JsonValue::Array(items) => {
            for item in items {
                push_json(item, out);
            }
        }
        other => {
            if let Some(item) = Value::from_json_scalar(other) {
                out.push(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_arrays_splice_into_collections() {
        let collection = Collection::from_json(&json!([1, [2, 3], null, "x"]));
        assert_eq!(collection.len(), 4);
        assert_eq!(collection.get(2), Some(&Value::Integer(3)));
    }

    #[test]
    fn property_navigation_splices_arrays() {
        let value = Value::from_json_scalar(&json!({"given": ["Peter", "James"]})).unwrap();
        let given = value.property("given");
        assert_eq!(given.len(), 2);
        assert_eq!(value.property("missing").len(), 0);
    }

    #[test]
    fn numeric_equality_promotes() {
        let five = Value::Integer(5);
        let five_decimal = Value::Decimal(Decimal::from_str("5.0").unwrap());
        assert_eq!(five.equals(&five_decimal), Some(true));
        assert!(five.equivalent(&five_decimal));
    }

    #[test]
    fn string_equivalence_is_case_insensitive() {
        let a = Value::String("Peter".into());
        let b = Value::String("peter".into());
        assert_eq!(a.equals(&b), Some(false));
        assert!(a.equivalent(&b));
    }

    #[test]
    fn date_precision_mismatch_is_unknown_for_equality_only() {
        let year = Value::Date(Date::parse("2023").unwrap());
        let day = Value::Date(Date::parse("2023-05-02").unwrap());
        assert_eq!(year.equals(&day), None);
        assert!(!year.equivalent(&day));
    }

    #[test]
    fn collection_equality_is_ordered() {
        let a = Collection::from_vec(vec![Value::Integer(1), Value::Integer(2)]);
        let b = Collection::from_vec(vec![Value::Integer(2), Value::Integer(1)]);
        assert_eq!(a.equals(&b), Some(false));
        assert!(a.equivalent(&b));
    }

    #[test]
    fn empty_collections_compare_unknown_for_equality() {
        let empty = Collection::empty();
        let one = Collection::singleton(Value::Integer(1));
        assert_eq!(empty.equals(&one), None);
        assert_eq!(empty.equals(&Collection::empty()), None);
        assert!(empty.equivalent(&Collection::empty()));
    }

    #[test]
    fn object_equality_is_structural_and_numeric() {
        let a = Value::from_json_scalar(&json!({"v": 1.0})).unwrap();
        let b = Value::from_json_scalar(&json!({"v": 1})).unwrap();
        assert_eq!(a.equals(&b), Some(true));
    }

    #[test]
    fn distinct_uses_equivalence() {
        let collection = Collection::from_vec(vec![
            Value::String("A".into()),
            Value::String("a".into()),
            Value::Integer(1),
        ]);
        assert_eq!(collection.distinct().len(), 2);
    }
}
