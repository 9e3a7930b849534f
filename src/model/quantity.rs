//! Quantity values: a decimal magnitude with an optional unit
//!
//! Units are compared literally after calendar-keyword normalization; full
//! UCUM conversion tables are an external collaborator and out of scope, so
//! `1 'm' < 100 'cm'` is unknown here while `1 year = 12 months` is not
//! attempted either.

use super::temporal::CalendarUnit;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// A measured amount, e.g. `5 'mg'` or `2 years`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantity {
    /// Magnitude
    pub value: Decimal,
    /// UCUM code or calendar keyword; `None` for a dimensionless amount
    pub unit: Option<String>,
}

impl Quantity {
    /// Create a quantity with a unit.
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: Some(unit.into()),
        }
    }

    /// Create a dimensionless quantity.
    pub fn dimensionless(value: Decimal) -> Self {
        Self { value, unit: None }
    }

    /// The calendar duration unit, when the unit denotes one.
    pub fn calendar_unit(&self) -> Option<CalendarUnit> {
        CalendarUnit::parse(self.unit.as_deref()?)
    }

    /// Unit normalized for comparison: calendar keywords collapse to their
    /// canonical singular form, and the UCUM unity code `1` counts as
    /// dimensionless.
    fn normalized_unit(&self) -> Option<&str> {
        let unit = self.unit.as_deref()?;
        if unit == "1" || unit.is_empty() {
            return None;
        }
        Some(match CalendarUnit::parse(unit) {
            Some(calendar) => calendar.keyword(),
            None => unit,
        })
    }

    /// Whether the two units are comparable without conversion tables.
    pub fn same_unit(&self, other: &Quantity) -> bool {
        self.normalized_unit() == other.normalized_unit()
    }

    /// Sum, defined for matching units only.
    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        if !self.same_unit(other) {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_add(other.value)?,
            unit: self.unit.clone(),
        })
    }

    /// Difference, defined for matching units only.
    pub fn checked_sub(&self, other: &Quantity) -> Option<Quantity> {
        if !self.same_unit(other) {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_sub(other.value)?,
            unit: self.unit.clone(),
        })
    }

    /// Scale by a plain number.
    pub fn scale(&self, factor: Decimal) -> Option<Quantity> {
        Some(Quantity {
            value: self.value.checked_mul(factor)?,
            unit: self.unit.clone(),
        })
    }

    /// Divide by a plain number; zero divisor yields `None`.
    pub fn divide(&self, divisor: Decimal) -> Option<Quantity> {
        if divisor.is_zero() {
            return None;
        }
        Some(Quantity {
            value: self.value.checked_div(divisor)?,
            unit: self.unit.clone(),
        })
    }

    /// Ordering; `None` when units do not match.
    pub fn cmp_partial(&self, other: &Quantity) -> Option<Ordering> {
        if !self.same_unit(other) {
            return None;
        }
        Some(self.value.cmp(&other.value))
    }

    /// Equality; `None` (unknown) when units do not match.
    pub fn equals(&self, other: &Quantity) -> Option<bool> {
        if !self.same_unit(other) {
            return None;
        }
        Some(self.value == other.value)
    }

    /// Equivalence is total: mismatched units are simply not equivalent.
    pub fn equivalent(&self, other: &Quantity) -> bool {
        self.same_unit(other) && self.value == other.value
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit.as_deref() {
            Some(unit) if CalendarUnit::parse(unit).is_some() => {
                write!(f, "{} {unit}", self.value)
            }
            Some(unit) => write!(f, "{} '{unit}'", self.value),
            None => write!(f, "{}", self.value),
        }
    }
}
