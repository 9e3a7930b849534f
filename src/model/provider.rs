//! Model provider interface
//!
//! Domain schemas enter the engine only through this trait: the analyzer
//! asks it to resolve type names and property types, and the interpreter
//! consults it for `is`/`as`/`ofType` checks on model types.

use super::types::{AnalysisType, TypeRef};

/// Type and cardinality of a navigated property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property value type
    pub ty: AnalysisType,
    /// Whether the property holds at most one value
    pub singleton: bool,
}

/// Supplies domain type information to the analyzer and interpreter.
///
/// Implementations own their schema representation; [`TypeRef`] handles are
/// minted by `resolve_type` and only ever handed back to the same provider.
pub trait ModelProvider {
    /// Resolve a type by name.
    fn resolve_type(&self, name: &str) -> Option<TypeRef>;

    /// Type and cardinality of property `name` on `ty`, if it exists.
    fn property_type(&self, ty: &TypeRef, name: &str) -> Option<PropertyInfo>;

    /// Whether a value of `from` may be used where `to` is expected.
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool;

    /// Printable name of a type.
    fn type_name(&self, ty: &TypeRef) -> String {
        ty.name().to_string()
    }

    /// Whether the type itself denotes a collection.
    fn is_collection(&self, _ty: &TypeRef) -> bool {
        false
    }

    /// A common supertype for a set of types, if the model defines one.
    fn common_type(&self, _types: &[TypeRef]) -> Option<TypeRef> {
        None
    }

    /// Whether a runtime value whose type name is `value_type` conforms to
    /// `type_name`. Used by `is`/`as`/`ofType` on model values.
    fn instance_of(&self, value_type: &str, type_name: &str) -> bool {
        if value_type == type_name {
            return true;
        }
        match (self.resolve_type(value_type), self.resolve_type(type_name)) {
            (Some(from), Some(to)) => self.is_assignable(&from, &to),
            _ => false,
        }
    }
}

/// Provider that knows no model types. Analysis over it degrades to `Any`
/// and `is` checks fall back to exact resource-type name matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModelProvider;

impl ModelProvider for NullModelProvider {
    fn resolve_type(&self, _name: &str) -> Option<TypeRef> {
        None
    }

    fn property_type(&self, _ty: &TypeRef, _name: &str) -> Option<PropertyInfo> {
        None
    }

    fn is_assignable(&self, _from: &TypeRef, _to: &TypeRef) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_provider_resolves_nothing() {
        let provider = NullModelProvider;
        assert!(provider.resolve_type("Patient").is_none());
        assert!(provider.instance_of("Patient", "Patient"));
        assert!(!provider.instance_of("Patient", "Resource"));
    }
}
