//! Type information used by the analyzer and the `is`/`as`/`ofType` operations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The built-in system primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemType {
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
}

impl SystemType {
    /// Canonical type name.
    pub const fn name(&self) -> &'static str {
        match self {
            SystemType::Boolean => "Boolean",
            SystemType::Integer => "Integer",
            SystemType::Decimal => "Decimal",
            SystemType::String => "String",
            SystemType::Date => "Date",
            SystemType::DateTime => "DateTime",
            SystemType::Time => "Time",
            SystemType::Quantity => "Quantity",
        }
    }

    /// Resolve a type name, accepting the optional `System.` qualifier and
    /// the lowercase spellings FHIR primitives use (`boolean`, `dateTime`).
    pub fn parse(name: &str) -> Option<SystemType> {
        let name = name.strip_prefix("System.").unwrap_or(name);
        match name {
            "Boolean" | "boolean" => Some(SystemType::Boolean),
            "Integer" | "integer" => Some(SystemType::Integer),
            "Decimal" | "decimal" => Some(SystemType::Decimal),
            "String" | "string" => Some(SystemType::String),
            "Date" | "date" => Some(SystemType::Date),
            "DateTime" | "dateTime" => Some(SystemType::DateTime),
            "Time" | "time" => Some(SystemType::Time),
            "Quantity" => Some(SystemType::Quantity),
            _ => None,
        }
    }

    /// Whether values of this type are numeric for promotion purposes.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SystemType::Integer | SystemType::Decimal)
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Handle to a model-defined type. Minted by a
/// [`ModelProvider`](super::provider::ModelProvider); the engine only passes
/// it back to the provider and prints its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef(Arc<str>);

impl TypeRef {
    /// Create a handle. Intended for model providers.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name the provider registered.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A type as the analyzer sees it: a system primitive, a model type, or
/// the unknown top type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisType {
    /// Unknown / unconstrained
    Any,
    /// Built-in primitive
    System(SystemType),
    /// Provider-defined type
    Model(TypeRef),
}

impl AnalysisType {
    /// Printable name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            AnalysisType::Any => "Any".to_string(),
            AnalysisType::System(system) => system.name().to_string(),
            AnalysisType::Model(type_ref) => type_ref.name().to_string(),
        }
    }

    /// Whether this type is `Any`.
    pub fn is_any(&self) -> bool {
        matches!(self, AnalysisType::Any)
    }

    /// Whether this type is numeric (`Integer`, `Decimal`, or unknown).
    pub fn is_numeric(&self) -> bool {
        match self {
            AnalysisType::Any => true,
            AnalysisType::System(system) => system.is_numeric(),
            AnalysisType::Model(_) => false,
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Inferred type and cardinality, attached to AST nodes by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnnotation {
    /// The inferred type
    pub ty: AnalysisType,
    /// Whether the value is known to have at most one element
    pub singleton: bool,
}

impl TypeAnnotation {
    /// A singleton of the given type.
    pub fn singleton(ty: AnalysisType) -> Self {
        Self { ty, singleton: true }
    }

    /// A collection of the given element type.
    pub fn collection(ty: AnalysisType) -> Self {
        Self {
            ty,
            singleton: false,
        }
    }

    /// Unknown type, unknown cardinality.
    pub fn any() -> Self {
        Self {
            ty: AnalysisType::Any,
            singleton: false,
        }
    }

    /// Unknown type, single value.
    pub fn any_singleton() -> Self {
        Self {
            ty: AnalysisType::Any,
            singleton: true,
        }
    }
}
