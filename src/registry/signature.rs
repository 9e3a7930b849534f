//! Operation signatures: parameter and output typing metadata
//!
//! Signatures drive both the analyzer's default checks (arity, types,
//! cardinality) and the interpreter's argument preparation (eager value
//! versus deferred expression versus type specifier).

use crate::model::types::{AnalysisType, SystemType, TypeAnnotation};

/// Expected type of an input or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// No constraint
    Any,
    Boolean,
    Integer,
    Decimal,
    /// Integer or Decimal
    Numeric,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
    /// Any collection (no element constraint)
    Collection,
}

impl ParameterType {
    /// Whether a value of `actual` satisfies this parameter type, with
    /// implicit Integer -> Decimal promotion. `Any` on either side always
    /// matches.
    pub fn accepts(&self, actual: &AnalysisType) -> bool {
        let system = match actual {
            AnalysisType::Any => return true,
            AnalysisType::Model(_) => return matches!(self, ParameterType::Any | ParameterType::Collection),
            AnalysisType::System(system) => *system,
        };
        match self {
            ParameterType::Any | ParameterType::Collection => true,
            ParameterType::Boolean => system == SystemType::Boolean,
            ParameterType::Integer => system == SystemType::Integer,
            ParameterType::Decimal => {
                matches!(system, SystemType::Decimal | SystemType::Integer)
            }
            ParameterType::Numeric => system.is_numeric(),
            ParameterType::String => system == SystemType::String,
            ParameterType::Date => system == SystemType::Date,
            ParameterType::DateTime => {
                matches!(system, SystemType::DateTime | SystemType::Date)
            }
            ParameterType::Time => system == SystemType::Time,
            ParameterType::Quantity => system == SystemType::Quantity,
        }
    }

    /// Printable name for diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            ParameterType::Any => "Any",
            ParameterType::Boolean => "Boolean",
            ParameterType::Integer => "Integer",
            ParameterType::Decimal => "Decimal",
            ParameterType::Numeric => "Integer or Decimal",
            ParameterType::String => "String",
            ParameterType::Date => "Date",
            ParameterType::DateTime => "DateTime",
            ParameterType::Time => "Time",
            ParameterType::Quantity => "Quantity",
            ParameterType::Collection => "collection",
        }
    }
}

/// How an argument reaches the evaluate hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Evaluated eagerly before dispatch
    Value,
    /// Passed unevaluated as an AST subtree (iterator criteria, lazy
    /// operands)
    Expression,
    /// A type name, resolved from the argument's dotted-name form
    TypeSpecifier,
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// Name used in diagnostics
    pub name: &'static str,
    /// Expected type
    pub ty: ParameterType,
    /// Eager, deferred or type specifier
    pub kind: ParameterKind,
    /// Whether the argument may be omitted
    pub optional: bool,
    /// Whether the argument must be a singleton (or empty)
    pub singleton: bool,
}

impl Parameter {
    /// A required eager singleton parameter.
    pub const fn value(name: &'static str, ty: ParameterType) -> Self {
        Self {
            name,
            ty,
            kind: ParameterKind::Value,
            optional: false,
            singleton: true,
        }
    }

    /// A required eager collection parameter.
    pub const fn collection(name: &'static str) -> Self {
        Self {
            name,
            ty: ParameterType::Collection,
            kind: ParameterKind::Value,
            optional: false,
            singleton: false,
        }
    }

    /// A required deferred-expression parameter.
    pub const fn expression(name: &'static str) -> Self {
        Self {
            name,
            ty: ParameterType::Any,
            kind: ParameterKind::Expression,
            optional: false,
            singleton: false,
        }
    }

    /// A required type-specifier parameter.
    pub const fn type_specifier(name: &'static str) -> Self {
        Self {
            name,
            ty: ParameterType::Any,
            kind: ParameterKind::TypeSpecifier,
            optional: false,
            singleton: true,
        }
    }

    /// Mark this parameter optional.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Declared output type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Boolean,
    Integer,
    Decimal,
    String,
    Date,
    DateTime,
    Time,
    Quantity,
    /// Unconstrained
    Any,
    /// Output type (and cardinality) equal the input's
    PreserveInput,
    /// Output element type equals the input's, cardinality unconstrained
    PreserveElement,
    /// Integer when all numeric operands are Integer, Decimal otherwise
    PromoteNumeric,
}

/// Output cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCardinality {
    /// At most one element
    Singleton,
    /// Unconstrained
    Collection,
    /// Same as the input's cardinality
    PreserveInput,
}

/// Full signature of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Expected input (operand for operators, focus for functions)
    pub input: ParameterType,
    /// Whether the input must be a singleton (or empty)
    pub input_singleton: bool,
    /// Declared parameters in order
    pub parameters: &'static [Parameter],
    /// Declared output type
    pub output: ReturnType,
    /// Declared output cardinality
    pub cardinality: OutputCardinality,
    /// Whether any empty operand makes the result empty
    pub propagates_empty: bool,
    /// Whether repeated evaluation yields the same result
    pub deterministic: bool,
}

impl Signature {
    /// Minimum number of arguments.
    pub fn min_args(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }

    /// Maximum number of arguments.
    pub fn max_args(&self) -> usize {
        self.parameters.len()
    }

    /// Whether `count` arguments satisfy the signature.
    pub fn accepts_arg_count(&self, count: usize) -> bool {
        count >= self.min_args() && count <= self.max_args()
    }

    /// Human-readable argument-count expectation ("1", "0 to 1", ...).
    pub fn arity_description(&self) -> String {
        let min = self.min_args();
        let max = self.max_args();
        if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        }
    }

    /// Resolve the declared output against the input annotation and the
    /// analyzed operand annotations.
    pub fn output_annotation(
        &self,
        input: &TypeAnnotation,
        operands: &[TypeAnnotation],
    ) -> TypeAnnotation {
        let ty = match self.output {
            ReturnType::Boolean => AnalysisType::System(SystemType::Boolean),
            ReturnType::Integer => AnalysisType::System(SystemType::Integer),
            ReturnType::Decimal => AnalysisType::System(SystemType::Decimal),
            ReturnType::String => AnalysisType::System(SystemType::String),
            ReturnType::Date => AnalysisType::System(SystemType::Date),
            ReturnType::DateTime => AnalysisType::System(SystemType::DateTime),
            ReturnType::Time => AnalysisType::System(SystemType::Time),
            ReturnType::Quantity => AnalysisType::System(SystemType::Quantity),
            ReturnType::Any => AnalysisType::Any,
            ReturnType::PreserveInput | ReturnType::PreserveElement => input.ty.clone(),
            ReturnType::PromoteNumeric => promote_numeric(operands),
        };
        let singleton = match self.cardinality {
            OutputCardinality::Singleton => true,
            OutputCardinality::Collection => false,
            OutputCardinality::PreserveInput => input.singleton,
        };
        TypeAnnotation { ty, singleton }
    }
}

/// `Integer op Integer -> Integer`, anything else numeric -> `Decimal`,
/// unknown operands stay unknown.
fn promote_numeric(operands: &[TypeAnnotation]) -> AnalysisType {
    let mut all_integer = true;
    for operand in operands {
        match &operand.ty {
            AnalysisType::System(SystemType::Integer) => {}
            AnalysisType::System(SystemType::Decimal) => all_integer = false,
            AnalysisType::Any => return AnalysisType::Any,
            _ => return AnalysisType::Any,
        }
    }
    if all_integer {
        AnalysisType::System(SystemType::Integer)
    } else {
        AnalysisType::System(SystemType::Decimal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_promotes_to_decimal_parameters() {
        let actual = AnalysisType::System(SystemType::Integer);
        assert!(ParameterType::Decimal.accepts(&actual));
        assert!(ParameterType::Numeric.accepts(&actual));
        assert!(!ParameterType::String.accepts(&actual));
    }

    #[test]
    fn any_accepts_everything() {
        assert!(ParameterType::Any.accepts(&AnalysisType::System(SystemType::Time)));
        assert!(ParameterType::String.accepts(&AnalysisType::Any));
    }

    #[test]
    fn optional_parameters_widen_arity() {
        static PARAMS: &[Parameter] = &[
            Parameter::value("pattern", ParameterType::String),
            Parameter::value("substitution", ParameterType::String).optional(),
        ];
        let signature = Signature {
            input: ParameterType::String,
            input_singleton: true,
            parameters: PARAMS,
            output: ReturnType::String,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: true,
            deterministic: true,
        };
        assert!(signature.accepts_arg_count(1));
        assert!(signature.accepts_arg_count(2));
        assert!(!signature.accepts_arg_count(3));
        assert_eq!(signature.arity_description(), "1 to 2");
    }

    #[test]
    fn promote_numeric_follows_operands() {
        let int = TypeAnnotation::singleton(AnalysisType::System(SystemType::Integer));
        let dec = TypeAnnotation::singleton(AnalysisType::System(SystemType::Decimal));
        assert_eq!(
            promote_numeric(&[int.clone(), int.clone()]),
            AnalysisType::System(SystemType::Integer)
        );
        assert_eq!(
            promote_numeric(&[int, dec]),
            AnalysisType::System(SystemType::Decimal)
        );
    }
}
