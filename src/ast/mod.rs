//! Expression AST shared by the parser, analyzer and interpreter
//!
//! Every node carries its source range; the analyzer fills the
//! `annotation` slot in place. `Error` and `Incomplete` variants appear
//! only when the parser runs in error-recovery mode.

use crate::model::temporal::{Date, DateTime, Time};
use crate::model::types::TypeAnnotation;
use crate::span::TextRange;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::fmt;

/// A parsed expression node with its source range and, after analysis,
/// its inferred type.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// The node variant
    pub kind: ExpressionKind,
    /// Range inside the original expression text
    pub span: TextRange,
    /// Inferred type and cardinality, set by the analyzer
    pub annotation: Option<TypeAnnotation>,
}

impl Expression {
    /// Create a node without an annotation.
    pub fn new(kind: ExpressionKind, span: TextRange) -> Self {
        Self {
            kind,
            span,
            annotation: None,
        }
    }

    /// A literal node.
    pub fn literal(value: LiteralValue, span: TextRange) -> Self {
        Self::new(ExpressionKind::Literal(value), span)
    }

    /// An identifier node (lowercase start by convention).
    pub fn identifier(name: impl Into<String>, span: TextRange) -> Self {
        Self::new(ExpressionKind::Identifier(name.into()), span)
    }

    /// A type-or-identifier node (uppercase start by convention).
    pub fn type_identifier(name: impl Into<String>, span: TextRange) -> Self {
        Self::new(ExpressionKind::TypeIdentifier(name.into()), span)
    }

    /// A variable reference node.
    pub fn variable(variable: Variable, span: TextRange) -> Self {
        Self::new(ExpressionKind::Variable(variable), span)
    }

    /// A binary operation; the span covers both operands.
    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        let span = left.span.cover(right.span);
        Self::new(
            ExpressionKind::Binary(Box::new(BinaryExpr { op, left, right })),
            span,
        )
    }

    /// A unary operation; `span` should include the operator token.
    pub fn unary(op: UnaryOperator, operand: Expression, span: TextRange) -> Self {
        Self::new(
            ExpressionKind::Unary(Box::new(UnaryExpr { op, operand })),
            span,
        )
    }

    /// A function call node.
    pub fn function(
        name: impl Into<String>,
        name_span: TextRange,
        args: SmallVec<[Expression; 4]>,
        span: TextRange,
    ) -> Self {
        Self::new(
            ExpressionKind::Function(Box::new(FunctionCall {
                name: name.into(),
                name_span,
                args,
            })),
            span,
        )
    }

    /// An index access node; `span` should include the closing bracket.
    pub fn index(base: Expression, index: Expression, span: TextRange) -> Self {
        Self::new(
            ExpressionKind::Index(Box::new(IndexExpr { base, index })),
            span,
        )
    }

    /// A collection literal node (`{}` or `{e1, e2}`).
    pub fn collection(elements: Vec<Expression>, span: TextRange) -> Self {
        Self::new(ExpressionKind::Collection(elements), span)
    }

    /// An error placeholder produced during recovery.
    pub fn error(expected: Vec<&'static str>, span: TextRange) -> Self {
        Self::new(ExpressionKind::Error(ErrorNode { expected }), span)
    }

    /// A partially parsed node produced during recovery.
    pub fn incomplete(partial: Expression, missing: Vec<&'static str>, span: TextRange) -> Self {
        Self::new(
            ExpressionKind::Incomplete(Box::new(IncompleteExpr { partial, missing })),
            span,
        )
    }

    /// Whether this subtree contains `Error` or `Incomplete` nodes.
    pub fn has_errors(&self) -> bool {
        match &self.kind {
            ExpressionKind::Error(_) | ExpressionKind::Incomplete(_) => true,
            ExpressionKind::Literal(_)
            | ExpressionKind::Identifier(_)
            | ExpressionKind::TypeIdentifier(_)
            | ExpressionKind::Variable(_) => false,
            ExpressionKind::Binary(binary) => binary.left.has_errors() || binary.right.has_errors(),
            ExpressionKind::Unary(unary) => unary.operand.has_errors(),
            ExpressionKind::Function(call) => call.args.iter().any(Expression::has_errors),
            ExpressionKind::Index(index) => index.base.has_errors() || index.index.has_errors(),
            ExpressionKind::Collection(elements) => elements.iter().any(Expression::has_errors),
        }
    }

    /// The dotted name this node denotes, when it is a plain (possibly
    /// qualified) name. Used for type-specifier arguments like
    /// `ofType(System.Boolean)`.
    pub fn as_type_name(&self) -> Option<String> {
        match &self.kind {
            ExpressionKind::Identifier(name) | ExpressionKind::TypeIdentifier(name) => {
                Some(name.clone())
            }
            ExpressionKind::Binary(binary) if binary.op == BinaryOperator::Dot => {
                let left = binary.left.as_type_name()?;
                let right = binary.right.as_type_name()?;
                Some(format!("{left}.{right}"))
            }
            _ => None,
        }
    }
}

/// The expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Literal value
    Literal(LiteralValue),
    /// Name in property position or a lowercase top-level name
    Identifier(String),
    /// Uppercase-starting name; may denote a type in `is`/`as`/`ofType`
    TypeIdentifier(String),
    /// `$this`, `$index`, `$total` or `%name`
    Variable(Variable),
    /// Binary operation, including `.` navigation and `is`/`as`
    Binary(Box<BinaryExpr>),
    /// Unary operation
    Unary(Box<UnaryExpr>),
    /// Function or method call
    Function(Box<FunctionCall>),
    /// Index access `base[index]`
    Index(Box<IndexExpr>),
    /// Collection literal `{}` / `{e1, e2}`
    Collection(Vec<Expression>),
    /// Placeholder for unparseable input (recovery mode only)
    Error(ErrorNode),
    /// Partially parsed input (recovery mode only)
    Incomplete(Box<IncompleteExpr>),
}

/// Binary operation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: Expression,
    /// Right operand
    pub right: Expression,
}

/// Unary operation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    /// The operator
    pub op: UnaryOperator,
    /// The operand
    pub operand: Expression,
}

/// Function call payload. Calls appearing after `.` take the navigation's
/// left side as their implicit input.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Range of the name itself, for precise diagnostics
    pub name_span: TextRange,
    /// Arguments in source order
    pub args: SmallVec<[Expression; 4]>,
}

/// Index access payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    /// Collection being indexed
    pub base: Expression,
    /// Index expression, a singleton integer at runtime
    pub index: Expression,
}

/// Error placeholder payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode {
    /// Token descriptions that would have been accepted here
    pub expected: Vec<&'static str>,
}

/// Partially parsed node payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IncompleteExpr {
    /// The part that did parse
    pub partial: Expression,
    /// Descriptions of what is missing
    pub missing: Vec<&'static str>,
}

/// Variable references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Variable {
    /// `$this` - the current iteration item
    This,
    /// `$index` - the 0-based iteration position
    Index,
    /// `$total` - the `aggregate` accumulator
    Total,
    /// `%name` - an environment variable
    Environment(String),
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::This => write!(f, "$this"),
            Variable::Index => write!(f, "$index"),
            Variable::Total => write!(f, "$total"),
            Variable::Environment(name) => write!(f, "%{name}"),
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal
    Decimal(Decimal),
    /// String literal with escapes already processed
    String(String),
    /// Date literal (`@2023-05-02`)
    Date(Date),
    /// DateTime literal (`@2023-05-02T14:30:00Z`)
    DateTime(DateTime),
    /// Time literal (`@T14:30`)
    Time(Time),
    /// Quantity literal (`5 'mg'`, `2 years`)
    Quantity {
        /// Magnitude
        value: Decimal,
        /// UCUM code or calendar keyword
        unit: String,
    },
}

/// Binary operators, ordered roughly by parse frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `.` navigation / invocation
    Dot,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `~`
    Equivalent,
    /// `!~`
    NotEquivalent,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `div`
    IntegerDivide,
    /// `mod`
    Modulo,
    /// `&`
    Concatenate,
    /// `|`
    Union,
    /// `and`
    And,
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `implies`
    Implies,
    /// `in`
    In,
    /// `contains`
    Contains,
    /// `is`
    Is,
    /// `as`
    As,
}

impl BinaryOperator {
    /// The operator's source token.
    pub const fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Dot => ".",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Equivalent => "~",
            BinaryOperator::NotEquivalent => "!~",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntegerDivide => "div",
            BinaryOperator::Modulo => "mod",
            BinaryOperator::Concatenate => "&",
            BinaryOperator::Union => "|",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::Xor => "xor",
            BinaryOperator::Implies => "implies",
            BinaryOperator::In => "in",
            BinaryOperator::Contains => "contains",
            BinaryOperator::Is => "is",
            BinaryOperator::As => "as",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary (prefix) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `not`
    Not,
}

impl UnaryOperator {
    /// The operator's source token.
    pub const fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "not",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> TextRange {
        TextRange::new(start, end)
    }

    #[test]
    fn binary_span_covers_operands() {
        let left = Expression::literal(LiteralValue::Integer(1), span(0, 1));
        let right = Expression::literal(LiteralValue::Integer(2), span(4, 5));
        let node = Expression::binary(BinaryOperator::Add, left, right);
        assert_eq!(node.span, span(0, 5));
    }

    #[test]
    fn qualified_type_names_flatten() {
        let left = Expression::type_identifier("System", span(0, 6));
        let right = Expression::type_identifier("Boolean", span(7, 14));
        let node = Expression::binary(BinaryOperator::Dot, left, right);
        assert_eq!(node.as_type_name().as_deref(), Some("System.Boolean"));
    }

    #[test]
    fn error_detection_walks_the_tree() {
        let ok = Expression::identifier("name", span(0, 4));
        assert!(!ok.has_errors());
        let bad = Expression::binary(
            BinaryOperator::Add,
            Expression::identifier("name", span(0, 4)),
            Expression::error(vec!["expression"], span(7, 8)),
        );
        assert!(bad.has_errors());
    }
}
