//! Operation registry: the single source of truth for operators,
//! functions and literal kinds
//!
//! Each entry couples syntax metadata (token, form, precedence,
//! associativity), a type signature, an optional analyze hook and an
//! optional evaluate hook. The parser asks the registry for precedence and
//! form, the analyzer for signatures and analyze hooks, the interpreter
//! for evaluate hooks. The table is built once at first use and read-only
//! afterwards.

pub mod functions;
pub(crate) mod helpers;
pub mod literals;
pub mod operators;
pub mod signature;

pub use signature::{
    OutputCardinality, Parameter, ParameterKind, ParameterType, ReturnType, Signature,
};

use crate::ast::{BinaryOperator, Expression, LiteralValue, UnaryOperator};
use crate::diagnostics::Diagnostic;
use crate::evaluator::{EvalResult, EvalScope};
use crate::model::types::TypeAnnotation;
use crate::model::value::Collection;
use crate::span::TextRange;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Operator precedence levels, low to high. Higher binds tighter.
pub mod precedence {
    /// `implies` (right-associative)
    pub const IMPLIES: u8 = 1;
    /// `or`, `xor`
    pub const OR: u8 = 2;
    /// `and`
    pub const AND: u8 = 3;
    /// `in`, `contains`
    pub const MEMBERSHIP: u8 = 4;
    /// `=`, `!=`, `~`, `!~`
    pub const EQUALITY: u8 = 5;
    /// `<`, `<=`, `>`, `>=`
    pub const INEQUALITY: u8 = 6;
    /// `|`
    pub const UNION: u8 = 7;
    /// `is`, `as`
    pub const TYPE_TEST: u8 = 8;
    /// `+`, `-`, `&`
    pub const ADDITIVE: u8 = 9;
    /// `*`, `/`, `div`, `mod`
    pub const MULTIPLICATIVE: u8 = 10;
    /// unary `+`, `-`, `not`
    pub const UNARY: u8 = 11;
    /// `.`, `[]`, `f(...)`
    pub const INVOCATION: u8 = 12;
}

/// What an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Symbolic or keyword operator
    Operator,
    /// Named function
    Function,
    /// Literal value kind
    Literal,
}

/// Syntactic position of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// Before its operand (`-x`, `not x`)
    Prefix,
    /// Between operands (`a + b`)
    Infix,
    /// After its operand (`a[i]`)
    Postfix,
    /// `name(args)`
    Call,
    /// Literal token
    Literal,
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

/// Syntax metadata of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxInfo {
    /// Syntactic position
    pub form: Form,
    /// Source token; empty for functions and literals
    pub token: &'static str,
    /// Binding strength (see [`precedence`]); 0 for non-operators
    pub precedence: u8,
    /// Associativity; only `implies` is right-associative
    pub associativity: Associativity,
}

impl SyntaxInfo {
    /// Syntax record for an infix operator.
    pub const fn infix(token: &'static str, precedence: u8) -> Self {
        Self {
            form: Form::Infix,
            token,
            precedence,
            associativity: Associativity::Left,
        }
    }

    /// Syntax record for a right-associative infix operator.
    pub const fn infix_right(token: &'static str, precedence: u8) -> Self {
        Self {
            form: Form::Infix,
            token,
            precedence,
            associativity: Associativity::Right,
        }
    }

    /// Syntax record for a prefix operator.
    pub const fn prefix(token: &'static str) -> Self {
        Self {
            form: Form::Prefix,
            token,
            precedence: precedence::UNARY,
            associativity: Associativity::Left,
        }
    }

    /// Syntax record for a function.
    pub const fn call() -> Self {
        Self {
            form: Form::Call,
            token: "",
            precedence: precedence::INVOCATION,
            associativity: Associativity::Left,
        }
    }

    /// Syntax record for a literal kind.
    pub const fn literal() -> Self {
        Self {
            form: Form::Literal,
            token: "",
            precedence: 0,
            associativity: Associativity::Left,
        }
    }

    /// Whether the operator token is alphabetic (keyword operator).
    pub fn is_keyword_token(&self) -> bool {
        !self.token.is_empty() && self.token.bytes().all(|b| b.is_ascii_alphabetic())
    }
}

/// Inputs to an analyze hook.
pub struct AnalyzeContext<'a> {
    /// The resolved registry entry
    pub entry: &'static OperationDef,
    /// Annotation of the input collection
    pub input: &'a TypeAnnotation,
    /// Annotations of operands/arguments, in order
    pub operands: &'a [TypeAnnotation],
    /// Spans matching `operands`
    pub operand_spans: &'a [TextRange],
    /// Span of the whole node
    pub span: TextRange,
    /// Whether type mismatches are errors (strict) or warnings (lenient)
    pub strict: bool,
}

/// Analyze hook: combine operand annotations into the node's annotation,
/// appending diagnostics as needed. `None` on an entry selects the default
/// signature-driven check.
pub type AnalyzeFn = fn(&AnalyzeContext<'_>, &mut Vec<Diagnostic>) -> TypeAnnotation;

/// A prepared argument, shaped by the matching parameter's
/// [`ParameterKind`].
pub enum Argument<'a> {
    /// Eagerly evaluated value
    Value(Collection),
    /// Deferred AST subtree
    Expression(&'a Expression),
    /// Resolved type-specifier name
    Type(String),
    /// The literal payload (literal entries only)
    Literal(&'a LiteralValue),
}

impl<'a> Argument<'a> {
    /// The evaluated value, for `Value` arguments.
    pub fn value(&self) -> Option<&Collection> {
        match self {
            Argument::Value(collection) => Some(collection),
            _ => None,
        }
    }

    /// The deferred AST, for `Expression` arguments.
    pub fn expression(&self) -> Option<&'a Expression> {
        match self {
            Argument::Expression(expression) => Some(expression),
            _ => None,
        }
    }

    /// The type name, for `Type` arguments.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Argument::Type(name) => Some(name),
            _ => None,
        }
    }
}

/// A dispatched call: input collection plus prepared arguments.
pub struct Invocation<'a> {
    /// The resolved registry entry
    pub entry: &'static OperationDef,
    /// Input collection (the focus for functions, unused for literals)
    pub input: Collection,
    /// Prepared arguments in order
    pub args: Vec<Argument<'a>>,
    /// Span of the whole node, for error ranges
    pub span: TextRange,
}

impl<'a> Invocation<'a> {
    /// The evaluated collection of the argument at `index`, when present
    /// and eager.
    pub fn value_arg(&self, index: usize) -> Option<&Collection> {
        self.args.get(index).and_then(Argument::value)
    }

    /// The deferred AST of the argument at `index`, when present.
    pub fn expression_arg(&self, index: usize) -> Option<&'a Expression> {
        self.args.get(index).and_then(Argument::expression)
    }

    /// The resolved type name of the argument at `index`, when present.
    pub fn type_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Argument::type_name)
    }
}

/// Evaluate hook: produce the operation's output collection.
pub type EvaluateFn = fn(&mut EvalScope<'_>, &Invocation<'_>) -> EvalResult<Collection>;

/// One registry entry.
pub struct OperationDef {
    /// Name: function name, operator token, or literal kind name
    pub name: &'static str,
    /// Operator, function or literal
    pub kind: OperationKind,
    /// Syntax metadata
    pub syntax: SyntaxInfo,
    /// Type signature
    pub signature: Signature,
    /// Analyze hook; `None` selects the default signature check
    pub analyze: Option<AnalyzeFn>,
    /// Evaluate hook; `None` marks operations the interpreter implements
    /// structurally (`.`, `[]`)
    pub evaluate: Option<EvaluateFn>,
}

impl std::fmt::Debug for OperationDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("syntax", &self.syntax)
            .finish_non_exhaustive()
    }
}

/// The process-wide operation table. Operators are keyed per form so a
/// token like `+` can carry distinct prefix and infix entries.
pub struct Registry {
    functions: FxHashMap<&'static str, &'static OperationDef>,
    infix: FxHashMap<&'static str, &'static OperationDef>,
    prefix: FxHashMap<&'static str, &'static OperationDef>,
    postfix: FxHashMap<&'static str, &'static OperationDef>,
    literals: Vec<&'static OperationDef>,
}

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::build);

/// Access the registry, building it on first use.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

impl Registry {
    fn build() -> Self {
        let mut functions = FxHashMap::default();
        let mut infix = FxHashMap::default();
        let mut prefix = FxHashMap::default();
        let mut postfix = FxHashMap::default();
        let mut literal_entries = Vec::new();

        let sources: &[&'static [OperationDef]] = &[
            operators::STRUCTURAL,
            operators::arithmetic::ENTRIES,
            operators::comparison::ENTRIES,
            operators::logic::ENTRIES,
            operators::collection::ENTRIES,
            operators::type_ops::ENTRIES,
            functions::existence::ENTRIES,
            functions::filtering::ENTRIES,
            functions::subsetting::ENTRIES,
            functions::combining::ENTRIES,
            functions::conversion::ENTRIES,
            functions::strings::ENTRIES,
            functions::math::ENTRIES,
            functions::navigation::ENTRIES,
            functions::utility::ENTRIES,
            literals::ENTRIES,
        ];

        for entries in sources {
            for entry in entries.iter() {
                match entry.kind {
                    OperationKind::Function => {
                        let previous = functions.insert(entry.name, entry);
                        debug_assert!(previous.is_none(), "duplicate function {}", entry.name);
                    }
                    OperationKind::Operator => {
                        let table = match entry.syntax.form {
                            Form::Infix => &mut infix,
                            Form::Prefix => &mut prefix,
                            Form::Postfix => &mut postfix,
                            Form::Call | Form::Literal => continue,
                        };
                        let previous = table.insert(entry.syntax.token, entry);
                        debug_assert!(previous.is_none(), "duplicate operator {}", entry.name);
                    }
                    OperationKind::Literal => literal_entries.push(entry),
                }
            }
        }

        Self {
            functions,
            infix,
            prefix,
            postfix,
            literals: literal_entries,
        }
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&'static OperationDef> {
        self.functions.get(name).copied()
    }

    /// Look up an operator by token and form.
    pub fn operator(&self, token: &str, form: Form) -> Option<&'static OperationDef> {
        let table = match form {
            Form::Infix => &self.infix,
            Form::Prefix => &self.prefix,
            Form::Postfix => &self.postfix,
            Form::Call | Form::Literal => return None,
        };
        table.get(token).copied()
    }

    /// The entry behind a binary operator.
    pub fn binary(&self, op: BinaryOperator) -> Option<&'static OperationDef> {
        self.operator(op.symbol(), Form::Infix)
    }

    /// The entry behind a unary operator.
    pub fn unary(&self, op: UnaryOperator) -> Option<&'static OperationDef> {
        self.operator(op.symbol(), Form::Prefix)
    }

    /// Precedence and associativity of an infix operator token.
    pub fn infix_binding(&self, op: BinaryOperator) -> Option<(u8, Associativity)> {
        self.binary(op)
            .map(|entry| (entry.syntax.precedence, entry.syntax.associativity))
    }

    /// The literal-kind entry for a literal value.
    pub fn literal(&self, value: &LiteralValue) -> &'static OperationDef {
        let name = literals::kind_name(value);
        self.literals
            .iter()
            .copied()
            .find(|entry| entry.name == name)
            .expect("every literal kind is registered")
    }

    /// Whether `name` is a reserved keyword operator token.
    pub fn is_keyword(&self, name: &str) -> bool {
        name.bytes().all(|b| b.is_ascii_alphabetic())
            && !name.is_empty()
            && (self.infix.contains_key(name) || self.prefix.contains_key(name))
    }

    /// All registered functions.
    pub fn all_functions(&self) -> impl Iterator<Item = &'static OperationDef> + '_ {
        self.functions.values().copied()
    }

    /// All operators of a given form.
    pub fn operators_by_form(&self, form: Form) -> Vec<&'static OperationDef> {
        match form {
            Form::Infix => self.infix.values().copied().collect(),
            Form::Prefix => self.prefix.values().copied().collect(),
            Form::Postfix => self.postfix.values().copied().collect(),
            Form::Call | Form::Literal => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_and_knows_core_operations() {
        let registry = registry();
        assert!(registry.function("where").is_some());
        assert!(registry.function("defineVariable").is_some());
        assert!(registry.function("nope").is_none());
        assert!(registry.operator("+", Form::Infix).is_some());
        assert!(registry.operator("+", Form::Prefix).is_some());
        assert!(registry.operator("implies", Form::Infix).is_some());
    }

    #[test]
    fn precedence_table_matches_the_language() {
        let registry = registry();
        let prec = |op| registry.infix_binding(op).unwrap().0;
        assert!(prec(BinaryOperator::Implies) < prec(BinaryOperator::Or));
        assert!(prec(BinaryOperator::Or) < prec(BinaryOperator::And));
        assert!(prec(BinaryOperator::And) < prec(BinaryOperator::In));
        assert!(prec(BinaryOperator::In) < prec(BinaryOperator::Equal));
        assert!(prec(BinaryOperator::Equal) < prec(BinaryOperator::LessThan));
        assert!(prec(BinaryOperator::LessThan) < prec(BinaryOperator::Union));
        assert!(prec(BinaryOperator::Union) < prec(BinaryOperator::Is));
        assert!(prec(BinaryOperator::Is) < prec(BinaryOperator::Add));
        assert!(prec(BinaryOperator::Add) < prec(BinaryOperator::Multiply));
    }

    #[test]
    fn implies_is_the_only_right_associative_operator() {
        let registry = registry();
        for entry in registry.operators_by_form(Form::Infix) {
            let expected = if entry.name == "implies" {
                Associativity::Right
            } else {
                Associativity::Left
            };
            assert_eq!(entry.syntax.associativity, expected, "{}", entry.name);
        }
    }

    #[test]
    fn keyword_detection_covers_keyword_operators() {
        let registry = registry();
        assert!(registry.is_keyword("and"));
        assert!(registry.is_keyword("div"));
        assert!(!registry.is_keyword("where"));
        assert!(!registry.is_keyword("+"));
    }

    #[test]
    fn every_literal_kind_resolves() {
        use rust_decimal::Decimal;
        let registry = registry();
        let entry = registry.literal(&LiteralValue::Integer(1));
        assert_eq!(entry.kind, OperationKind::Literal);
        let entry = registry.literal(&LiteralValue::Decimal(Decimal::ONE));
        assert_eq!(entry.kind, OperationKind::Literal);
    }
}
