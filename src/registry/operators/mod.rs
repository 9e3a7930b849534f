//! Operator entries: arithmetic, comparison, logic, collection and type
//! operations, plus the structural entries for `.` and `[]`

pub mod arithmetic;
pub mod collection;
pub mod comparison;
pub mod logic;
pub mod type_ops;

use super::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use super::{Form, OperationDef, OperationKind, ParameterType, SyntaxInfo, precedence};

/// `.` and `[]` are implemented structurally by the parser and the
/// interpreter; the registry still owns their syntax metadata so
/// precedence and form queries cover every operator.
pub(crate) static STRUCTURAL: &[OperationDef] = &[
    OperationDef {
        name: ".",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo::infix(".", precedence::INVOCATION),
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[Parameter::collection("left"), Parameter::collection("right")],
            output: ReturnType::Any,
            cardinality: OutputCardinality::Collection,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: None,
    },
    OperationDef {
        name: "[]",
        kind: OperationKind::Operator,
        syntax: SyntaxInfo {
            form: Form::Postfix,
            token: "[",
            precedence: precedence::INVOCATION,
            associativity: super::Associativity::Left,
        },
        signature: Signature {
            input: ParameterType::Any,
            input_singleton: false,
            parameters: &[
                Parameter::collection("collection"),
                Parameter::value("index", ParameterType::Integer),
            ],
            output: ReturnType::PreserveElement,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: None,
    },
];
