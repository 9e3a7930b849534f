//! String functions
//!
//! All of these require a singleton string input (a non-string singleton
//! is a coercion failure and yields empty), index and slice by characters
//! rather than bytes, and propagate empty operands. `join` is the
//! exception: it renders a whole collection.

use crate::evaluator::EvalScope;
use crate::evaluator::error::{EvalResult, EvaluationError};
use crate::model::value::{Collection, Value};
use crate::registry::functions::conversion::render;
use crate::registry::helpers::{
    boolean, integer, singleton_integer, singleton_string, string, string_input,
};
use crate::registry::signature::{OutputCardinality, Parameter, ReturnType, Signature};
use crate::registry::{Invocation, OperationDef, OperationKind, ParameterType, SyntaxInfo};
use regex::Regex;

const fn string_signature(
    parameters: &'static [Parameter],
    output: ReturnType,
    cardinality: OutputCardinality,
) -> Signature {
    Signature {
        input: ParameterType::String,
        input_singleton: true,
        parameters,
        output,
        cardinality,
        propagates_empty: true,
        deterministic: true,
    }
}

pub(crate) static ENTRIES: &[OperationDef] = &[
    OperationDef {
        name: "length",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(&[], ReturnType::Integer, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_length),
    },
    OperationDef {
        name: "indexOf",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("substring", ParameterType::String)],
            ReturnType::Integer,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_index_of),
    },
    OperationDef {
        name: "substring",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[
                Parameter::value("start", ParameterType::Integer),
                Parameter::value("length", ParameterType::Integer).optional(),
            ],
            ReturnType::String,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_substring),
    },
    OperationDef {
        name: "startsWith",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("prefix", ParameterType::String)],
            ReturnType::Boolean,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_starts_with),
    },
    OperationDef {
        name: "endsWith",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("suffix", ParameterType::String)],
            ReturnType::Boolean,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_ends_with),
    },
    OperationDef {
        name: "contains",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("substring", ParameterType::String)],
            ReturnType::Boolean,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_contains),
    },
    OperationDef {
        name: "upper",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(&[], ReturnType::String, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_upper),
    },
    OperationDef {
        name: "lower",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(&[], ReturnType::String, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_lower),
    },
    OperationDef {
        name: "replace",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[
                Parameter::value("pattern", ParameterType::String),
                Parameter::value("substitution", ParameterType::String),
            ],
            ReturnType::String,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_replace),
    },
    OperationDef {
        name: "matches",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("regex", ParameterType::String)],
            ReturnType::Boolean,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_matches),
    },
    OperationDef {
        name: "replaceMatches",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[
                Parameter::value("regex", ParameterType::String),
                Parameter::value("substitution", ParameterType::String),
            ],
            ReturnType::String,
            OutputCardinality::Singleton,
        ),
        analyze: None,
        evaluate: Some(eval_replace_matches),
    },
    OperationDef {
        name: "toChars",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(&[], ReturnType::String, OutputCardinality::Collection),
        analyze: None,
        evaluate: Some(eval_to_chars),
    },
    OperationDef {
        name: "split",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(
            &[Parameter::value("separator", ParameterType::String)],
            ReturnType::String,
            OutputCardinality::Collection,
        ),
        analyze: None,
        evaluate: Some(eval_split),
    },
    OperationDef {
        name: "join",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: Signature {
            input: ParameterType::Collection,
            input_singleton: false,
            parameters: &[Parameter::value("separator", ParameterType::String).optional()],
            output: ReturnType::String,
            cardinality: OutputCardinality::Singleton,
            propagates_empty: false,
            deterministic: true,
        },
        analyze: None,
        evaluate: Some(eval_join),
    },
    OperationDef {
        name: "trim",
        kind: OperationKind::Function,
        syntax: SyntaxInfo::call(),
        signature: string_signature(&[], ReturnType::String, OutputCardinality::Singleton),
        analyze: None,
        evaluate: Some(eval_trim),
    },
];

fn eval_length(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match string_input(invocation)? {
        Some(input) => integer(input.chars().count() as i64),
        None => Collection::empty(),
    })
}

/// 0-based character index of the first occurrence, -1 when absent.
fn eval_index_of(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let (Some(input), Some(substring)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    Ok(match input.find(&substring) {
        Some(byte_pos) => integer(input[..byte_pos].chars().count() as i64),
        None => integer(-1),
    })
}

fn eval_substring(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let (Some(input), Some(start)) =
        (string_input(invocation)?, singleton_integer(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    let total = input.chars().count() as i64;
    if start < 0 || start >= total {
        return Ok(Collection::empty());
    }
    let skipped = input.chars().skip(start as usize);
    let result: String = match invocation.value_arg(1) {
        Some(_) => match singleton_integer(invocation, 1)? {
            Some(length) if length > 0 => skipped.take(length as usize).collect(),
            Some(_) => return Ok(Collection::empty()),
            None => return Ok(Collection::empty()),
        },
        None => skipped.collect(),
    };
    Ok(string(result))
}

fn eval_starts_with(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let (Some(input), Some(prefix)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    Ok(boolean(input.starts_with(&prefix)))
}

fn eval_ends_with(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let (Some(input), Some(suffix)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    Ok(boolean(input.ends_with(&suffix)))
}

fn eval_contains(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let (Some(input), Some(substring)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    Ok(boolean(input.contains(&substring)))
}

fn eval_upper(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match string_input(invocation)? {
        Some(input) => string(input.to_uppercase()),
        None => Collection::empty(),
    })
}

fn eval_lower(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match string_input(invocation)? {
        Some(input) => string(input.to_lowercase()),
        None => Collection::empty(),
    })
}

fn eval_replace(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let (Some(input), Some(pattern), Some(substitution)) = (
        string_input(invocation)?,
        singleton_string(invocation, 0)?,
        singleton_string(invocation, 1)?,
    ) else {
        return Ok(Collection::empty());
    };
    if pattern.is_empty() {
        // Surround every character with the substitution
        let mut result = substitution.clone();
        for ch in input.chars() {
            result.push(ch);
            result.push_str(&substitution);
        }
        return Ok(string(result));
    }
    Ok(string(input.replace(&pattern, &substitution)))
}

fn compile_regex(pattern: &str, invocation: &Invocation<'_>) -> EvalResult<Regex> {
    Regex::new(pattern).map_err(|error| EvaluationError::InvalidRegex {
        message: error.to_string(),
        range: invocation.span,
    })
}

fn eval_matches(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let (Some(input), Some(pattern)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    let regex = compile_regex(&pattern, invocation)?;
    Ok(boolean(regex.is_match(&input)))
}

fn eval_replace_matches(
    _scope: &mut EvalScope<'_>,
    invocation: &Invocation<'_>,
) -> EvalResult<Collection> {
    let (Some(input), Some(pattern), Some(substitution)) = (
        string_input(invocation)?,
        singleton_string(invocation, 0)?,
        singleton_string(invocation, 1)?,
    ) else {
        return Ok(Collection::empty());
    };
    let regex = compile_regex(&pattern, invocation)?;
    Ok(string(
        regex.replace_all(&input, substitution.as_str()).into_owned(),
    ))
}

fn eval_to_chars(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match string_input(invocation)? {
        Some(input) => input
            .chars()
            .map(|ch| Value::String(ch.to_string()))
            .collect(),
        None => Collection::empty(),
    })
}

fn eval_split(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let (Some(input), Some(separator)) =
        (string_input(invocation)?, singleton_string(invocation, 0)?)
    else {
        return Ok(Collection::empty());
    };
    if separator.is_empty() {
        return Ok(input
            .chars()
            .map(|ch| Value::String(ch.to_string()))
            .collect());
    }
    Ok(input
        .split(separator.as_str())
        .map(|part| Value::String(part.to_string()))
        .collect())
}

fn eval_join(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    let separator = singleton_string(invocation, 0)?.unwrap_or_default();
    let mut parts = Vec::with_capacity(invocation.input.len());
    for item in invocation.input.iter() {
        match render(item) {
            Some(part) => parts.push(part),
            None => {
                return Err(EvaluationError::InvalidArgument {
                    function: "join",
                    message: format!("cannot render a {} value", item.type_name()),
                    range: invocation.span,
                });
            }
        }
    }
    Ok(string(parts.join(&separator)))
}

fn eval_trim(_scope: &mut EvalScope<'_>, invocation: &Invocation<'_>) -> EvalResult<Collection> {
    Ok(match string_input(invocation)? {
        Some(input) => string(input.trim()),
        None => Collection::empty(),
    })
}

#[cfg(test)]
mod tests {
    use crate::evaluator::evaluate;
    use crate::model::value::{Collection, Value};
    use crate::parser::parse;

    fn run(source: &str) -> Collection {
        let ast = parse(source).unwrap();
        evaluate(&ast, Collection::empty()).unwrap().value
    }

    fn text(source: &str) -> String {
        match run(source).as_slice() {
            [Value::String(s)] => s.clone(),
            other => panic!("expected one string, got {other:?}"),
        }
    }

    #[test]
    fn length_and_index_count_characters() {
        assert_eq!(run("'héllo'.length()").as_slice(), &[Value::Integer(5)]);
        assert_eq!(run("'héllo'.indexOf('llo')").as_slice(), &[Value::Integer(2)]);
        assert_eq!(run("'abc'.indexOf('x')").as_slice(), &[Value::Integer(-1)]);
    }

    #[test]
    fn substring_slices_by_characters() {
        assert_eq!(text("'hello'.substring(1)"), "ello");
        assert_eq!(text("'hello'.substring(1, 3)"), "ell");
        assert!(run("'hello'.substring(9)").is_empty());
        assert!(run("'hello'.substring(-1)").is_empty());
    }

    #[test]
    fn affix_checks() {
        assert_eq!(
            run("'hello'.startsWith('he')").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(
            run("'hello'.endsWith('lo')").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(
            run("'hello'.contains('ll')").as_slice(),
            &[Value::Boolean(true)]
        );
    }

    #[test]
    fn case_mapping_and_trim() {
        assert_eq!(text("'Ab'.upper()"), "AB");
        assert_eq!(text("'Ab'.lower()"), "ab");
        assert_eq!(text("'  x  '.trim()"), "x");
    }

    #[test]
    fn replace_literal_patterns() {
        assert_eq!(text("'aaa'.replace('aa', 'b')"), "ba");
        assert_eq!(text("'abc'.replace('', 'x')"), "xaxbxcx");
    }

    #[test]
    fn regex_functions() {
        assert_eq!(
            run("'hello123'.matches('[a-z]+[0-9]+')").as_slice(),
            &[Value::Boolean(true)]
        );
        assert_eq!(text("'a1b2'.replaceMatches('[0-9]', '#')"), "a#b#");
    }

    #[test]
    fn invalid_regex_is_a_typed_error() {
        let ast = parse("'x'.matches('[')").unwrap();
        assert!(evaluate(&ast, Collection::empty()).is_err());
    }

    #[test]
    fn chars_split_join() {
        assert_eq!(run("'ab'.toChars()").len(), 2);
        assert_eq!(run("'a,b,c'.split(',')").len(), 3);
        assert_eq!(text("('a' | 'b' | 'c').join(',')"), "a,b,c");
        assert_eq!(text("('a' | 'b').join()"), "ab");
    }

    #[test]
    fn non_string_input_yields_empty() {
        assert!(run("5.length()").is_empty());
        assert!(run("true.substring(0)").is_empty());
    }

    #[test]
    fn empty_arguments_propagate() {
        assert!(run("'abc'.indexOf({})").is_empty());
        assert!(run("'abc'.replace({}, 'x')").is_empty());
    }
}
