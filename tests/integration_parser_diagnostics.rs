//! Parser diagnostic mode: recovery, partial ASTs, stable codes, ranges

use fhirpath_engine::ast::{Expression, ExpressionKind};
use fhirpath_engine::{
    Collection, DiagnosticCode, ParserOptions, evaluate, parse, parse_with_options,
};

fn diagnostic_mode() -> ParserOptions {
    ParserOptions {
        error_recovery: true,
        track_ranges: true,
        ..ParserOptions::default()
    }
}

fn walk(ast: &Expression, visit: &mut impl FnMut(&Expression)) {
    visit(ast);
    match &ast.kind {
        ExpressionKind::Binary(b) => {
            walk(&b.left, visit);
            walk(&b.right, visit);
        }
        ExpressionKind::Unary(u) => walk(&u.operand, visit),
        ExpressionKind::Function(f) => f.args.iter().for_each(|arg| walk(arg, visit)),
        ExpressionKind::Index(i) => {
            walk(&i.base, visit);
            walk(&i.index, visit);
        }
        ExpressionKind::Collection(elements) => elements.iter().for_each(|e| walk(e, visit)),
        ExpressionKind::Incomplete(i) => walk(&i.partial, visit),
        _ => {}
    }
}

#[test]
fn unterminated_comment_fails_fast_with_a_stable_code() {
    let error = parse("2 + 2 /* unterminated").unwrap_err();
    assert_eq!(error.code(), DiagnosticCode::UnclosedComment);
    assert_eq!(error.code().as_str(), "UNCLOSED_COMMENT");
    assert!(!error.range().is_empty());
}

#[test]
fn unterminated_comment_recovers_to_an_empty_evaluation() {
    let result = parse_with_options("2 + 2 /* unterminated", diagnostic_mode());
    assert!(result.is_partial);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UnclosedComment)
    );
    let ast = result.ast.expect("recovery keeps an AST");
    let outcome = evaluate(&ast, Collection::empty()).unwrap();
    assert!(outcome.value.is_empty());
}

#[test]
fn broken_inputs_always_produce_diagnostics_and_partial_asts() {
    let broken = [
        "1 + ",
        "name.",
        "name.where(",
        "f(,)",
        "(a",
        "a and ) b",
        "{1, , 2}",
        "a.b..c",
        "'unclosed",
        "% ",
        "$oops",
    ];
    for source in broken {
        let result = parse_with_options(source, diagnostic_mode());
        assert!(
            !result.diagnostics.is_empty(),
            "{source:?} produced no diagnostics"
        );
        assert!(result.is_partial, "{source:?} was not marked partial");
        let ast = result.ast.expect("recovery keeps an AST");
        walk(&ast, &mut |node| {
            if matches!(node.kind, ExpressionKind::Error(_)) {
                assert!(
                    !node.span.is_empty(),
                    "{source:?} produced an error node with an empty range"
                );
            }
        });
    }
}

#[test]
fn recovered_asts_evaluate_to_empty_without_raising() {
    for source in ["1 + ", "name.where(", "{1, , 2} "] {
        let result = parse_with_options(source, diagnostic_mode());
        let ast = result.ast.expect("ast");
        let outcome = evaluate(&ast, Collection::empty());
        assert!(outcome.is_ok(), "{source:?} raised {outcome:?}");
    }
}

#[test]
fn recovery_resumes_at_sync_points() {
    // The bad argument is isolated; the second argument still parses
    let result = parse_with_options("substring(1 +, 3)", diagnostic_mode());
    let ast = result.ast.expect("ast");
    let mut calls = 0;
    walk(&ast, &mut |node| {
        if let ExpressionKind::Function(call) = &node.kind {
            calls += 1;
            assert_eq!(call.args.len(), 2);
        }
    });
    assert_eq!(calls, 1);
}

#[test]
fn successful_parses_have_no_recovery_artifacts() {
    let sources = [
        "name.where(use = 'official').given",
        "(1 | 2).select($this * 2)",
        "value is System.Boolean",
        "2.5 'mg' + 1 'mg'",
        "@2023-05-02T14:30:00Z > @2023-05-02T13:30:00Z",
    ];
    for source in sources {
        let result = parse_with_options(source, diagnostic_mode());
        assert!(result.diagnostics.is_empty(), "{source:?}");
        assert!(!result.is_partial, "{source:?}");
        let ast = result.ast.expect("ast");
        walk(&ast, &mut |node| {
            assert!(
                !matches!(
                    node.kind,
                    ExpressionKind::Error(_) | ExpressionKind::Incomplete(_)
                ),
                "{source:?} contains recovery nodes"
            );
        });
    }
}

#[test]
fn node_ranges_nest_inside_their_parents() {
    let source = "name.where(use = 'official').given | telecom.value";
    let result = parse_with_options(source, diagnostic_mode());
    let ast = result.ast.expect("ast");
    fn check(node: &Expression, source: &str) {
        assert!(node.span.start <= node.span.end);
        assert!(node.span.end <= source.len());
        let children: Vec<&Expression> = match &node.kind {
            ExpressionKind::Binary(b) => vec![&b.left, &b.right],
            ExpressionKind::Unary(u) => vec![&u.operand],
            ExpressionKind::Function(f) => f.args.iter().collect(),
            ExpressionKind::Index(i) => vec![&i.base, &i.index],
            ExpressionKind::Collection(e) => e.iter().collect(),
            ExpressionKind::Incomplete(i) => vec![&i.partial],
            _ => vec![],
        };
        for child in children {
            assert!(
                node.span.start <= child.span.start && child.span.end <= node.span.end,
                "child {:?} escapes parent {:?}",
                child.span,
                node.span
            );
            check(child, source);
        }
    }
    check(&ast, source);
}

#[test]
fn max_errors_bounds_the_diagnostic_list() {
    let options = ParserOptions {
        error_recovery: true,
        max_errors: 2,
        ..ParserOptions::default()
    };
    let result = parse_with_options("f(#, #, #, #, #, #)", options);
    assert!(result.diagnostics.len() <= 2);
    assert!(result.is_partial);
}

#[test]
fn fail_fast_and_recovery_agree_on_the_first_fault() {
    for source in ["1 + ", "name.where(", "2 + 2 /* oops"] {
        let error = parse(source).unwrap_err();
        let result = parse_with_options(source, diagnostic_mode());
        assert_eq!(
            error.code(),
            result.diagnostics[0].code,
            "{source:?} disagrees on the first diagnostic"
        );
    }
}
