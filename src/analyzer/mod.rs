//! Static type analyzer
//!
//! A single post-order walk threads an `(input type, is_singleton)` pair
//! through the AST, consults the registry for signatures and analyze
//! hooks, resolves model types through the model provider, and annotates
//! every node in place. Type errors never abort analysis: they become
//! diagnostics (errors in strict mode, warnings in lenient mode) and the
//! walk continues with `Any`. Structural problems (unknown function,
//! unknown operator) are error diagnostics in either mode.

use crate::ast::{BinaryOperator, Expression, ExpressionKind, Variable};
use crate::diagnostics::{Diagnostic, DiagnosticCode, Severity};
use crate::model::provider::ModelProvider;
use crate::model::types::{AnalysisType, SystemType, TypeAnnotation};
use crate::registry::{
    AnalyzeContext, OperationDef, OperationKind, ParameterKind, registry,
};
use crate::span::TextRange;
use rustc_hash::FxHashMap;

/// How type mismatches are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Type mismatches are errors
    Strict,
    /// Type mismatches are warnings; analysis continues with `Any`
    #[default]
    Lenient,
}

/// Analyzer configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOptions {
    /// Strict or lenient mismatch reporting
    pub mode: AnalysisMode,
    /// Declared types for user-supplied `%name` environment variables
    pub variables: FxHashMap<String, TypeAnnotation>,
}

/// Outcome of an analysis.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The AST with every node annotated
    pub ast: Expression,
    /// Type and structural diagnostics
    pub diagnostics: Vec<Diagnostic>,
    /// Inferred type of the whole expression
    pub result_type: Option<AnalysisType>,
    /// Inferred cardinality of the whole expression
    pub result_is_singleton: Option<bool>,
}

/// Analyze with an unknown input type.
pub fn analyze(
    ast: Expression,
    provider: &dyn ModelProvider,
    options: AnalyzerOptions,
) -> AnalysisResult {
    analyze_with_input(ast, provider, options, TypeAnnotation::any_singleton())
}

/// Analyze against a known input type and cardinality.
pub fn analyze_with_input(
    mut ast: Expression,
    provider: &dyn ModelProvider,
    options: AnalyzerOptions,
    input: TypeAnnotation,
) -> AnalysisResult {
    let mut analyzer = Analyzer {
        provider,
        strict: options.mode == AnalysisMode::Strict,
        variables: &options.variables,
        diagnostics: Vec::new(),
        root: input.clone(),
        frames: vec![Frame {
            this: input.clone(),
            total: None,
        }],
    };
    let annotation = analyzer.analyze_node(&mut ast, &input);
    AnalysisResult {
        ast,
        diagnostics: analyzer.diagnostics,
        result_type: Some(annotation.ty),
        result_is_singleton: Some(annotation.singleton),
    }
}

struct Frame {
    this: TypeAnnotation,
    total: Option<TypeAnnotation>,
}

struct Analyzer<'a> {
    provider: &'a dyn ModelProvider,
    strict: bool,
    variables: &'a FxHashMap<String, TypeAnnotation>,
    diagnostics: Vec<Diagnostic>,
    root: TypeAnnotation,
    frames: Vec<Frame>,
}

impl Analyzer<'_> {
    fn mismatch_severity(&self) -> Severity {
        if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        }
    }

    fn report(&mut self, severity: Severity, code: DiagnosticCode, message: String, range: TextRange) {
        self.diagnostics.push(Diagnostic {
            severity,
            code,
            message,
            range,
        });
    }

    fn analyze_node(&mut self, node: &mut Expression, input: &TypeAnnotation) -> TypeAnnotation {
        let span = node.span;
        let annotation = match &mut node.kind {
            ExpressionKind::Literal(literal) => {
                let entry = registry().literal(literal);
                entry.signature.output_annotation(input, &[])
            }

            ExpressionKind::Identifier(name) => self.analyze_identifier(name, input, span),

            ExpressionKind::TypeIdentifier(name) => {
                match self.resolve_type_name(name) {
                    // A type filter keeps matching elements
                    Some(ty) => TypeAnnotation {
                        ty,
                        singleton: input.singleton,
                    },
                    // Unresolvable names still filter by resource type at
                    // runtime; the result type stays open
                    None => TypeAnnotation {
                        ty: AnalysisType::Any,
                        singleton: input.singleton,
                    },
                }
            }

            ExpressionKind::Variable(variable) => self.analyze_variable(variable, span),

            ExpressionKind::Binary(binary) if binary.op == BinaryOperator::Dot => {
                let left = self.analyze_node(&mut binary.left, input);
                match &binary.right.kind {
                    // In property position an uppercase name navigates
                    ExpressionKind::TypeIdentifier(name) => {
                        let name = name.clone();
                        let span = binary.right.span;
                        let annotation = self.analyze_identifier(&name, &left, span);
                        self.finish(&mut binary.right, annotation)
                    }
                    _ => self.analyze_node(&mut binary.right, &left),
                }
            }

            ExpressionKind::Binary(binary) => {
                let op = binary.op;
                match registry().binary(op) {
                    Some(entry) => {
                        let annotations = if matches!(op, BinaryOperator::Is | BinaryOperator::As) {
                            let left = self.analyze_node(&mut binary.left, input);
                            let right = self.analyze_type_specifier(&mut binary.right);
                            vec![left, right]
                        } else {
                            vec![
                                self.analyze_node(&mut binary.left, input),
                                self.analyze_node(&mut binary.right, input),
                            ]
                        };
                        let spans = vec![binary.left.span, binary.right.span];
                        self.dispatch(entry, input, &annotations, &spans, span)
                    }
                    None => {
                        self.report(
                            Severity::Error,
                            DiagnosticCode::UnknownOperator,
                            format!("unknown operator '{}'", op.symbol()),
                            span,
                        );
                        TypeAnnotation::any()
                    }
                }
            }

            ExpressionKind::Unary(unary) => {
                let op = unary.op;
                match registry().unary(op) {
                    Some(entry) => {
                        let annotations = vec![self.analyze_node(&mut unary.operand, input)];
                        let spans = vec![unary.operand.span];
                        self.dispatch(entry, input, &annotations, &spans, span)
                    }
                    None => {
                        self.report(
                            Severity::Error,
                            DiagnosticCode::UnknownOperator,
                            format!("unknown operator '{}'", op.symbol()),
                            span,
                        );
                        TypeAnnotation::any()
                    }
                }
            }

            ExpressionKind::Function(call) => match registry().function(&call.name) {
                None => {
                    self.report(
                        Severity::Error,
                        DiagnosticCode::UnknownFunction,
                        format!("unknown function '{}'", call.name),
                        call.name_span,
                    );
                    for arg in call.args.iter_mut() {
                        self.analyze_node(arg, &TypeAnnotation::any());
                    }
                    TypeAnnotation::any()
                }
                Some(entry) => {
                    if !entry.signature.accepts_arg_count(call.args.len()) {
                        self.report(
                            Severity::Error,
                            DiagnosticCode::InvalidArgCount,
                            format!(
                                "{} expects {} arguments, found {}",
                                entry.name,
                                entry.signature.arity_description(),
                                call.args.len()
                            ),
                            span,
                        );
                    }

                    let mut annotations = Vec::with_capacity(call.args.len());
                    let mut spans = Vec::with_capacity(call.args.len());
                    let element = TypeAnnotation {
                        ty: input.ty.clone(),
                        singleton: true,
                    };
                    for (index, arg) in call.args.iter_mut().enumerate() {
                        let kind = entry
                            .signature
                            .parameters
                            .get(index)
                            .map(|parameter| parameter.kind)
                            .unwrap_or(ParameterKind::Value);
                        let annotation = match kind {
                            ParameterKind::Value => self.analyze_node(arg, input),
                            ParameterKind::Expression => {
                                self.frames.push(Frame {
                                    this: element.clone(),
                                    total: Some(TypeAnnotation::any()),
                                });
                                let annotation = self.analyze_node(arg, &element);
                                self.frames.pop();
                                annotation
                            }
                            ParameterKind::TypeSpecifier => self.analyze_type_specifier(arg),
                        };
                        spans.push(arg.span);
                        annotations.push(annotation);
                    }

                    self.dispatch(entry, input, &annotations, &spans, span)
                }
            },

            ExpressionKind::Index(index) => {
                let base = self.analyze_node(&mut index.base, input);
                let position = self.analyze_node(&mut index.index, input);
                if !matches!(
                    position.ty,
                    AnalysisType::Any | AnalysisType::System(SystemType::Integer)
                ) {
                    self.report(
                        self.mismatch_severity(),
                        DiagnosticCode::TypeMismatch,
                        format!("index must be an Integer, found {}", position.ty),
                        index.index.span,
                    );
                }
                TypeAnnotation {
                    ty: base.ty,
                    singleton: true,
                }
            }

            ExpressionKind::Collection(elements) => {
                let mut element_type: Option<AnalysisType> = None;
                for element in elements.iter_mut() {
                    let annotation = self.analyze_node(element, input);
                    element_type = Some(match element_type {
                        None => annotation.ty,
                        Some(previous) if previous == annotation.ty => previous,
                        Some(_) => AnalysisType::Any,
                    });
                }
                TypeAnnotation::collection(element_type.unwrap_or(AnalysisType::Any))
            }

            ExpressionKind::Error(_) => TypeAnnotation::any(),

            ExpressionKind::Incomplete(incomplete) => {
                self.analyze_node(&mut incomplete.partial, input);
                TypeAnnotation::any()
            }
        };
        self.finish(node, annotation)
    }

    fn finish(&mut self, node: &mut Expression, annotation: TypeAnnotation) -> TypeAnnotation {
        node.annotation = Some(annotation.clone());
        annotation
    }

    fn analyze_identifier(
        &mut self,
        name: &str,
        input: &TypeAnnotation,
        span: TextRange,
    ) -> TypeAnnotation {
        match &input.ty {
            AnalysisType::Any => {
                // With no input type a name may still denote a model type
                match self.provider.resolve_type(name) {
                    Some(type_ref) => TypeAnnotation {
                        ty: AnalysisType::Model(type_ref),
                        singleton: input.singleton,
                    },
                    None => TypeAnnotation::any(),
                }
            }
            AnalysisType::System(system) => {
                self.report(
                    self.mismatch_severity(),
                    DiagnosticCode::UnknownProperty,
                    format!("{} values have no property '{name}'", system.name()),
                    span,
                );
                TypeAnnotation::any()
            }
            AnalysisType::Model(type_ref) => match self.provider.property_type(type_ref, name) {
                Some(info) => TypeAnnotation {
                    ty: info.ty,
                    // Navigation from a collection flattens
                    singleton: info.singleton && input.singleton,
                },
                None => {
                    self.report(
                        self.mismatch_severity(),
                        DiagnosticCode::UnknownProperty,
                        format!(
                            "type {} has no property '{name}'",
                            self.provider.type_name(type_ref)
                        ),
                        span,
                    );
                    TypeAnnotation::any()
                }
            },
        }
    }

    fn analyze_variable(&mut self, variable: &Variable, span: TextRange) -> TypeAnnotation {
        match variable {
            Variable::This => self
                .frames
                .last()
                .map(|frame| frame.this.clone())
                .unwrap_or_else(TypeAnnotation::any),
            Variable::Index => {
                TypeAnnotation::singleton(AnalysisType::System(SystemType::Integer))
            }
            Variable::Total => self
                .frames
                .last()
                .and_then(|frame| frame.total.clone())
                .unwrap_or_else(TypeAnnotation::any),
            Variable::Environment(name) => match name.as_str() {
                "context" | "resource" | "rootResource" => self.root.clone(),
                "ucum" | "sct" | "loinc" => {
                    TypeAnnotation::singleton(AnalysisType::System(SystemType::String))
                }
                _ => match self.variables.get(name) {
                    Some(annotation) => annotation.clone(),
                    None => {
                        self.report(
                            self.mismatch_severity(),
                            DiagnosticCode::UnknownVariable,
                            format!("no binding declared for %{name}"),
                            span,
                        );
                        TypeAnnotation::any()
                    }
                },
            },
        }
    }

    /// Type-specifier position: resolve the dotted name itself instead of
    /// treating the node as a navigation.
    fn analyze_type_specifier(&mut self, node: &mut Expression) -> TypeAnnotation {
        let annotation = match node.as_type_name() {
            Some(name) => match self.resolve_type_name(&name) {
                Some(ty) => TypeAnnotation::singleton(ty),
                None => {
                    self.report(
                        self.mismatch_severity(),
                        DiagnosticCode::TypeMismatch,
                        format!("unknown type '{name}'"),
                        node.span,
                    );
                    TypeAnnotation::any_singleton()
                }
            },
            None => {
                self.report(
                    Severity::Error,
                    DiagnosticCode::UnexpectedToken,
                    "expected a type name".to_string(),
                    node.span,
                );
                TypeAnnotation::any_singleton()
            }
        };
        self.finish(node, annotation)
    }

    fn resolve_type_name(&self, name: &str) -> Option<AnalysisType> {
        if let Some(system) = SystemType::parse(name) {
            return Some(AnalysisType::System(system));
        }
        let name = name.strip_prefix("FHIR.").unwrap_or(name);
        self.provider
            .resolve_type(name)
            .map(AnalysisType::Model)
    }

    fn dispatch(
        &mut self,
        entry: &'static OperationDef,
        input: &TypeAnnotation,
        operands: &[TypeAnnotation],
        operand_spans: &[TextRange],
        span: TextRange,
    ) -> TypeAnnotation {
        let ctx = AnalyzeContext {
            entry,
            input,
            operands,
            operand_spans,
            span,
            strict: self.strict,
        };
        match entry.analyze {
            Some(hook) => hook(&ctx, &mut self.diagnostics),
            None => default_analyze(&ctx, &mut self.diagnostics),
        }
    }
}

/// The default analyze hook: check operand types and cardinalities
/// against the signature, then derive the declared output.
pub fn default_analyze(
    ctx: &AnalyzeContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> TypeAnnotation {
    let severity = if ctx.strict {
        Severity::Error
    } else {
        Severity::Warning
    };
    let signature = &ctx.entry.signature;
    let mut mismatched = false;

    for (index, parameter) in signature.parameters.iter().enumerate() {
        let (Some(annotation), Some(span)) =
            (ctx.operands.get(index), ctx.operand_spans.get(index))
        else {
            break;
        };
        if parameter.kind != ParameterKind::Value {
            continue;
        }
        if !parameter.ty.accepts(&annotation.ty) {
            diagnostics.push(Diagnostic {
                severity,
                code: DiagnosticCode::TypeMismatch,
                message: format!(
                    "{} expects {} for '{}', found {}",
                    ctx.entry.name,
                    parameter.ty.name(),
                    parameter.name,
                    annotation.ty
                ),
                range: *span,
            });
            mismatched = true;
        } else if parameter.singleton && !annotation.singleton && !annotation.ty.is_any() {
            diagnostics.push(Diagnostic {
                severity,
                code: DiagnosticCode::TypeMismatch,
                message: format!(
                    "{} expects a single value for '{}'",
                    ctx.entry.name, parameter.name
                ),
                range: *span,
            });
        }
    }

    if ctx.entry.kind == OperationKind::Function {
        if !signature.input.accepts(&ctx.input.ty) {
            diagnostics.push(Diagnostic {
                severity,
                code: DiagnosticCode::TypeMismatch,
                message: format!(
                    "{} expects {} input, found {}",
                    ctx.entry.name,
                    signature.input.name(),
                    ctx.input.ty
                ),
                range: ctx.span,
            });
            mismatched = true;
        } else if signature.input_singleton && !ctx.input.singleton && !ctx.input.ty.is_any() {
            diagnostics.push(Diagnostic {
                severity,
                code: DiagnosticCode::TypeMismatch,
                message: format!("{} expects a single input value", ctx.entry.name),
                range: ctx.span,
            });
        }
    }

    if mismatched {
        TypeAnnotation::any()
    } else {
        signature.output_annotation(ctx.input, ctx.operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::provider::{NullModelProvider, PropertyInfo};
    use crate::model::types::TypeRef;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    /// A small fixed schema: Patient { name: HumanName*, active: Boolean },
    /// HumanName { use: String, given: String* }.
    struct TestProvider;

    impl ModelProvider for TestProvider {
        fn resolve_type(&self, name: &str) -> Option<TypeRef> {
            matches!(name, "Patient" | "HumanName").then(|| TypeRef::new(name))
        }

        fn property_type(&self, ty: &TypeRef, name: &str) -> Option<PropertyInfo> {
            match (ty.name(), name) {
                ("Patient", "name") => Some(PropertyInfo {
                    ty: AnalysisType::Model(TypeRef::new("HumanName")),
                    singleton: false,
                }),
                ("Patient", "active") => Some(PropertyInfo {
                    ty: AnalysisType::System(SystemType::Boolean),
                    singleton: true,
                }),
                ("HumanName", "use") => Some(PropertyInfo {
                    ty: AnalysisType::System(SystemType::String),
                    singleton: true,
                }),
                ("HumanName", "given") => Some(PropertyInfo {
                    ty: AnalysisType::System(SystemType::String),
                    singleton: false,
                }),
                _ => None,
            }
        }

        fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
            from == to
        }
    }

    fn analyze_source(source: &str) -> AnalysisResult {
        let ast = parse(source).unwrap();
        let input = TypeAnnotation::singleton(AnalysisType::Model(TypeRef::new("Patient")));
        analyze_with_input(ast, &TestProvider, AnalyzerOptions::default(), input)
    }

    #[test]
    fn navigation_threads_types_and_cardinality() {
        let result = analyze_source("name.given");
        assert_eq!(result.diagnostics, vec![]);
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::String))
        );
        assert_eq!(result.result_is_singleton, Some(false));
    }

    #[test]
    fn singleton_properties_stay_singletons() {
        let result = analyze_source("active");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Boolean))
        );
        assert_eq!(result.result_is_singleton, Some(true));
    }

    #[test]
    fn unknown_property_is_reported_and_analysis_continues() {
        let result = analyze_source("name.nickname.given");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnknownProperty);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
        assert_eq!(result.result_type, Some(AnalysisType::Any));
    }

    #[test]
    fn strict_mode_upgrades_mismatches_to_errors() {
        let ast = parse("name.nickname").unwrap();
        let input = TypeAnnotation::singleton(AnalysisType::Model(TypeRef::new("Patient")));
        let options = AnalyzerOptions {
            mode: AnalysisMode::Strict,
            ..AnalyzerOptions::default()
        };
        let result = analyze_with_input(ast, &TestProvider, options, input);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn unknown_function_is_a_structural_error() {
        let result = analyze_source("name.frobnicate()");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnknownFunction);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn argument_count_is_checked() {
        let result = analyze_source("name.where()");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::InvalidArgCount)
        );
    }

    #[test]
    fn operator_types_are_checked_against_signatures() {
        let result = analyze_source("active + 1");
        assert!(result.diagnostics.is_empty() || result.result_type.is_some());
        let result = analyze_source("name.substring(active)");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.code == DiagnosticCode::TypeMismatch)
        );
    }

    #[test]
    fn where_preserves_element_type() {
        let result = analyze_source("name.where(use = 'official')");
        match result.result_type {
            Some(AnalysisType::Model(type_ref)) => assert_eq!(type_ref.name(), "HumanName"),
            other => panic!("expected HumanName, got {other:?}"),
        }
        assert_eq!(result.result_is_singleton, Some(false));
    }

    #[test]
    fn iterator_variables_are_typed_from_the_scope() {
        let result = analyze_source("name.select($this.use)");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::String))
        );
        let result = analyze_source("name.select($index)");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Integer))
        );
    }

    #[test]
    fn literal_types_derive_from_their_kind() {
        let result = analyze_source("5 + 2.5");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Decimal))
        );
        let result = analyze_source("5 * 2");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Integer))
        );
    }

    #[test]
    fn comparisons_are_boolean_singletons() {
        let result = analyze_source("name.count() > 2");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Boolean))
        );
        assert_eq!(result.result_is_singleton, Some(true));
    }

    #[test]
    fn is_and_as_annotate_from_the_type_name() {
        let result = analyze_source("active is Boolean");
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Boolean))
        );
        let result = analyze_source("name.first() as HumanName");
        match result.result_type {
            Some(AnalysisType::Model(type_ref)) => assert_eq!(type_ref.name(), "HumanName"),
            other => panic!("expected HumanName, got {other:?}"),
        }
    }

    #[test]
    fn environment_variables_use_declared_bindings() {
        let ast = parse("%weight + 1").unwrap();
        let mut variables = FxHashMap::default();
        variables.insert(
            "weight".to_string(),
            TypeAnnotation::singleton(AnalysisType::System(SystemType::Integer)),
        );
        let options = AnalyzerOptions {
            mode: AnalysisMode::Lenient,
            variables,
        };
        let result = analyze(ast, &NullModelProvider, options);
        assert_eq!(
            result.result_type,
            Some(AnalysisType::System(SystemType::Integer))
        );

        let ast = parse("%unknown").unwrap();
        let result = analyze(ast, &NullModelProvider, AnalyzerOptions::default());
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnknownVariable);
    }

    #[test]
    fn every_node_is_annotated_after_analysis() {
        let result = analyze_source("name.where(use = 'official').given.first()");
        let mut stack = vec![&result.ast];
        while let Some(node) = stack.pop() {
            assert!(node.annotation.is_some(), "missing annotation on {node:?}");
            match &node.kind {
                ExpressionKind::Binary(b) => {
                    stack.push(&b.left);
                    stack.push(&b.right);
                }
                ExpressionKind::Unary(u) => stack.push(&u.operand),
                ExpressionKind::Function(f) => stack.extend(f.args.iter()),
                ExpressionKind::Index(i) => {
                    stack.push(&i.base);
                    stack.push(&i.index);
                }
                ExpressionKind::Collection(e) => stack.extend(e.iter()),
                ExpressionKind::Incomplete(i) => stack.push(&i.partial),
                _ => {}
            }
        }
    }
}
