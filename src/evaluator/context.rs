//! Evaluation context: variable scopes, iterator frames, trace sink
//!
//! Contexts are persistent: adding a binding returns a new context whose
//! scope cons-cell links to the parent, so child scopes share parent
//! bindings without copying and sibling branches (the two sides of `|`,
//! the arguments of a call) stay isolated by construction.

use crate::model::{Collection, Value};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Variables that can never be redefined with `defineVariable`.
pub const RESERVED_VARIABLES: &[&str] = &[
    "context",
    "resource",
    "rootResource",
    "ucum",
    "sct",
    "loinc",
    "this",
    "index",
    "total",
];

const UCUM_URL: &str = "http://unitsofmeasure.org";
const SCT_URL: &str = "http://snomed.info/sct";
const LOINC_URL: &str = "http://loinc.org";

/// Receives `trace()` output. When no sink is attached the engine falls
/// back to the `log` crate.
pub trait TraceSink {
    /// Called once per `trace(name, ...)` evaluation.
    fn trace(&self, name: &str, values: &Collection);
}

/// One variable binding in the scope chain.
#[derive(Debug)]
struct ScopeCell {
    name: String,
    value: Collection,
    parent: Option<Arc<ScopeCell>>,
}

/// Iterator variables for one nesting level of `where`/`select`/...
#[derive(Debug, Clone)]
pub struct IteratorFrame {
    /// `$this`
    pub this: Collection,
    /// `$index`, absent outside positional iteration
    pub index: Option<i64>,
    /// `$total`, present inside `aggregate`
    pub total: Option<Collection>,
}

/// The evaluation state threaded through the interpreter.
#[derive(Clone)]
pub struct EvaluationContext {
    /// Original input of the whole evaluation (`%context`)
    root: Collection,
    /// User-supplied environment variables (`%name`)
    environment: Arc<FxHashMap<String, Collection>>,
    /// Innermost `defineVariable` binding
    scope: Option<Arc<ScopeCell>>,
    /// Innermost iterator frame
    iterator: Option<Arc<IteratorFrame>>,
    /// Optional trace sink
    trace: Option<Arc<dyn TraceSink>>,
}

impl std::fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("root", &self.root)
            .field("environment", &self.environment.keys().collect::<Vec<_>>())
            .field("scope", &self.scope)
            .field("iterator", &self.iterator)
            .finish_non_exhaustive()
    }
}

impl EvaluationContext {
    /// Context for a fresh evaluation over `root`.
    pub fn new(root: Collection) -> Self {
        Self {
            root,
            environment: Arc::new(FxHashMap::default()),
            scope: None,
            iterator: None,
            trace: None,
        }
    }

    /// Attach user-supplied environment variables.
    pub fn with_environment(mut self, environment: FxHashMap<String, Collection>) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// Attach a trace sink.
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    /// The original input of the evaluation.
    pub fn root(&self) -> &Collection {
        &self.root
    }

    /// The attached trace sink, if any.
    pub fn trace_sink(&self) -> Option<&Arc<dyn TraceSink>> {
        self.trace.as_ref()
    }

    /// Whether `name` may not be bound with `defineVariable`.
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_VARIABLES.contains(&name)
    }

    /// Whether `name` is already visible in this context (user binding or
    /// environment variable).
    pub fn is_defined(&self, name: &str) -> bool {
        if self.environment.contains_key(name) {
            return true;
        }
        let mut cell = self.scope.as_deref();
        while let Some(current) = cell {
            if current.name == name {
                return true;
            }
            cell = current.parent.as_deref();
        }
        false
    }

    /// Resolve `%name`: reserved names first, then user bindings (inner
    /// shadows outer), then the environment table.
    pub fn variable(&self, name: &str) -> Option<Collection> {
        match name {
            "context" | "resource" | "rootResource" => return Some(self.root.share()),
            "ucum" => return Some(Collection::singleton(Value::String(UCUM_URL.into()))),
            "sct" => return Some(Collection::singleton(Value::String(SCT_URL.into()))),
            "loinc" => return Some(Collection::singleton(Value::String(LOINC_URL.into()))),
            _ => {}
        }
        let mut cell = self.scope.as_deref();
        while let Some(current) = cell {
            if current.name == name {
                return Some(current.value.share());
            }
            cell = current.parent.as_deref();
        }
        self.environment.get(name).map(Collection::share)
    }

    /// A child context with one more binding. The receiver is unchanged.
    pub fn define(&self, name: impl Into<String>, value: Collection) -> Self {
        let mut child = self.clone();
        child.scope = Some(Arc::new(ScopeCell {
            name: name.into(),
            value,
            parent: self.scope.clone(),
        }));
        child
    }

    /// A child context whose iterator frame shadows the parent's.
    pub fn with_iterator(&self, frame: IteratorFrame) -> Self {
        let mut child = self.clone();
        child.iterator = Some(Arc::new(frame));
        child
    }

    /// The innermost iterator frame.
    pub fn iterator(&self) -> Option<&IteratorFrame> {
        self.iterator.as_deref()
    }

    /// `$this` of the innermost iterator frame.
    pub fn this(&self) -> Option<&Collection> {
        self.iterator.as_deref().map(|frame| &frame.this)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: i64) -> Collection {
        Collection::singleton(Value::Integer(n))
    }

    #[test]
    fn bindings_shadow_without_mutating_parent() {
        let parent = EvaluationContext::new(Collection::empty());
        let child = parent.define("v", item(1));
        let grandchild = child.define("v", item(2));

        assert!(parent.variable("v").is_none());
        assert_eq!(child.variable("v"), Some(item(1)));
        assert_eq!(grandchild.variable("v"), Some(item(2)));
    }

    #[test]
    fn sibling_scopes_are_isolated() {
        let parent = EvaluationContext::new(Collection::empty());
        let left = parent.define("a", item(1));
        let right = parent.define("b", item(2));

        assert!(left.variable("b").is_none());
        assert!(right.variable("a").is_none());
    }

    #[test]
    fn reserved_variables_resolve_and_refuse_redefinition() {
        let ctx = EvaluationContext::new(item(7));
        assert_eq!(ctx.variable("context"), Some(item(7)));
        assert!(ctx.variable("ucum").is_some());
        assert!(EvaluationContext::is_reserved("rootResource"));
        assert!(!EvaluationContext::is_reserved("v1"));
    }

    #[test]
    fn environment_variables_are_visible_but_shadowable() {
        let mut environment = FxHashMap::default();
        environment.insert("weight".to_string(), item(70));
        let ctx = EvaluationContext::new(Collection::empty()).with_environment(environment);

        assert_eq!(ctx.variable("weight"), Some(item(70)));
        assert!(ctx.is_defined("weight"));
        let shadowed = ctx.define("weight", item(80));
        assert_eq!(shadowed.variable("weight"), Some(item(80)));
    }

    #[test]
    fn iterator_frames_nest() {
        let ctx = EvaluationContext::new(Collection::empty());
        let outer = ctx.with_iterator(IteratorFrame {
            this: item(1),
            index: Some(0),
            total: None,
        });
        let inner = outer.with_iterator(IteratorFrame {
            this: item(2),
            index: Some(1),
            total: None,
        });
        assert_eq!(inner.this(), Some(&item(2)));
        assert_eq!(outer.this(), Some(&item(1)));
    }
}
