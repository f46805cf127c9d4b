//! Effect handler and evaluator registry.
//!
//! Handlers are keyed by `(type, method)` and evaluators by type. The
//! registry is open: content can register handlers for new effect kinds
//! alongside the built-ins.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use super::effect::{Effect, EvaluatorSpec, Method};
use super::{evaluators, handlers};
use crate::core::{EngineError, EngineResult, GameContext};

/// Runs one plain effect. Must be a no-op when the multiplier is 0.
pub type EffectHandler = Rc<dyn Fn(&Effect, &mut GameContext, f64) -> EngineResult<()>>;

/// Computes a signed repeat count for a scaled effect group.
pub type EvaluatorHandler = Rc<dyn Fn(&EvaluatorSpec, &GameContext) -> EngineResult<f64>>;

/// Dispatch tables for effect handlers and evaluators.
#[derive(Clone, Default)]
pub struct EffectRegistry {
    handlers: FxHashMap<String, FxHashMap<Method, EffectHandler>>,
    evaluators: FxHashMap<String, EvaluatorHandler>,
}

impl EffectRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in handler and evaluator.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        handlers::register_builtins(&mut registry);
        evaluators::register_builtins(&mut registry);
        registry
    }

    // === Registration ===

    /// Register (or replace) the handler for `kind:method`.
    pub fn register_handler(
        &mut self,
        kind: impl Into<String>,
        method: impl Into<Method>,
        handler: impl Fn(&Effect, &mut GameContext, f64) -> EngineResult<()> + 'static,
    ) {
        self.handlers
            .entry(kind.into())
            .or_default()
            .insert(method.into(), Rc::new(handler));
    }

    /// Register (or replace) the evaluator for `kind`.
    pub fn register_evaluator(
        &mut self,
        kind: impl Into<String>,
        evaluator: impl Fn(&EvaluatorSpec, &GameContext) -> EngineResult<f64> + 'static,
    ) {
        self.evaluators.insert(kind.into(), Rc::new(evaluator));
    }

    // === Lookup ===

    pub fn handler(&self, kind: &str, method: &Method) -> EngineResult<EffectHandler> {
        self.handlers
            .get(kind)
            .and_then(|methods| methods.get(method))
            .cloned()
            .ok_or_else(|| EngineError::UnknownEffectHandler(format!("{kind}:{method}")))
    }

    pub fn evaluator(&self, kind: &str) -> EngineResult<EvaluatorHandler> {
        self.evaluators
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::UnknownEvaluator(kind.to_string()))
    }

    #[must_use]
    pub fn has_handler(&self, kind: &str, method: &Method) -> bool {
        self.handlers.get(kind).is_some_and(|methods| methods.contains_key(method))
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<String> = self
            .handlers
            .iter()
            .flat_map(|(kind, methods)| methods.keys().map(move |method| format!("{kind}:{method}")))
            .collect();
        handlers.sort();
        let mut evaluators: Vec<&String> = self.evaluators.keys().collect();
        evaluators.sort();
        f.debug_struct("EffectRegistry")
            .field("handlers", &handlers)
            .field("evaluators", &evaluators)
            .finish()
    }
}
