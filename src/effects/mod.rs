//! Effect trees and their execution.
//!
//! - `Effect`: one node of a content-authored effect tree
//! - `EffectRegistry`: `(type, method)` handlers and evaluators
//! - `execute_effects`: walks a tree against a [`GameContext`]
//!
//! ## Shapes
//!
//! A node with an `evaluator` is *scaled*: its nested `effects` run once
//! with the evaluator's count folded into the multiplier. A node with
//! `type` and `method` is *plain* and dispatches to its handler. Anything
//! else is malformed and skipped.
//!
//! Handlers are plain closures, so content packs can register new effect
//! types next to the built-ins.
//!
//! [`GameContext`]: crate::core::GameContext

mod effect;
mod evaluators;
mod executor;
mod handlers;
mod registry;

pub use effect::{invert_all, Effect, EffectShape, EvaluatorSpec, Method, Params};
pub use executor::{execute_effect, execute_effects, validate_effects};
pub use registry::{EffectHandler, EffectRegistry, EvaluatorHandler};
