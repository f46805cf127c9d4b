//! Built-in effect handlers.
//!
//! | type | methods |
//! |------|---------|
//! | `resource` | `add`, `remove`, `transfer`, `increase_upper_bound` |
//! | `stat` | `add`, `remove`, `add_pct`, `remove_pct` |
//! | `passive` | `add`, `remove` |
//! | `cost_mod`, `result_mod`, `evaluation_mod` | `add`, `remove` |
//! | `building`, `development`, `population` | `add`, `remove` |
//!
//! Every handler returns immediately when the multiplier is 0.

mod content;
mod modifier;
mod passive;
mod resource;
mod stat;

use super::effect::{Effect, Method};
use super::registry::EffectRegistry;

pub(crate) fn register_builtins(registry: &mut EffectRegistry) {
    resource::register(registry);
    stat::register(registry);
    passive::register(registry);
    modifier::register(registry);
    content::register(registry);
}

/// Register one handler for both `add` and `remove`.
fn register_symmetric(
    registry: &mut EffectRegistry,
    kind: &str,
    handler: fn(&Effect, &mut crate::core::GameContext, f64) -> crate::core::EngineResult<()>,
) {
    registry.register_handler(kind, Method::Add, handler);
    registry.register_handler(kind, Method::Remove, handler);
}

/// `1.0` for additive methods, `-1.0` for removals.
fn sign(effect: &Effect) -> f64 {
    match effect.method {
        Some(Method::Remove) => -1.0,
        _ => 1.0,
    }
}

fn is_removal(effect: &Effect) -> bool {
    matches!(effect.method, Some(Method::Remove))
}
