//! `cost_mod`, `result_mod` and `evaluation_mod` handlers.
//!
//! Modifiers belong to the active player and are keyed by `id`; adding an
//! id that is already registered replaces it. Percents are fractions.

use std::collections::BTreeMap;

use super::{is_removal, register_symmetric};
use crate::core::{ActionId, EngineResult, GameContext, ResourceId};
use crate::effects::{Effect, EffectRegistry};
use crate::passives::{CostModifier, EvaluationModifier, ResultModifier};

pub(super) fn register(registry: &mut EffectRegistry) {
    register_symmetric(registry, "cost_mod", cost);
    register_symmetric(registry, "result_mod", result);
    register_symmetric(registry, "evaluation_mod", evaluation);
}

fn action_filter(effect: &Effect, label: &str) -> EngineResult<Option<ActionId>> {
    Ok(effect.params.optional_str(label, "action")?.map(ActionId::new))
}

fn cost(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let id = effect.params.require_str(&label, "id")?.to_string();
    let owner = ctx.active_player();
    if is_removal(effect) {
        ctx.passives_mut().modifiers_mut().remove_cost(&id, owner);
        return Ok(());
    }

    let key = ResourceId::new(effect.params.require_str(&label, "key")?);
    let mut flat = BTreeMap::new();
    if let Some(amount) = effect.params.optional_number(&label, "amount")? {
        flat.insert(key.clone(), amount * multiplier);
    }
    let mut percent = BTreeMap::new();
    if let Some(fraction) = effect.params.optional_number(&label, "percent")? {
        percent.insert(key, fraction * multiplier);
    }
    let modifier = CostModifier {
        id,
        owner,
        action: action_filter(effect, &label)?,
        flat,
        percent,
    };
    ctx.passives_mut().modifiers_mut().register_cost(modifier);
    Ok(())
}

/// The nested effects run after each matching action.
fn result(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let id = effect.params.require_str(&label, "id")?.to_string();
    let owner = ctx.active_player();
    if is_removal(effect) {
        ctx.passives_mut().modifiers_mut().remove_result(&id, owner);
        return Ok(());
    }

    let modifier = ResultModifier {
        id,
        owner,
        action: action_filter(effect, &label)?,
        effects: effect.effects.clone(),
    };
    ctx.passives_mut().modifiers_mut().register_result(modifier);
    Ok(())
}

/// With `key`, the percent only applies to gains of that resource.
fn evaluation(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let id = effect.params.require_str(&label, "id")?.to_string();
    let owner = ctx.active_player();
    if is_removal(effect) {
        ctx.passives_mut().modifiers_mut().remove_evaluation(&id, owner);
        return Ok(());
    }

    let target = effect.params.require_str(&label, "target")?.to_string();
    let percent = effect.params.require_number(&label, "percent")? * multiplier;
    let modifier = match effect.params.optional_str(&label, "key")? {
        Some(key) => EvaluationModifier {
            id,
            owner,
            target,
            percent: 0.0,
            per_resource: BTreeMap::from([(ResourceId::new(key), percent)]),
        },
        None => EvaluationModifier {
            id,
            owner,
            target,
            percent,
            per_resource: BTreeMap::new(),
        },
    };
    ctx.passives_mut().modifiers_mut().register_evaluation(modifier);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::{EngineConfig, EngineError, GameContext, PlayerId, ResourceId};
    use crate::effects::{execute_effects, Effect, Method};
    use std::collections::BTreeMap;

    fn context() -> GameContext {
        GameContext::new(EngineConfig::new(2)).unwrap()
    }

    #[test]
    fn test_cost_mod_add_remove() {
        let mut ctx = context();
        let discount = Effect::new("cost_mod", Method::Add)
            .with_param("id", "guild")
            .with_param("key", "gold")
            .with_param("amount", -1)
            .with_param("action", "build");
        execute_effects(&[discount.clone()], &mut ctx, 1.0).unwrap();

        let mut costs = BTreeMap::from([(ResourceId::new("gold"), 4.0)]);
        ctx.passives().modifiers().apply_cost(PlayerId::new(0), "build", &mut costs);
        assert_eq!(costs[&ResourceId::new("gold")], 3.0);

        execute_effects(&[discount.inverted()], &mut ctx, 1.0).unwrap();
        assert_eq!(ctx.passives().modifiers().cost_modifiers().count(), 0);
    }

    #[test]
    fn test_result_mod_keeps_nested_effects() {
        let mut ctx = context();
        let bonus = Effect::new("result_mod", Method::Add)
            .with_param("id", "tithe")
            .with_param("action", "tax")
            .with_effects(vec![Effect::new("resource", Method::Add)
                .with_param("key", "gold")
                .with_param("amount", 1)]);
        execute_effects(&[bonus], &mut ctx, 1.0).unwrap();

        let effects = ctx.passives().modifiers().result_effects(PlayerId::new(0), "tax");
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].len(), 1);
        assert!(ctx.passives().modifiers().result_effects(PlayerId::new(1), "tax").is_empty());
    }

    #[test]
    fn test_evaluation_mod_per_resource() {
        let mut ctx = context();
        let boost = Effect::new("evaluation_mod", Method::Add)
            .with_param("id", "mill")
            .with_param("target", "development:farm")
            .with_param("key", "gold")
            .with_param("percent", 0.5);
        execute_effects(&[boost], &mut ctx, 1.0).unwrap();

        let modifiers = ctx.passives().modifiers();
        let owner = PlayerId::new(0);
        assert_eq!(modifiers.evaluation_percent(owner, "development:farm", "gold"), 0.5);
        assert_eq!(modifiers.evaluation_percent(owner, "development:farm", "food"), 0.0);
    }

    #[test]
    fn test_missing_id() {
        let mut ctx = context();
        let effect = Effect::new("cost_mod", Method::Add).with_param("key", "gold");
        let result = execute_effects(&[effect], &mut ctx, 1.0);
        assert!(matches!(result, Err(EngineError::MissingParam { .. })));
    }
}
