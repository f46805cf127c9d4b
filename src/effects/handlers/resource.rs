//! `resource:*` handlers.

use serde_json::Value;

use super::{register_symmetric, sign};
use crate::core::numeric::to_integer;
use crate::core::{EngineError, EngineResult, GameContext, ResourceId};
use crate::effects::{Effect, EffectRegistry};
use crate::ledger::{
    apply_value_change, increase_upper_bound, transfer, ChangeSpec, HookSuppression, ValueChange,
};

pub(super) fn register(registry: &mut EffectRegistry) {
    register_symmetric(registry, "resource", change);
    registry.register_handler("resource", "transfer", transfer_handler);
    registry.register_handler("resource", "increase_upper_bound", raise_bound);
}

/// `amount` or `percent`, scaled by the multiplier.
fn change_spec(effect: &Effect, multiplier: f64) -> EngineResult<ChangeSpec> {
    let label = effect.label();
    if let Some(percent) = effect.params.optional_number(&label, "percent")? {
        return Ok(ChangeSpec::Percent(percent * multiplier));
    }
    let amount = effect.params.require_number(&label, "amount")?;
    Ok(ChangeSpec::Amount(amount * multiplier))
}

fn suppression(effect: &Effect) -> EngineResult<Option<HookSuppression>> {
    match effect.params.get("suppress_hooks") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(HookSuppression::default())),
        Some(_) => effect
            .params
            .decode(&effect.label(), "suppress_hooks", "a bool or { note }"),
    }
}

fn change(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let key = ResourceId::new(effect.params.require_str(&label, "key")?);
    if let Some(mode) = effect.params.optional_str(&label, "reconciliation")? {
        if mode != "clamp" {
            return Err(EngineError::InvalidParam {
                effect: label,
                param: "reconciliation".into(),
                expected: "clamp",
            });
        }
    }

    let sign = sign(effect);
    let spec = match change_spec(effect, multiplier)? {
        ChangeSpec::Amount(amount) => ChangeSpec::Amount(amount * sign),
        ChangeSpec::Percent(percent) => ChangeSpec::Percent(percent * sign),
    };
    let change = ValueChange {
        spec,
        rounding: effect.round,
        suppress_hooks: suppression(effect)?,
        ..ValueChange::amount(0.0)
    };
    let player = ctx.active_player();
    apply_value_change(ctx, player, &key, &change)?;
    Ok(())
}

/// Moves from the active player's opponent to the active player.
fn transfer_handler(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let key = ResourceId::new(effect.params.require_str(&effect.label(), "key")?);
    let recipient = ctx.active_player();
    let donor = ctx.opponent_of(recipient);
    let spec = change_spec(effect, multiplier)?;
    transfer(ctx, donor, recipient, &key, spec, effect.round)?;
    Ok(())
}

fn raise_bound(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let key = ResourceId::new(effect.params.require_str(&label, "key")?);
    let amount = effect.params.require_number(&label, "amount")? * multiplier;
    let amount = to_integer(amount, || format!("{label} amount"))?;
    let player = ctx.active_player();
    increase_upper_bound(ctx, player, &key, amount)
}

#[cfg(test)]
mod tests {
    use crate::core::numeric::RoundingMode;
    use crate::core::{EngineConfig, EngineError, GameContext, PlayerId};
    use crate::effects::{execute_effects, Effect, Method};
    use crate::ledger::{Bounds, ResourceDefinition, ResourceRegistry};

    fn context() -> GameContext {
        let registry = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .resource(ResourceDefinition::new("castle").with_bounds(Bounds::range(0, 10)))
            .build()
            .unwrap();
        GameContext::new(EngineConfig::new(2).with_resources(registry)).unwrap()
    }

    fn gold(ctx: &GameContext, player: u8) -> i64 {
        ctx.player(PlayerId::new(player)).resources().amount("gold")
    }

    #[test]
    fn test_add_and_remove() {
        let mut ctx = context();
        let add = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 3);
        execute_effects(&[add.clone()], &mut ctx, 2.0).unwrap();
        assert_eq!(gold(&ctx, 0), 6);

        execute_effects(&[add.inverted()], &mut ctx, 1.0).unwrap();
        assert_eq!(gold(&ctx, 0), 3);
    }

    #[test]
    fn test_zero_multiplier_is_noop() {
        let mut ctx = context();
        let add = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 3);
        execute_effects(&[add], &mut ctx, 0.0).unwrap();
        assert_eq!(gold(&ctx, 0), 0);
        assert!(!ctx.player(PlayerId::new(0)).resources().is_touched("gold"));
    }

    #[test]
    fn test_percent_uses_effect_round() {
        let mut ctx = context();
        let seed = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 21);
        let pct = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("percent", 10)
            .with_round(RoundingMode::Up);
        execute_effects(&[seed], &mut ctx, 1.0).unwrap();
        execute_effects(&[pct], &mut ctx, 2.0).unwrap();
        assert_eq!(gold(&ctx, 0), 26);
    }

    #[test]
    fn test_bad_reconciliation() {
        let mut ctx = context();
        let add = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 1)
            .with_param("reconciliation", "reject");
        let result = execute_effects(&[add], &mut ctx, 1.0);
        assert!(matches!(result, Err(EngineError::InvalidParam { .. })));
    }

    #[test]
    fn test_transfer_from_opponent() {
        let mut ctx = context();
        let seed = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 5);
        {
            let mut scope = crate::core::ActivePlayerScope::new(&mut ctx, PlayerId::new(1));
            execute_effects(&[seed], &mut scope, 1.0).unwrap();
        }
        let steal = Effect::new("resource", "transfer")
            .with_param("key", "gold")
            .with_param("amount", 3);
        execute_effects(&[steal], &mut ctx, 1.0).unwrap();

        assert_eq!(gold(&ctx, 0), 3);
        assert_eq!(gold(&ctx, 1), 2);
    }

    #[test]
    fn test_increase_upper_bound_effect() {
        let mut ctx = context();
        let raise = Effect::new("resource", "increase_upper_bound")
            .with_param("key", "castle")
            .with_param("amount", 2);
        execute_effects(&[raise], &mut ctx, 2.0).unwrap();
        assert_eq!(
            ctx.player(PlayerId::new(0)).resources().bounds("castle"),
            Bounds::range(0, 14)
        );
    }
}
