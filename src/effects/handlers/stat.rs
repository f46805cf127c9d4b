//! `stat:*` handlers.
//!
//! Stats are floats that never drop below zero. Every applied change is
//! recorded as a contribution in the stat-source tracker, attributed by
//! the frames active at the time.
//!
//! Percent changes scale off a base value cached per
//! `(turn, phase, step, stat)`, so several percent effects in the same
//! step add up instead of compounding.

use super::{register_symmetric, sign};
use crate::core::numeric::ensure_finite;
use crate::core::{EngineResult, GameContext, StatKey};
use crate::effects::{Effect, EffectRegistry};

pub(super) fn register(registry: &mut EffectRegistry) {
    register_symmetric(registry, "stat", change);
    registry.register_handler("stat", "add_pct", |effect, ctx, multiplier| {
        percent_change(effect, ctx, multiplier, 1.0)
    });
    registry.register_handler("stat", "remove_pct", |effect, ctx, multiplier| {
        percent_change(effect, ctx, multiplier, -1.0)
    });
}

fn change(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let key = StatKey::new(effect.params.require_str(&label, "key")?);
    let amount = effect.params.require_number(&label, "amount")?;
    apply(effect, ctx, &key, amount * multiplier * sign(effect))
}

fn percent_change(effect: &Effect, ctx: &mut GameContext, multiplier: f64, sign: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let key = StatKey::new(effect.params.require_str(&label, "key")?);
    let fraction = match effect.params.optional_number(&label, "percent")? {
        Some(percent) => percent / 100.0,
        None => {
            let source = effect.params.require_str(&label, "percent_stat")?;
            ctx.player(ctx.active_player()).stat(source)
        }
    };

    let base = percent_base(ctx, &key);
    apply(effect, ctx, &key, base * fraction * multiplier * sign)
}

/// Base value for percent changes to `key` in the current step.
fn percent_base(ctx: &mut GameContext, key: &StatKey) -> f64 {
    let clock = *ctx.clock();
    let cache_key = format!("{}:{}:{}:{key}", clock.turn, clock.phase_index, clock.step_index);
    let current = ctx.player(clock.active_player).stat(key.as_str());
    *ctx.pct_bases_mut().entry(cache_key).or_insert(current)
}

/// Apply `delta`, clamp at zero and record the applied part.
fn apply(effect: &Effect, ctx: &mut GameContext, key: &StatKey, delta: f64) -> EngineResult<()> {
    let delta = match effect.round {
        Some(mode) => mode.apply_to_magnitude(delta),
        None => delta,
    };
    let delta = ensure_finite(delta, || format!("{} {key}", effect.label()))?;

    let player = ctx.active_player();
    let current = ctx.player(player).stat(key.as_str());
    let next = (current + delta).max(0.0);
    let applied = next - current;
    if applied == 0.0 {
        return Ok(());
    }

    ctx.player_mut(player).set_stat(key, next);
    let meta = ctx.stat_sources().resolve_meta(effect, key);
    ctx.stat_sources_mut().apply_delta(player, key, applied, meta);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::core::numeric::RoundingMode;
    use crate::core::{EngineConfig, FrameScope, GameContext, PlayerId};
    use crate::effects::{execute_effects, Effect, Method};
    use crate::stats::StatSourceFrame;

    fn context() -> GameContext {
        GameContext::new(EngineConfig::new(2)).unwrap()
    }

    fn stat(ctx: &GameContext, key: &str) -> f64 {
        ctx.player(PlayerId::new(0)).stat(key)
    }

    fn add(key: &str, amount: f64) -> Effect {
        Effect::new("stat", Method::Add)
            .with_param("key", key)
            .with_param("amount", amount)
    }

    #[test]
    fn test_add_records_contribution() {
        let mut ctx = context();
        execute_effects(&[add("armyStrength", 2.0)], &mut ctx, 1.0).unwrap();

        assert_eq!(stat(&ctx, "armyStrength"), 2.0);
        let contribution = ctx
            .stat_sources()
            .contribution(PlayerId::new(0), "armyStrength", "stat:add:armyStrength")
            .unwrap();
        assert_eq!(contribution.amount, 2.0);
    }

    #[test]
    fn test_remove_clamps_at_zero() {
        let mut ctx = context();
        execute_effects(&[add("armyStrength", 1.0)], &mut ctx, 1.0).unwrap();
        let remove = add("armyStrength", 3.0).inverted();
        execute_effects(&[remove], &mut ctx, 1.0).unwrap();

        assert_eq!(stat(&ctx, "armyStrength"), 0.0);
        // Only the applied -1 is recorded against the removal.
        let total: f64 = ctx
            .stat_sources()
            .contributions(PlayerId::new(0), "armyStrength")
            .map(|(_, c)| c.amount)
            .sum();
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_round_applies_to_magnitude() {
        let mut ctx = context();
        let effect = add("fortification", 1.5).with_round(RoundingMode::Up);
        execute_effects(&[effect], &mut ctx, 1.0).unwrap();
        assert_eq!(stat(&ctx, "fortification"), 2.0);
    }

    #[test]
    fn test_frame_attribution() {
        let mut ctx = context();
        {
            let mut scope = FrameScope::new(
                &mut ctx,
                [StatSourceFrame::new("action", "drill").with_key("action:drill")],
            );
            execute_effects(&[add("armyStrength", 1.0)], &mut scope, 1.0).unwrap();
        }
        let contribution = ctx
            .stat_sources()
            .contribution(PlayerId::new(0), "armyStrength", "action:drill")
            .unwrap();
        assert_eq!(contribution.meta.id.as_deref(), Some("drill"));
    }

    #[test]
    fn test_percent_uses_step_base() {
        let mut ctx = context();
        execute_effects(&[add("growth", 10.0)], &mut ctx, 1.0).unwrap();
        let pct = Effect::new("stat", "add_pct")
            .with_param("key", "growth")
            .with_param("percent", 50);

        execute_effects(&[pct.clone(), pct], &mut ctx, 1.0).unwrap();
        // 10 + 5 + 5, not 10 + 5 + 7.5.
        assert_eq!(stat(&ctx, "growth"), 20.0);
    }

    #[test]
    fn test_percent_stat_reads_fraction() {
        let mut ctx = context();
        execute_effects(&[add("armyStrength", 8.0), add("warBonus", 0.25)], &mut ctx, 1.0).unwrap();
        let pct = Effect::new("stat", "remove_pct")
            .with_param("key", "armyStrength")
            .with_param("percent_stat", "warBonus");

        execute_effects(&[pct], &mut ctx, 1.0).unwrap();
        assert_eq!(stat(&ctx, "armyStrength"), 6.0);
    }
}
