//! Effect tree execution.
//!
//! Plain nodes dispatch to their registered handler. Scaled nodes ask
//! their evaluator for a count, run the nested list once with the count
//! folded into the multiplier, then pass the gains that run produced
//! through the owner's evaluation modifiers.

use tracing::trace;

use super::effect::{Effect, EffectShape, EvaluatorSpec};
use crate::core::numeric::ensure_finite;
use crate::core::{
    EngineError, EngineResult, FrameScope, GainCaptureScope, GameContext, PlayerId, ResourceId,
};
use crate::ledger::{apply_value_change, ValueChange};

/// Execute `effects` in order with the given multiplier.
pub fn execute_effects(effects: &[Effect], ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    for effect in effects {
        execute_effect(effect, ctx, multiplier)?;
    }
    Ok(())
}

/// Execute a single effect node.
pub fn execute_effect(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    match effect.shape() {
        EffectShape::Plain { kind, method } => {
            let handler = ctx.effect_registry().handler(kind, method)?;
            trace!(effect = %effect.label(), multiplier, "dispatch");
            handler(effect, ctx, multiplier)
        }
        EffectShape::Scaled(evaluator) => execute_scaled(effect, evaluator, ctx, multiplier),
        EffectShape::Malformed => {
            trace!(?effect, "skipping malformed effect");
            Ok(())
        }
    }
}

fn execute_scaled(
    effect: &Effect,
    spec: &EvaluatorSpec,
    ctx: &mut GameContext,
    multiplier: f64,
) -> EngineResult<()> {
    let evaluator = ctx.effect_registry().evaluator(&spec.kind)?;
    let count = ensure_finite(evaluator(spec, ctx)?, || format!("evaluator '{}'", spec.kind))?;
    let total = count * multiplier;
    if total == 0.0 {
        trace!(evaluator = %spec.kind, "zero count, skipping group");
        return Ok(());
    }

    let owner = ctx.active_player();
    let mut capture = GainCaptureScope::new(ctx);
    {
        let mut framed = FrameScope::new(&mut capture, [spec.dependency_frame()]);
        execute_effects(&effect.effects, &mut framed, total)?;
    }
    apply_evaluation_modifiers(&mut capture, owner, &spec.target_key())
}

/// Check the configuration an effect tree depends on without running it.
///
/// Every plain node must have a handler, every scaled node an evaluator.
/// Resource keys must name concrete resources, and building, development
/// and population ids must exist in the content registry. Nested lists
/// are checked even where they only run later (passive bundles, result
/// modifiers). Runtime failures such as fractional amounts can still
/// surface during execution.
pub fn validate_effects(effects: &[Effect], ctx: &GameContext) -> EngineResult<()> {
    for effect in effects {
        match effect.shape() {
            EffectShape::Plain { kind, method } => {
                ctx.effect_registry().handler(kind, method)?;
                validate_references(effect, kind, ctx)?;
            }
            EffectShape::Scaled(spec) => {
                ctx.effect_registry().evaluator(&spec.kind)?;
            }
            EffectShape::Malformed => continue,
        }
        validate_effects(&effect.effects, ctx)?;
    }
    Ok(())
}

fn validate_references(effect: &Effect, kind: &str, ctx: &GameContext) -> EngineResult<()> {
    let label = effect.label();
    match kind {
        "resource" => {
            let key = effect.params.require_str(&label, "key")?;
            let registry = ctx.resource_registry();
            if registry.is_parent(key) {
                return Err(EngineError::ParentMutation(ResourceId::new(key)));
            }
            if registry.resource(key).is_none() {
                return Err(EngineError::unknown("resource", key));
            }
        }
        "building" => {
            ctx.content().building(effect.params.require_str(&label, "id")?)?;
        }
        "development" => {
            ctx.content().development(effect.params.require_str(&label, "id")?)?;
        }
        "population" => {
            ctx.content().population(effect.params.require_str(&label, "role")?)?;
        }
        _ => {}
    }
    Ok(())
}

/// Adjust captured gains in place and settle the difference on the ledger.
fn apply_evaluation_modifiers(ctx: &mut GameContext, owner: PlayerId, target: &str) -> EngineResult<()> {
    let mut gains = ctx.take_recent_gains();
    if gains.is_empty() {
        return Ok(());
    }
    let before: Vec<i64> = gains.iter().map(|gain| gain.amount).collect();
    ctx.passives().modifiers().apply_evaluation(owner, target, &mut gains);

    for (gain, original) in gains.iter().zip(before) {
        let extra = gain.amount - original;
        if extra != 0 {
            trace!(%target, resource = %gain.resource, extra, "evaluation modifier");
            let change = ValueChange::amount(extra as f64).unlogged();
            apply_value_change(ctx, owner, &gain.resource, &change)?;
        }
    }
    ctx.replace_recent_gains(gains);
    Ok(())
}
