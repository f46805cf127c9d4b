//! Built-in evaluators.
//!
//! Evaluators compute the repeat count of a scaled effect group from the
//! active player's state. Ids they name must exist in the content
//! registry.

use serde_json::Value;

use super::effect::EvaluatorSpec;
use super::registry::EffectRegistry;
use crate::core::{EngineError, EngineResult, GameContext};

pub(crate) fn register_builtins(registry: &mut EffectRegistry) {
    registry.register_evaluator("population", population);
    registry.register_evaluator("development", development);
    registry.register_evaluator("building", building);
    registry.register_evaluator("stat", stat);
    registry.register_evaluator("resource", resource);
    registry.register_evaluator("compare", compare);
}

fn label(spec: &EvaluatorSpec) -> String {
    format!("evaluator:{}", spec.kind)
}

/// Headcount of `role`, or total population.
fn population(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let player = ctx.player(ctx.active_player());
    match spec.params.optional_str(&label(spec), "role")? {
        Some(role) => {
            ctx.content().population(role)?;
            Ok(f64::from(player.population(role)))
        }
        None => Ok(f64::from(player.total_population())),
    }
}

/// Count of development `id`, or of all developments.
fn development(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let player = ctx.player(ctx.active_player());
    match spec.params.optional_str(&label(spec), "id")? {
        Some(id) => {
            ctx.content().development(id)?;
            Ok(f64::from(player.development_count(id)))
        }
        None => Ok(f64::from(player.total_developments())),
    }
}

/// 1 if building `id` is owned.
fn building(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let id = spec.params.require_str(&label(spec), "id")?;
    ctx.content().building(id)?;
    let owned = ctx.player(ctx.active_player()).has_building(id);
    Ok(if owned { 1.0 } else { 0.0 })
}

fn stat(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let key = spec.params.require_str(&label(spec), "key")?;
    Ok(ctx.player(ctx.active_player()).stat(key))
}

/// Resource amount; group parents are allowed.
fn resource(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let key = spec.params.require_str(&label(spec), "key")?;
    if !ctx.resource_registry().contains(key) {
        return Err(EngineError::unknown("resource", key));
    }
    Ok(ctx.player(ctx.active_player()).resources().amount(key) as f64)
}

/// 1 if `left <operator> right` holds, else 0.
fn compare(spec: &EvaluatorSpec, ctx: &GameContext) -> EngineResult<f64> {
    let name = label(spec);
    let left = operand(spec, "left", ctx)?;
    let right = operand(spec, "right", ctx)?;
    let holds = match spec.params.require_str(&name, "operator")? {
        "lt" => left < right,
        "lte" => left <= right,
        "gt" => left > right,
        "gte" => left >= right,
        "eq" => left == right,
        "ne" => left != right,
        _ => {
            return Err(EngineError::InvalidParam {
                effect: name,
                param: "operator".into(),
                expected: "one of lt, lte, gt, gte, eq, ne",
            })
        }
    };
    Ok(if holds { 1.0 } else { 0.0 })
}

/// A literal number or a nested evaluator.
fn operand(spec: &EvaluatorSpec, key: &str, ctx: &GameContext) -> EngineResult<f64> {
    let name = label(spec);
    match spec.params.get(key) {
        None | Some(Value::Null) => Err(EngineError::MissingParam {
            effect: name,
            param: key.to_string(),
        }),
        Some(Value::Number(number)) => number.as_f64().ok_or_else(|| EngineError::NonFinite {
            context: format!("{name}.{key}"),
        }),
        Some(nested @ Value::Object(_)) => {
            let nested: EvaluatorSpec =
                serde_json::from_value(nested.clone()).map_err(|_| EngineError::InvalidParam {
                    effect: name.clone(),
                    param: key.to_string(),
                    expected: "a number or an evaluator",
                })?;
            let evaluator = ctx.effect_registry().evaluator(&nested.kind)?;
            evaluator(&nested, ctx)
        }
        Some(_) => Err(EngineError::InvalidParam {
            effect: name,
            param: key.to_string(),
            expected: "a number or an evaluator",
        }),
    }
}
