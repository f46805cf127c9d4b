//! `building`, `development` and `population` handlers.
//!
//! Buildings and developments install their `on_build` effects as a
//! passive so removal reverses them. Each development instance gets its
//! own passive (`development:<id>:<n>`). Population roles run
//! `on_assigned` / `on_unassigned` once per head moved.

use tracing::debug;

use super::{is_removal, register_symmetric};
use crate::core::numeric::to_integer;
use crate::core::{
    BuildingId, DevelopmentId, EngineError, EngineResult, FrameScope, GameContext, RoleId,
};
use crate::effects::{execute_effects, Effect, EffectRegistry};
use crate::passives::{add_passive, remove_passive, AddPassiveOptions, PassiveDefinition};
use crate::stats::{SourceLink, StatSourceFrame};

pub(super) fn register(registry: &mut EffectRegistry) {
    register_symmetric(registry, "building", building);
    register_symmetric(registry, "development", development);
    register_symmetric(registry, "population", population);
}

/// Passive options attributing installed effects to `kind:id`.
fn install_options(kind: &str, id: &str) -> AddPassiveOptions {
    let link = SourceLink::new(kind, id);
    AddPassiveOptions {
        meta: Some(StatSourceFrame::default().depending_on(link.clone())),
        ..AddPassiveOptions::default()
    }
    .with_source(link)
}

/// Number of instances a multiplier asks for.
fn instance_count(effect: &Effect, multiplier: f64) -> EngineResult<u32> {
    let count = to_integer(multiplier, || format!("{} multiplier", effect.label()))?;
    u32::try_from(count).map_err(|_| EngineError::InvalidParam {
        effect: effect.label(),
        param: "multiplier".into(),
        expected: "a non-negative instance count",
    })
}

fn building(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let id = BuildingId::new(effect.params.require_str(&effect.label(), "id")?);
    let content = ctx.content();
    let definition = content.building(id.as_str())?;
    let player = ctx.active_player();
    let passive_id = format!("building:{id}");

    if is_removal(effect) {
        if ctx.player_mut(player).remove_building(id.as_str()) {
            debug!(building = %id, %player, "building removed");
            remove_passive(ctx, &passive_id, Some(player))?;
        }
        return Ok(());
    }

    if !ctx.player_mut(player).insert_building(id.clone()) {
        return Ok(());
    }
    debug!(building = %id, %player, "building added");
    let passive = PassiveDefinition::new(passive_id, definition.on_build.clone());
    let passive = match &definition.display.name {
        Some(name) => passive.with_name(name.clone()),
        None => passive,
    };
    add_passive(ctx, passive, install_options("building", id.as_str()))?;
    Ok(())
}

fn development(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let count = instance_count(effect, multiplier)?;
    let id = DevelopmentId::new(effect.params.require_str(&effect.label(), "id")?);
    let content = ctx.content();
    let definition = content.development(id.as_str())?;
    let player = ctx.active_player();

    for _ in 0..count {
        let current = ctx.player(player).development_count(id.as_str());
        if is_removal(effect) {
            if current == 0 {
                break;
            }
            ctx.player_mut(player).set_development_count(&id, current - 1);
            remove_passive(ctx, &format!("development:{id}:{current}"), Some(player))?;
        } else {
            let next = current + 1;
            ctx.player_mut(player).set_development_count(&id, next);
            let passive = PassiveDefinition::new(
                format!("development:{id}:{next}"),
                definition.on_build.clone(),
            );
            add_passive(ctx, passive, install_options("development", id.as_str()))?;
        }
    }
    let total = ctx.player(player).development_count(id.as_str());
    debug!(development = %id, %player, total, "developments changed");
    Ok(())
}

fn population(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let count = instance_count(effect, multiplier)?;
    let role = RoleId::new(effect.params.require_str(&effect.label(), "role")?);
    let content = ctx.content();
    let definition = content.population(role.as_str())?;
    let player = ctx.active_player();
    let current = ctx.player(player).population(role.as_str());

    let (next, moved, effects) = if is_removal(effect) {
        let moved = count.min(current);
        (current - moved, moved, &definition.on_unassigned)
    } else {
        (current.saturating_add(count), count, &definition.on_assigned)
    };
    if moved == 0 {
        return Ok(());
    }

    ctx.player_mut(player).set_population(&role, next);
    debug!(%role, %player, from = current, to = next, "population changed");
    let frame = StatSourceFrame::new("population", role.as_str());
    let mut scope = FrameScope::new(ctx, [frame]);
    execute_effects(effects, &mut scope, f64::from(moved))
}
