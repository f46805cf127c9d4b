//! `passive:add` / `passive:remove`.
//!
//! The nested `effects` of a `passive:add` node are the installed bundle,
//! not effects to run in place.

use std::collections::BTreeMap;

use super::is_removal;
use crate::core::{EngineResult, GameContext, PassiveId};
use crate::effects::{Effect, EffectRegistry, Method};
use crate::passives::{add_passive, remove_passive, AddPassiveOptions, PassiveDefinition, PassiveMetadata, SkipFlags};

pub(super) fn register(registry: &mut EffectRegistry) {
    registry.register_handler("passive", Method::Add, handle);
    registry.register_handler("passive", Method::Remove, handle);
}

fn handle(effect: &Effect, ctx: &mut GameContext, multiplier: f64) -> EngineResult<()> {
    if multiplier == 0.0 {
        return Ok(());
    }
    let label = effect.label();
    let id = effect.params.require_str(&label, "id")?;
    if is_removal(effect) {
        remove_passive(ctx, id, None)?;
        return Ok(());
    }

    let definition = definition(effect, &label, PassiveId::new(id))?;
    add_passive(ctx, definition, AddPassiveOptions::default())?;
    Ok(())
}

fn definition(effect: &Effect, label: &str, id: PassiveId) -> EngineResult<PassiveDefinition> {
    let params = &effect.params;
    let triggers: Option<BTreeMap<String, Vec<Effect>>> =
        params.decode(label, "triggers", "a map of trigger to effect list")?;
    let skip: Option<SkipFlags> = params.decode(label, "skip", "{ phases, steps }")?;

    Ok(PassiveDefinition {
        id,
        meta: PassiveMetadata {
            name: params.optional_str(label, "name")?.map(str::to_string),
            icon: params.optional_str(label, "icon")?.map(str::to_string),
            detail: params.optional_str(label, "detail")?.map(str::to_string),
            ..PassiveMetadata::default()
        },
        effects: effect.effects.clone(),
        triggers: triggers.unwrap_or_default(),
        skip: skip.unwrap_or_default(),
    })
}
