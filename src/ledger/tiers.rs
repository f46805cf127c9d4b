//! Tier state machine.
//!
//! Each tiered resource or parent has a [`TierMembership`]. After a ledger
//! change the resource and each ancestor are re-evaluated; when the active
//! tier changes, the old tier's exit effects run, then the new tier's
//! enter effects, with the owner as the active player.
//!
//! The new membership is recorded before any effect runs, so a nested
//! change to the same resource sees the new tier and cannot fire the
//! same crossing twice.

use tracing::debug;

use super::definition::{TierDefinition, TierTrack};
use super::state::TierMembership;
use crate::core::{ActivePlayerScope, EngineResult, GameContext, PlayerId, ResourceId};
use crate::effects::execute_effects;
use crate::passives::passive_key;
use crate::stats::SourceLink;

fn membership(track: &TierTrack, index: Option<usize>) -> TierMembership {
    let tier_id = |i: usize| track.tiers.get(i).map(|tier| tier.id.clone());
    TierMembership {
        track: track.id.clone(),
        current: index.and_then(tier_id),
        previous: index.and_then(|i| i.checked_sub(1)).and_then(tier_id),
        next: index.and_then(|i| tier_id(i + 1)),
        passive: None,
    }
}

/// Record initial membership for every tiered resource and parent without
/// running any effects.
pub fn initialize(ctx: &mut GameContext, player: PlayerId) {
    let registry = ctx.resource_registry();
    for id in registry.tiered_ids() {
        let Some(track) = registry.tier_track(id.as_str()) else {
            continue;
        };
        let amount = ctx.player(player).resources().amount(id.as_str());
        let index = track.tier_for(amount).map(|(i, _)| i);
        ctx.player_mut(player)
            .resources_mut()
            .set_tier(&id, membership(track, index));
    }
}

/// Re-evaluate `resource` and then each of its ancestors.
pub fn reevaluate(ctx: &mut GameContext, player: PlayerId, resource: &ResourceId) -> EngineResult<()> {
    let registry = ctx.resource_registry();
    evaluate(ctx, player, resource)?;
    for parent in registry.ancestors(resource.as_str()) {
        evaluate(ctx, player, &parent)?;
    }
    Ok(())
}

fn evaluate(ctx: &mut GameContext, player: PlayerId, id: &ResourceId) -> EngineResult<()> {
    let registry = ctx.resource_registry();
    let Some(track) = registry.tier_track(id.as_str()) else {
        return Ok(());
    };
    let ledger = ctx.player(player).resources();
    let amount = ledger.amount(id.as_str());
    let previous = ledger.current_tier(id.as_str()).cloned();
    let found = track.tier_for(amount);

    if previous.as_ref() == found.map(|(_, tier)| &tier.id) {
        if let Some((_, tier)) = found {
            sync_passive(ctx, player, tier);
        }
        return Ok(());
    }

    debug!(
        resource = %id,
        %player,
        amount,
        from = ?previous,
        to = ?found.map(|(_, tier)| &tier.id),
        "tier transition"
    );
    ctx.player_mut(player)
        .resources_mut()
        .set_tier(id, membership(track, found.map(|(i, _)| i)));

    let mut scope = ActivePlayerScope::new(ctx, player);
    if let Some(old) = previous.as_ref().and_then(|tier| track.get(tier.as_str())) {
        execute_effects(&old.exit_effects, &mut scope, 1.0)?;
        scope.player_mut(player).resources_mut().set_tier_passive(id.as_str(), None);
    }
    if let Some((_, tier)) = found {
        execute_effects(&tier.enter_effects, &mut scope, 1.0)?;
        scope
            .player_mut(player)
            .resources_mut()
            .set_tier_passive(id.as_str(), tier.passive.clone());
        sync_passive(&mut scope, player, tier);
    }
    Ok(())
}

/// Mirror tier display metadata onto the tier's installed passive.
fn sync_passive(ctx: &mut GameContext, player: PlayerId, tier: &TierDefinition) {
    let Some(passive) = &tier.passive else {
        return;
    };
    let key = passive_key(passive.as_str(), player);
    if let Some(record) = ctx.passives_mut().get_mut(&key) {
        record.meta.detail = tier.display.summary.clone();
        record.meta.source = Some(SourceLink::new("tier", tier.id.as_str()));
        record.meta.removal = tier.display.removal.clone();
    }
}
