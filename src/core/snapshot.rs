//! Plain-data snapshots of game state.
//!
//! Snapshots are deep copies in `BTreeMap` order with no shared structure,
//! suitable for handing to a transport or UI layer. They serialize with
//! `serde`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::context::{GameClock, GameContext};
use super::ids::{BuildingId, DevelopmentId, ResourceId, RoleId, StatKey};
use super::player::{PlayerId, PlayerState};
use crate::ledger::{Bounds, HookSuppression, PlayerResourceState, TierMembership};
use crate::passives::{PassiveManager, PassiveMetadata, SkipFlags};
use crate::stats::{StatContribution, StatSourceTracker};

/// One player's ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Concrete resources and group parents.
    pub amounts: BTreeMap<ResourceId, i64>,
    /// Bounds of resources that have any.
    pub bounds: BTreeMap<ResourceId, Bounds>,
    pub touched: Vec<ResourceId>,
    pub bound_touched: Vec<ResourceId>,
    pub tiers: BTreeMap<ResourceId, TierMembership>,
    pub suppressed_hooks: BTreeMap<ResourceId, HookSuppression>,
}

/// Contributions per stat, keyed by source key.
pub type StatSourceSnapshot = BTreeMap<StatKey, BTreeMap<String, StatContribution>>;

/// An installed passive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveSnapshot {
    pub key: String,
    pub id: String,
    pub owner: PlayerId,
    #[serde(flatten)]
    pub meta: PassiveMetadata,
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "SkipFlags::is_empty")]
    pub skip: SkipFlags,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub ledger: LedgerSnapshot,
    pub stats: BTreeMap<StatKey, f64>,
    pub stat_sources: StatSourceSnapshot,
    pub buildings: Vec<BuildingId>,
    pub developments: BTreeMap<DevelopmentId, u32>,
    pub population: BTreeMap<RoleId, u32>,
    pub passives: Vec<PassiveSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub clock: GameClock,
    pub players: Vec<PlayerSnapshot>,
}

#[must_use]
pub fn snapshot_ledger(state: &PlayerResourceState) -> LedgerSnapshot {
    let registry = state.registry();
    let mut snapshot = LedgerSnapshot::default();

    for id in registry.resource_ids().chain(registry.parent_ids()) {
        snapshot.amounts.insert(id.clone(), state.amount(id.as_str()));
        let bounds = state.bounds(id.as_str());
        if bounds != Bounds::default() {
            snapshot.bounds.insert(id.clone(), bounds);
        }
        if state.is_touched(id.as_str()) {
            snapshot.touched.push(id.clone());
        }
        if state.is_bound_touched(id.as_str()) {
            snapshot.bound_touched.push(id.clone());
        }
        if let Some(suppression) = state.hook_suppression(id.as_str()) {
            snapshot.suppressed_hooks.insert(id.clone(), suppression.clone());
        }
    }
    snapshot.touched.sort();
    snapshot.bound_touched.sort();
    snapshot.tiers = state
        .tiers()
        .map(|(id, membership)| (id.clone(), membership.clone()))
        .collect();
    snapshot
}

#[must_use]
pub fn snapshot_stat_sources(tracker: &StatSourceTracker, player: PlayerId) -> StatSourceSnapshot {
    tracker
        .stats(player)
        .map(|stat| {
            let entries = tracker
                .contributions(player, stat.as_str())
                .map(|(key, contribution)| (key.clone(), contribution.clone()))
                .collect();
            (stat.clone(), entries)
        })
        .collect()
}

/// Passives owned by `player`, in key order.
#[must_use]
pub fn snapshot_passives(manager: &PassiveManager, player: PlayerId) -> Vec<PassiveSnapshot> {
    manager
        .list(Some(player))
        .into_iter()
        .map(|record| PassiveSnapshot {
            key: record.key.clone(),
            id: record.id().to_string(),
            owner: record.owner,
            meta: record.meta.clone(),
            triggers: record.definition.triggers.keys().cloned().collect(),
            skip: record.definition.skip.clone(),
        })
        .collect()
}

#[must_use]
pub fn snapshot_player(ctx: &GameContext, player: PlayerId) -> PlayerSnapshot {
    let state: &PlayerState = ctx.player(player);
    let mut buildings: Vec<BuildingId> = state.buildings().cloned().collect();
    buildings.sort();

    PlayerSnapshot {
        id: player,
        ledger: snapshot_ledger(state.resources()),
        stats: state.stats().map(|(key, value)| (key.clone(), value)).collect(),
        stat_sources: snapshot_stat_sources(ctx.stat_sources(), player),
        buildings,
        developments: state
            .developments()
            .map(|(id, count)| (id.clone(), count))
            .collect(),
        population: state
            .population_roles()
            .map(|(role, count)| (role.clone(), count))
            .collect(),
        passives: snapshot_passives(ctx.passives(), player),
    }
}

#[must_use]
pub fn snapshot_game(ctx: &GameContext) -> GameSnapshot {
    GameSnapshot {
        clock: *ctx.clock(),
        players: PlayerId::all(ctx.player_count())
            .map(|player| snapshot_player(ctx, player))
            .collect(),
    }
}
