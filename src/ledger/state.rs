//! Per-player resource ledger state.
//!
//! ## Amounts
//!
//! Only concrete resources store an amount. Group parents are computed on
//! read as the sum of their children, so there is no way to assign one.
//!
//! ## Flags
//!
//! `touched` and `bound_touched` are sticky: once set they stay set for the
//! rest of the game. Recent deltas accumulate until drained.

use im::{OrdMap, OrdSet};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::definition::Bounds;
use super::registry::ResourceRegistry;
use crate::core::{EngineError, EngineResult, PassiveId, ResourceId, TierId};

/// Tier position of one resource or parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMembership {
    pub track: String,
    pub current: Option<TierId>,
    pub previous: Option<TierId>,
    pub next: Option<TierId>,
    /// Passive currently paired with the active tier.
    pub passive: Option<PassiveId>,
}

/// Last recorded hook suppression for a resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSuppression {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Mutable ledger for one player, materialized from the registry.
#[derive(Clone)]
pub struct PlayerResourceState {
    registry: Rc<ResourceRegistry>,
    amounts: OrdMap<ResourceId, i64>,
    touched: OrdSet<ResourceId>,
    bound_overrides: OrdMap<ResourceId, Bounds>,
    bound_touched: OrdSet<ResourceId>,
    tiers: OrdMap<ResourceId, TierMembership>,
    recent_deltas: OrdMap<ResourceId, i64>,
    hook_suppressions: OrdMap<ResourceId, HookSuppression>,
}

impl PlayerResourceState {
    /// Materialize a ledger with every concrete resource at 0, clamped into
    /// its bounds.
    #[must_use]
    pub fn new(registry: Rc<ResourceRegistry>) -> Self {
        let amounts = registry
            .resource_ids()
            .filter_map(|id| registry.resource(id.as_str()))
            .map(|def| {
                let initial = def.bounds.map_or(0, |bounds| bounds.clamp(0));
                (def.id.clone(), initial)
            })
            .collect();

        Self {
            registry,
            amounts,
            touched: OrdSet::new(),
            bound_overrides: OrdMap::new(),
            bound_touched: OrdSet::new(),
            tiers: OrdMap::new(),
            recent_deltas: OrdMap::new(),
            hook_suppressions: OrdMap::new(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Rc<ResourceRegistry> {
        &self.registry
    }

    // === Amounts ===

    /// Current amount. Parents are the sum of their children; unknown ids
    /// read as 0.
    #[must_use]
    pub fn amount(&self, id: &str) -> i64 {
        if self.registry.is_parent(id) {
            let mut visited = FxHashSet::default();
            self.parent_sum(id, &mut visited)
        } else {
            self.amounts.get(id).copied().unwrap_or(0)
        }
    }

    fn parent_sum<'a>(&'a self, id: &'a str, visited: &mut FxHashSet<&'a str>) -> i64 {
        if !visited.insert(id) {
            return 0;
        }
        self.registry
            .children_of(id)
            .iter()
            .map(|child| {
                if self.registry.is_parent(child.as_str()) {
                    self.parent_sum(child.as_str(), visited)
                } else {
                    self.amounts.get(child.as_str()).copied().unwrap_or(0)
                }
            })
            .sum()
    }

    /// Concrete resource amounts in key order.
    pub fn amounts(&self) -> impl Iterator<Item = (&ResourceId, i64)> {
        self.amounts.iter().map(|(id, amount)| (id, *amount))
    }

    /// Assign a concrete resource's amount.
    ///
    /// Callers are responsible for clamping; this only rejects parents and
    /// unknown ids.
    pub(crate) fn set_amount(&mut self, id: &ResourceId, value: i64) -> EngineResult<()> {
        if self.registry.is_parent(id.as_str()) {
            return Err(EngineError::ParentMutation(id.clone()));
        }
        if self.registry.resource(id.as_str()).is_none() {
            return Err(EngineError::unknown("resource", id));
        }
        self.amounts.insert(id.clone(), value);
        Ok(())
    }

    // === Bounds ===

    /// Effective bounds, including any upper-bound increases.
    #[must_use]
    pub fn bounds(&self, id: &str) -> Bounds {
        if let Some(bounds) = self.bound_overrides.get(id) {
            return *bounds;
        }
        self.registry
            .resource(id)
            .and_then(|def| def.bounds)
            .unwrap_or_default()
    }

    pub(crate) fn set_bounds(&mut self, id: &ResourceId, bounds: Bounds) {
        self.bound_overrides.insert(id.clone(), bounds);
    }

    // === Flags ===

    /// True once the resource has changed by a non-zero amount.
    #[must_use]
    pub fn is_touched(&self, id: &str) -> bool {
        self.touched.contains(id)
    }

    pub(crate) fn mark_touched(&mut self, id: &ResourceId) {
        self.touched.insert(id.clone());
    }

    /// True once the resource (or a descendant) had a bound raised.
    #[must_use]
    pub fn is_bound_touched(&self, id: &str) -> bool {
        self.bound_touched.contains(id)
    }

    pub(crate) fn mark_bound_touched(&mut self, id: &ResourceId) {
        self.bound_touched.insert(id.clone());
    }

    // === Recent Deltas ===

    /// Accumulated deltas since the last drain, without draining.
    pub fn recent_deltas(&self) -> impl Iterator<Item = (&ResourceId, i64)> {
        self.recent_deltas.iter().map(|(id, delta)| (id, *delta))
    }

    pub(crate) fn record_delta(&mut self, id: &ResourceId, delta: i64) {
        let total = self.recent_deltas.get(id).copied().unwrap_or(0) + delta;
        self.recent_deltas.insert(id.clone(), total);
    }

    /// Drain accumulated deltas in key order.
    pub(crate) fn take_recent_deltas(&mut self) -> Vec<(ResourceId, i64)> {
        std::mem::take(&mut self.recent_deltas).into_iter().collect()
    }

    // === Hook Suppression ===

    #[must_use]
    pub fn hook_suppression(&self, id: &str) -> Option<&HookSuppression> {
        self.hook_suppressions.get(id)
    }

    pub(crate) fn record_suppression(&mut self, id: &ResourceId, suppression: HookSuppression) {
        self.hook_suppressions.insert(id.clone(), suppression);
    }

    // === Tiers ===

    #[must_use]
    pub fn tier(&self, id: &str) -> Option<&TierMembership> {
        self.tiers.get(id)
    }

    /// Current tier id of a resource or parent, if any.
    #[must_use]
    pub fn current_tier(&self, id: &str) -> Option<&TierId> {
        self.tiers.get(id)?.current.as_ref()
    }

    pub fn tiers(&self) -> impl Iterator<Item = (&ResourceId, &TierMembership)> {
        self.tiers.iter()
    }

    pub(crate) fn set_tier(&mut self, id: &ResourceId, membership: TierMembership) {
        self.tiers.insert(id.clone(), membership);
    }

    pub(crate) fn set_tier_passive(&mut self, id: &str, passive: Option<PassiveId>) {
        if let Some(membership) = self.tiers.get_mut(id) {
            membership.passive = passive;
        }
    }
}

impl std::fmt::Debug for PlayerResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerResourceState")
            .field("amounts", &self.amounts)
            .field("touched", &self.touched)
            .field("bound_overrides", &self.bound_overrides)
            .field("tiers", &self.tiers)
            .field("recent_deltas", &self.recent_deltas)
            .finish_non_exhaustive()
    }
}
