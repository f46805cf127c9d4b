//! Player identification and per-player state.
//!
//! ## PlayerId
//!
//! Type-safe player identifier supporting 1-255 players, 0-based.
//!
//! ## PlayerMap
//!
//! Per-player storage backed by `Vec` for O(1) access, indexable by
//! `PlayerId`.
//!
//! ## PlayerState
//!
//! Everything the engine tracks for one player: the resource ledger,
//! stats, owned buildings/developments/population and phase skip flags.
//! Collections are `im` persistent structures so cloning a whole game for
//! simulation is cheap.

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::ids::{BuildingId, DevelopmentId, PhaseId, RoleId, StatKey, StepId};
use crate::ledger::PlayerResourceState;

/// Player identifier supporting 1-255 players.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw player index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The player seated after this one, wrapping around.
    #[must_use]
    pub fn next(self, player_count: usize) -> PlayerId {
        PlayerId(((self.index() + 1) % player_count) as u8)
    }

    /// Iterate over all player IDs for a game with `player_count` players.
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Per-player data storage with O(1) access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Create a new PlayerMap with values from a factory function.
    pub fn new(player_count: usize, factory: impl Fn(PlayerId) -> T) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        Self {
            data: PlayerId::all(player_count).map(factory).collect(),
        }
    }

    /// Create a new PlayerMap with default values.
    pub fn with_default(player_count: usize) -> Self
    where
        T: Default,
    {
        Self::new(player_count, |_| T::default())
    }

    /// Get the number of players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.data.len()
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        &self.data[player.index()]
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        &mut self.data[player.index()]
    }
}

/// Mutable state for one player.
#[derive(Clone, Debug)]
pub struct PlayerState {
    id: PlayerId,
    resources: PlayerResourceState,
    stats: OrdMap<StatKey, f64>,
    stats_touched: OrdSet<StatKey>,
    buildings: OrdSet<BuildingId>,
    developments: OrdMap<DevelopmentId, u32>,
    population: OrdMap<RoleId, u32>,
    /// Phase -> sources requesting the skip.
    skip_phases: OrdMap<PhaseId, OrdSet<String>>,
    /// (Phase, step) -> sources requesting the skip.
    skip_steps: OrdMap<(PhaseId, StepId), OrdSet<String>>,
}

impl PlayerState {
    /// Create a player with a freshly materialized ledger.
    #[must_use]
    pub fn new(id: PlayerId, resources: PlayerResourceState) -> Self {
        Self {
            id,
            resources,
            stats: OrdMap::new(),
            stats_touched: OrdSet::new(),
            buildings: OrdSet::new(),
            developments: OrdMap::new(),
            population: OrdMap::new(),
            skip_phases: OrdMap::new(),
            skip_steps: OrdMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    // === Resources ===

    /// The player's resource ledger.
    #[must_use]
    pub fn resources(&self) -> &PlayerResourceState {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut PlayerResourceState {
        &mut self.resources
    }

    // === Stats ===

    /// Current stat value (0 if never set).
    #[must_use]
    pub fn stat(&self, key: &str) -> f64 {
        self.stats.get(key).copied().unwrap_or(0.0)
    }

    /// Iterate over all stats with a stored value.
    pub fn stats(&self) -> impl Iterator<Item = (&StatKey, f64)> {
        self.stats.iter().map(|(k, v)| (k, *v))
    }

    /// True once the stat has ever held a non-zero value.
    #[must_use]
    pub fn is_stat_touched(&self, key: &str) -> bool {
        self.stats_touched.contains(key)
    }

    pub(crate) fn set_stat(&mut self, key: &StatKey, value: f64) {
        if value != 0.0 {
            self.stats_touched.insert(key.clone());
        }
        self.stats.insert(key.clone(), value);
    }

    // === Buildings ===

    #[must_use]
    pub fn has_building(&self, id: &str) -> bool {
        self.buildings.contains(id)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingId> {
        self.buildings.iter()
    }

    /// Returns false if the building was already owned.
    pub(crate) fn insert_building(&mut self, id: BuildingId) -> bool {
        self.buildings.insert(id).is_none()
    }

    pub(crate) fn remove_building(&mut self, id: &str) -> bool {
        self.buildings.remove(id).is_some()
    }

    // === Developments ===

    #[must_use]
    pub fn development_count(&self, id: &str) -> u32 {
        self.developments.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_developments(&self) -> u32 {
        self.developments.values().sum()
    }

    pub fn developments(&self) -> impl Iterator<Item = (&DevelopmentId, u32)> {
        self.developments.iter().map(|(k, v)| (k, *v))
    }

    pub(crate) fn set_development_count(&mut self, id: &DevelopmentId, count: u32) {
        if count == 0 {
            self.developments.remove(id);
        } else {
            self.developments.insert(id.clone(), count);
        }
    }

    // === Population ===

    #[must_use]
    pub fn population(&self, role: &str) -> u32 {
        self.population.get(role).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_population(&self) -> u32 {
        self.population.values().sum()
    }

    pub fn population_roles(&self) -> impl Iterator<Item = (&RoleId, u32)> {
        self.population.iter().map(|(k, v)| (k, *v))
    }

    pub(crate) fn set_population(&mut self, role: &RoleId, count: u32) {
        if count == 0 {
            self.population.remove(role);
        } else {
            self.population.insert(role.clone(), count);
        }
    }

    // === Skip Flags ===

    /// True if any source currently skips this phase.
    #[must_use]
    pub fn is_phase_skipped(&self, phase: &PhaseId) -> bool {
        self.skip_phases.get(phase).is_some_and(|s| !s.is_empty())
    }

    /// True if any source currently skips this step.
    #[must_use]
    pub fn is_step_skipped(&self, phase: &PhaseId, step: &StepId) -> bool {
        self.skip_steps
            .get(&(phase.clone(), step.clone()))
            .is_some_and(|s| !s.is_empty())
    }

    pub(crate) fn add_phase_skip(&mut self, phase: &PhaseId, source: &str) {
        let mut sources = self.skip_phases.get(phase).cloned().unwrap_or_default();
        sources.insert(source.to_string());
        self.skip_phases.insert(phase.clone(), sources);
    }

    pub(crate) fn remove_phase_skip(&mut self, phase: &PhaseId, source: &str) {
        if let Some(sources) = self.skip_phases.get_mut(phase) {
            sources.remove(source);
            if sources.is_empty() {
                self.skip_phases.remove(phase);
            }
        }
    }

    pub(crate) fn add_step_skip(&mut self, phase: &PhaseId, step: &StepId, source: &str) {
        let key = (phase.clone(), step.clone());
        let mut sources = self.skip_steps.get(&key).cloned().unwrap_or_default();
        sources.insert(source.to_string());
        self.skip_steps.insert(key, sources);
    }

    pub(crate) fn remove_step_skip(&mut self, phase: &PhaseId, step: &StepId, source: &str) {
        let key = (phase.clone(), step.clone());
        if let Some(sources) = self.skip_steps.get_mut(&key) {
            sources.remove(source);
            if sources.is_empty() {
                self.skip_steps.remove(&key);
            }
        }
    }
}
