//! The game context: registries, clock and all per-game mutable state.
//!
//! ## Ownership
//!
//! Frozen registries are shared behind `Rc`. Everything mutable (player
//! ledgers, stats, passives, modifiers, stat sources) is owned by exactly
//! one context. Cloning a context with [`GameContext::clone_state`] yields
//! an independent copy; `im` structures make this cheap.
//!
//! ## Active player
//!
//! The clock's active player is the implicit actor for handlers. Code that
//! acts for another player swaps it with
//! [`ActivePlayerScope`](super::ActivePlayerScope), never by assignment.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::config::EngineConfig;
use super::error::EngineResult;
use super::ids::ResourceId;
use super::player::{PlayerId, PlayerMap, PlayerState};
use crate::content::ContentRegistry;
use crate::effects::EffectRegistry;
use crate::ledger::{tiers, PlayerResourceState, ResourceChangeEvent, ResourceGain, ResourceRegistry};
use crate::passives::PassiveManager;
use crate::phases::PhaseDefinition;
use crate::stats::StatSourceTracker;

/// Gain or loss observer.
pub type ResourceObserver = Rc<dyn Fn(&ResourceChangeEvent, &mut GameContext) -> EngineResult<()>>;

#[derive(Clone, Default)]
struct ResourceObservers {
    on_gain: Vec<ResourceObserver>,
    on_loss: Vec<ResourceObserver>,
}

/// Turn position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    /// Turn number (starts at 1).
    pub turn: u32,
    pub phase_index: usize,
    pub step_index: usize,
    pub active_player: PlayerId,
    /// A new turn starts when play returns to this player.
    pub starting_player: PlayerId,
    pub player_count: usize,
}

/// Everything one game needs to resolve effects.
#[derive(Clone)]
pub struct GameContext {
    // === Registries ===
    resources: Rc<ResourceRegistry>,
    content: Rc<ContentRegistry>,
    phases: Rc<Vec<PhaseDefinition>>,
    effects: Rc<EffectRegistry>,

    // === Progression ===
    clock: GameClock,

    // === State ===
    players: PlayerMap<PlayerState>,
    passives: PassiveManager,
    stat_sources: StatSourceTracker,
    recent_gains: Vec<ResourceGain>,
    observers: ResourceObservers,
    /// Percent-stat bases keyed `"turn:phase:step:stat"`.
    pct_bases: FxHashMap<String, f64>,
}

impl GameContext {
    /// Validate the configuration and materialize every player's state.
    ///
    /// Tier membership is initialized silently: no enter effects run.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let EngineConfig {
            player_count,
            starting_player,
            resources,
            content,
            phases,
            effects,
        } = config;

        let players = PlayerMap::new(player_count, |id| {
            PlayerState::new(id, PlayerResourceState::new(Rc::clone(&resources)))
        });
        let mut ctx = Self {
            resources,
            content,
            phases: Rc::new(phases),
            effects,
            clock: GameClock {
                turn: 1,
                phase_index: 0,
                step_index: 0,
                active_player: starting_player,
                starting_player,
                player_count,
            },
            players,
            passives: PassiveManager::new(),
            stat_sources: StatSourceTracker::new(player_count),
            recent_gains: Vec::new(),
            observers: ResourceObservers::default(),
            pct_bases: FxHashMap::default(),
        };
        for player in PlayerId::all(player_count) {
            tiers::initialize(&mut ctx, player);
        }
        Ok(ctx)
    }

    /// Independent copy of all state, sharing only the frozen registries.
    #[must_use]
    pub fn clone_state(&self) -> Self {
        self.clone()
    }

    // === Registries ===

    #[must_use]
    pub fn resource_registry(&self) -> Rc<ResourceRegistry> {
        Rc::clone(&self.resources)
    }

    #[must_use]
    pub fn content(&self) -> Rc<ContentRegistry> {
        Rc::clone(&self.content)
    }

    #[must_use]
    pub fn effect_registry(&self) -> Rc<EffectRegistry> {
        Rc::clone(&self.effects)
    }

    #[must_use]
    pub fn phases(&self) -> Rc<Vec<PhaseDefinition>> {
        Rc::clone(&self.phases)
    }

    // === Clock ===

    #[must_use]
    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub(crate) fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.clock.player_count
    }

    #[must_use]
    pub fn active_player(&self) -> PlayerId {
        self.clock.active_player
    }

    pub(crate) fn set_active_player(&mut self, player: PlayerId) {
        self.clock.active_player = player;
    }

    /// The player seated after `player`.
    #[must_use]
    pub fn opponent_of(&self, player: PlayerId) -> PlayerId {
        player.next(self.clock.player_count)
    }

    // === Players ===

    #[must_use]
    pub fn player(&self, player: PlayerId) -> &PlayerState {
        &self.players[player]
    }

    pub(crate) fn player_mut(&mut self, player: PlayerId) -> &mut PlayerState {
        &mut self.players[player]
    }

    pub fn players(&self) -> impl Iterator<Item = (PlayerId, &PlayerState)> {
        self.players.iter()
    }

    // === Passives and Stat Sources ===

    #[must_use]
    pub fn passives(&self) -> &PassiveManager {
        &self.passives
    }

    pub(crate) fn passives_mut(&mut self) -> &mut PassiveManager {
        &mut self.passives
    }

    #[must_use]
    pub fn stat_sources(&self) -> &StatSourceTracker {
        &self.stat_sources
    }

    pub(crate) fn stat_sources_mut(&mut self) -> &mut StatSourceTracker {
        &mut self.stat_sources
    }

    pub(crate) fn pct_bases_mut(&mut self) -> &mut FxHashMap<String, f64> {
        &mut self.pct_bases
    }

    // === Logs ===

    /// Drain the active player's recent-gains log.
    pub fn take_recent_gains(&mut self) -> Vec<ResourceGain> {
        std::mem::take(&mut self.recent_gains)
    }

    /// Gains logged since the last drain, without draining.
    #[must_use]
    pub fn recent_gains(&self) -> &[ResourceGain] {
        &self.recent_gains
    }

    pub(crate) fn push_recent_gain(&mut self, gain: ResourceGain) {
        self.recent_gains.push(gain);
    }

    pub(crate) fn replace_recent_gains(&mut self, gains: Vec<ResourceGain>) {
        self.recent_gains = gains;
    }

    /// Drain `player`'s accumulated per-resource deltas.
    pub fn take_recent_deltas(&mut self, player: PlayerId) -> Vec<(ResourceId, i64)> {
        self.players[player].resources_mut().take_recent_deltas()
    }

    // === Observers ===

    /// Observe positive ledger changes.
    pub fn on_resource_gain(
        &mut self,
        observer: impl Fn(&ResourceChangeEvent, &mut GameContext) -> EngineResult<()> + 'static,
    ) {
        self.observers.on_gain.push(Rc::new(observer));
    }

    /// Observe negative ledger changes.
    pub fn on_resource_loss(
        &mut self,
        observer: impl Fn(&ResourceChangeEvent, &mut GameContext) -> EngineResult<()> + 'static,
    ) {
        self.observers.on_loss.push(Rc::new(observer));
    }

    pub(crate) fn notify_resource_change(
        &mut self,
        event: &ResourceChangeEvent,
        gain: bool,
    ) -> EngineResult<()> {
        let observers = if gain {
            self.observers.on_gain.clone()
        } else {
            self.observers.on_loss.clone()
        };
        for observer in observers {
            observer(event, self)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("clock", &self.clock)
            .field("players", &self.players)
            .field("passives", &self.passives)
            .field("recent_gains", &self.recent_gains)
            .finish_non_exhaustive()
    }
}
