//! # realm-rules
//!
//! Effect resolution, resource ledger and stat provenance core for
//! turn-based strategy simulations.
//!
//! ## Design Principles
//!
//! 1. **Content-Agnostic**: No hardcoded resources, actions, buildings or
//!    phases. Content supplies registries at startup through `EngineConfig`.
//!
//! 2. **N-Player First**: Every player-scoped operation takes an explicit
//!    `PlayerId`; the active player is only the implicit actor for effects.
//!
//! 3. **Effects as Data**: Everything that changes state is an `Effect`
//!    tree dispatched by `(type, method)` through an `EffectRegistry`.
//!    Passives, tiers, buildings and phases all reduce to effect bundles.
//!
//! ## Architecture
//!
//! - **Single owner**: One `GameContext` owns all mutable state. Frozen
//!   registries are shared behind `Rc`; `clone_state` forks a game.
//!
//! - **Integer ledger**: Resource amounts are `i64`. Fractional requests
//!   are either rejected or rounded by an explicit `RoundingMode`.
//!
//! - **Scoped overrides**: Active player, attribution frames and gain
//!   capture are RAII guards, so every exit path restores them.
//!
//! ## Modules
//!
//! - `core`: ids, players, errors, numerics, configuration, context, snapshots
//! - `ledger`: resource definitions, groups, bounds, tiers and the mutation service
//! - `effects`: effect data, handler registry, executor and built-in handlers
//! - `passives`: reversible effect bundles and cost/result/evaluation modifiers
//! - `stats`: per-stat contribution tracking
//! - `content`: actions, buildings, developments, population roles
//! - `phases`: turn structure, trigger collection and clock advancement

pub mod content;
pub mod core;
pub mod effects;
pub mod ledger;
pub mod passives;
pub mod phases;
pub mod stats;

// Re-export commonly used types
pub use crate::core::{
    snapshot_game, snapshot_player, ActivePlayerScope, EngineConfig, EngineError, EngineResult,
    FrameScope, GameClock, GameContext, GameSnapshot, PlayerId, PlayerSnapshot, RegistryTables,
    ResourceId, RoundingMode, StatKey,
};

pub use crate::ledger::{
    apply_value_change, increase_upper_bound, transfer, Bounds, ChangeSpec, GroupDefinition,
    GroupParentDefinition, ResourceDefinition, ResourceGain, ResourceRegistry, TierDefinition,
    TierRange, TierTrack, ValueChange,
};

pub use crate::effects::{execute_effect, execute_effects, Effect, EffectRegistry, Method};

pub use crate::passives::{add_passive, remove_passive, AddPassiveOptions, PassiveDefinition};

pub use crate::stats::{StatSourceFrame, StatSourceTracker};

pub use crate::content::{
    perform_action, ActionDefinition, BuildingDefinition, ContentRegistry, DevelopmentDefinition,
    PopulationDefinition,
};

pub use crate::phases::{advance, run_trigger, PhaseDefinition, StepDefinition};
