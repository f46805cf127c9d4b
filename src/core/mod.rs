//! Core engine types: ids, players, errors, numerics, configuration, the
//! game context and its scoped guards, and snapshots.
//!
//! Content configures the engine through `EngineConfig` rather than by
//! modifying the core.

pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod player;
pub mod scope;
pub mod snapshot;

pub use config::{EngineConfig, RegistryTables};
pub use context::{GameClock, GameContext, ResourceObserver};
pub use error::{ActionRejection, EngineError, EngineResult};
pub use ids::{
    ActionId, BuildingId, DevelopmentId, GroupId, PassiveId, PhaseId, ResourceId, RoleId, StatKey,
    StepId, TierId,
};
pub use numeric::RoundingMode;
pub use player::{PlayerId, PlayerMap, PlayerState};
pub use scope::{ActivePlayerScope, FrameScope, GainCaptureScope};
pub use snapshot::{
    snapshot_game, snapshot_ledger, snapshot_passives, snapshot_player, snapshot_stat_sources,
    GameSnapshot, LedgerSnapshot, PassiveSnapshot, PlayerSnapshot, StatSourceSnapshot,
};
