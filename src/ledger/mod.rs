//! Resource ledger: definitions, the frozen registry, per-player state,
//! the mutation service and the tier state machine.
//!
//! ## Invariants
//!
//! - A group parent's amount is always the sum of its children.
//! - A bounded resource always lies within its (possibly raised) bounds.
//! - Tier crossings fire their exit and enter effects exactly once.

pub mod definition;
pub mod registry;
pub mod service;
pub mod state;
pub mod tiers;

pub use definition::{
    Bounds, DisplayInfo, GroupDefinition, GroupMembership, GroupParentDefinition,
    ResourceDefinition, TierDefinition, TierDisplay, TierRange, TierTrack,
};
pub use registry::{Ancestors, ResourceRegistry, ResourceRegistryBuilder};
pub use service::{
    apply_value_change, increase_upper_bound, transfer, ChangeSpec, Reconciliation,
    ResourceChangeEvent, ResourceGain, TransferOutcome, ValueChange,
};
pub use state::{HookSuppression, PlayerResourceState, TierMembership};
