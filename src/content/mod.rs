//! Game content: actions, buildings, developments and population roles.
//!
//! - `definition`: serde data types as authored in registry tables
//! - `registry`: frozen id lookup
//! - `actions`: cost computation and action performance

pub mod actions;
pub mod definition;
pub mod registry;

pub use actions::{compute_action_costs, perform_action, ActionChoices, ActionOutcome};
pub use definition::{
    ActionDefinition, BuildingDefinition, DevelopmentDefinition, EffectGroup, EffectGroupOption,
    PopulationDefinition, TriggerTable,
};
pub use registry::{ContentRegistry, ContentRegistryBuilder};
