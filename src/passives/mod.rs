//! Passives and modifiers.
//!
//! - `manager`: reversible installed effect bundles
//! - `modifiers`: cost, result and evaluation modifier registries

pub mod manager;
pub mod modifiers;

pub use manager::{
    add_passive, passive_key, remove_passive, AddPassiveOptions, PassiveDefinition, PassiveManager,
    PassiveMetadata, PassiveRecord, SkipFlags, StepRef,
};
pub use modifiers::{
    CostModifier, EvaluationModifier, Modifier, ModifierRegistry, ResultModifier,
};
