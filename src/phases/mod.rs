//! Phases, steps and trigger points.
//!
//! - `definition`: phase and step data
//! - `triggers`: collecting the effects owed at a trigger point
//! - `advance`: executing steps and moving the clock

pub mod advance;
pub mod definition;
pub mod triggers;

pub use advance::{advance, current_position, in_action_phase, AdvanceOutcome};
pub use definition::{PhaseDefinition, StepDefinition};
pub use triggers::{collect_trigger_effects, run_trigger, TriggerBundle, PAY_UPKEEP_TRIGGER};
