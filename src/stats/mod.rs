//! Stat provenance tracking.

pub mod sources;

pub use sources::{
    Longevity, SourceLink, StatContribution, StatSourceFrame, StatSourceMeta, StatSourceTracker,
};
