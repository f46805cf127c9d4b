//! Resource, group and tier definitions.
//!
//! These are the registry tables content authors write. They are plain
//! `serde` data and are immutable once handed to
//! [`ResourceRegistry`](super::ResourceRegistry).

use serde::{Deserialize, Serialize};

use crate::core::{GroupId, PassiveId, ResourceId, TierId};
use crate::effects::Effect;

/// Inclusive bounds on a resource amount. `None` means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<i64>,
}

impl Bounds {
    #[must_use]
    pub const fn new(lower: Option<i64>, upper: Option<i64>) -> Self {
        Self { lower, upper }
    }

    /// Bounds `[lower, upper]`.
    #[must_use]
    pub const fn range(lower: i64, upper: i64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    /// Bounded below only.
    #[must_use]
    pub const fn at_least(lower: i64) -> Self {
        Self::new(Some(lower), None)
    }

    /// Clip a value into the bounds.
    #[must_use]
    pub fn clamp(&self, value: i64) -> i64 {
        let value = self.lower.map_or(value, |lower| value.max(lower));
        self.upper.map_or(value, |upper| value.min(upper))
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        self.lower.is_none_or(|lower| value >= lower) && self.upper.is_none_or(|upper| value <= upper)
    }
}

/// Display metadata carried through to snapshots; never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Membership of a resource (or group parent) in a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group: GroupId,
    #[serde(default)]
    pub order: i32,
}

/// A concrete ledger resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub id: ResourceId,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_track: Option<TierTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupMembership>,
    /// Exact amount every non-system action must cost in this resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_action_cost: Option<i64>,
}

impl ResourceDefinition {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            bounds: None,
            tier_track: None,
            group: None,
            global_action_cost: None,
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    #[must_use]
    pub fn with_tiers(mut self, track: TierTrack) -> Self {
        self.tier_track = Some(track);
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<GroupId>, order: i32) -> Self {
        self.group = Some(GroupMembership {
            group: group.into(),
            order,
        });
        self
    }

    #[must_use]
    pub fn with_global_action_cost(mut self, amount: i64) -> Self {
        self.global_action_cost = Some(amount);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display.name = Some(name.into());
        self
    }
}

/// The virtual resource summarizing a group.
///
/// Its amount is always the sum of the group's children and can only be
/// read, never assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupParentDefinition {
    pub id: ResourceId,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_track: Option<TierTrack>,
    /// Parents may themselves be children of an outer group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupMembership>,
}

impl GroupParentDefinition {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            tier_track: None,
            group: None,
        }
    }

    #[must_use]
    pub fn with_tiers(mut self, track: TierTrack) -> Self {
        self.tier_track = Some(track);
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<GroupId>, order: i32) -> Self {
        self.group = Some(GroupMembership {
            group: group.into(),
            order,
        });
        self
    }
}

/// A resource group. Children are the resources (and nested parents)
/// whose membership names this group, ordered by `order` then id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub id: GroupId,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<GroupParentDefinition>,
    /// Filled in by the registry; ignored on input.
    #[serde(default, skip_deserializing)]
    pub children: Vec<ResourceId>,
}

impl GroupDefinition {
    pub fn new(id: impl Into<GroupId>) -> Self {
        Self {
            id: id.into(),
            order: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: GroupParentDefinition) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

/// Half-open tier range `[min, max)`; `max = None` is open-ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRange {
    pub min: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl TierRange {
    #[must_use]
    pub const fn new(min: i64, max: Option<i64>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, amount: i64) -> bool {
        amount >= self.min && self.max.is_none_or(|max| amount < max)
    }
}

/// Descriptive tier metadata, mirrored onto the tier's passive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDisplay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// How the tier's passive goes away, e.g. "while happiness is 5+".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierDefinition {
    pub id: TierId,
    pub range: TierRange,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enter_effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit_effects: Vec<Effect>,
    #[serde(default)]
    pub display: TierDisplay,
    /// Passive installed by `enter_effects`, kept in sync with `display`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive: Option<PassiveId>,
}

impl TierDefinition {
    pub fn new(id: impl Into<TierId>, range: TierRange) -> Self {
        Self {
            id: id.into(),
            range,
            enter_effects: Vec::new(),
            exit_effects: Vec::new(),
            display: TierDisplay::default(),
            passive: None,
        }
    }

    #[must_use]
    pub fn on_enter(mut self, effects: Vec<Effect>) -> Self {
        self.enter_effects = effects;
        self
    }

    #[must_use]
    pub fn on_exit(mut self, effects: Vec<Effect>) -> Self {
        self.exit_effects = effects;
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: TierDisplay) -> Self {
        self.display = display;
        self
    }

    #[must_use]
    pub fn with_passive(mut self, passive: impl Into<PassiveId>) -> Self {
        self.passive = Some(passive.into());
        self
    }
}

/// Ordered tiers for one resource or parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierTrack {
    pub id: String,
    pub tiers: Vec<TierDefinition>,
}

impl TierTrack {
    pub fn new(id: impl Into<String>, tiers: Vec<TierDefinition>) -> Self {
        Self {
            id: id.into(),
            tiers,
        }
    }

    /// Find the tier active at `amount`.
    ///
    /// Finite ranges are checked first, in track order. Above all of them,
    /// the last open-ended tier whose minimum is reached wins.
    #[must_use]
    pub fn tier_for(&self, amount: i64) -> Option<(usize, &TierDefinition)> {
        self.tiers
            .iter()
            .enumerate()
            .find(|(_, tier)| tier.range.max.is_some() && tier.range.contains(amount))
            .or_else(|| {
                self.tiers
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(_, tier)| tier.range.max.is_none() && amount >= tier.range.min)
            })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TierDefinition> {
        self.tiers.iter().find(|tier| tier.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mood_track() -> TierTrack {
        TierTrack::new(
            "mood",
            vec![
                TierDefinition::new("despair", TierRange::new(-10, Some(0))),
                TierDefinition::new("calm", TierRange::new(0, Some(5))),
                TierDefinition::new("radiant", TierRange::new(5, None)),
            ],
        )
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::range(0, 10);
        assert_eq!(bounds.clamp(15), 10);
        assert_eq!(bounds.clamp(-3), 0);
        assert_eq!(bounds.clamp(4), 4);

        let open = Bounds::at_least(0);
        assert_eq!(open.clamp(1_000), 1_000);
        assert!(open.contains(1_000));
        assert!(!open.contains(-1));
    }

    #[test]
    fn test_tier_for() {
        let track = mood_track();
        assert_eq!(track.tier_for(3).map(|(_, t)| t.id.as_str()), Some("calm"));
        assert_eq!(track.tier_for(5).map(|(_, t)| t.id.as_str()), Some("radiant"));
        assert_eq!(track.tier_for(500).map(|(i, _)| i), Some(2));
        assert_eq!(track.tier_for(-4).map(|(_, t)| t.id.as_str()), Some("despair"));
        assert!(track.tier_for(-11).is_none());
    }

    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "id": "happiness",
            "bounds": { "lower": -10, "upper": 10 },
            "tier_track": { "id": "mood", "tiers": [
                { "id": "calm", "range": { "min": 0, "max": 5 } },
                { "id": "radiant", "range": { "min": 5 } }
            ] }
        }"#;

        let def: ResourceDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.bounds, Some(Bounds::range(-10, 10)));
        assert_eq!(def.tier_track.unwrap().tiers.len(), 2);
    }
}
