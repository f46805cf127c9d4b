//! Content definitions: actions, buildings, developments and population
//! roles.
//!
//! These are plain data loaded from registry tables. The engine only
//! interprets their effect lists, costs and upkeep.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{ActionId, BuildingId, DevelopmentId, ResourceId, RoleId};
use crate::effects::Effect;
use crate::ledger::DisplayInfo;

/// Trigger-keyed effect lists (`"on_upkeep_phase"` -> effects).
pub type TriggerTable = BTreeMap<String, Vec<Effect>>;

/// One selectable option of an [`EffectGroup`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectGroupOption {
    pub id: String,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl EffectGroupOption {
    pub fn new(id: impl Into<String>, effects: Vec<Effect>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            effects,
        }
    }
}

/// A choice the player makes when performing an action: exactly one
/// option runs, after the action's own effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectGroup {
    pub id: String,
    pub options: Vec<EffectGroupOption>,
}

impl EffectGroup {
    pub fn new(id: impl Into<String>, options: Vec<EffectGroupOption>) -> Self {
        Self {
            id: id.into(),
            options,
        }
    }

    #[must_use]
    pub fn option(&self, id: &str) -> Option<&EffectGroupOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

/// Something a player can do on their action step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,
    #[serde(default)]
    pub display: DisplayInfo,
    /// System actions are exempt from the global action cost.
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub base_costs: BTreeMap<ResourceId, i64>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effect_groups: Vec<EffectGroup>,
}

impl ActionDefinition {
    pub fn new(id: impl Into<ActionId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            system: false,
            base_costs: BTreeMap::new(),
            effects: Vec::new(),
            effect_groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_cost(mut self, resource: impl Into<ResourceId>, amount: i64) -> Self {
        self.base_costs.insert(resource.into(), amount);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: Vec<Effect>) -> Self {
        self.effects = effects;
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: EffectGroup) -> Self {
        self.effect_groups.push(group);
        self
    }

    #[must_use]
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingDefinition {
    pub id: BuildingId,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default)]
    pub costs: BTreeMap<ResourceId, i64>,
    /// Paid on the upkeep step.
    #[serde(default)]
    pub upkeep: BTreeMap<ResourceId, i64>,
    /// Installed as a passive while the building stands.
    #[serde(default)]
    pub on_build: Vec<Effect>,
    #[serde(default)]
    pub triggers: TriggerTable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentDefinition {
    pub id: DevelopmentId,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default)]
    pub upkeep: BTreeMap<ResourceId, i64>,
    /// Installed as a passive per development instance.
    #[serde(default)]
    pub on_build: Vec<Effect>,
    #[serde(default)]
    pub triggers: TriggerTable,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationDefinition {
    pub id: RoleId,
    #[serde(default)]
    pub display: DisplayInfo,
    /// Paid per head on the upkeep step.
    #[serde(default)]
    pub upkeep: BTreeMap<ResourceId, i64>,
    #[serde(default)]
    pub on_assigned: Vec<Effect>,
    #[serde(default)]
    pub on_unassigned: Vec<Effect>,
    #[serde(default)]
    pub triggers: TriggerTable,
}

macro_rules! impl_owned_content {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub fn with_upkeep(mut self, resource: impl Into<ResourceId>, amount: i64) -> Self {
                self.upkeep.insert(resource.into(), amount);
                self
            }

            #[must_use]
            pub fn with_trigger(mut self, trigger: impl Into<String>, effects: Vec<Effect>) -> Self {
                self.triggers.insert(trigger.into(), effects);
                self
            }

            /// Effects bound to `trigger`, if any.
            #[must_use]
            pub fn trigger_effects(&self, trigger: &str) -> Option<&[Effect]> {
                self.triggers.get(trigger).map(Vec::as_slice)
            }
        }
    };
}

impl_owned_content!(BuildingDefinition);
impl_owned_content!(DevelopmentDefinition);
impl_owned_content!(PopulationDefinition);

impl BuildingDefinition {
    pub fn new(id: impl Into<BuildingId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            costs: BTreeMap::new(),
            upkeep: BTreeMap::new(),
            on_build: Vec::new(),
            triggers: TriggerTable::new(),
        }
    }

    #[must_use]
    pub fn with_cost(mut self, resource: impl Into<ResourceId>, amount: i64) -> Self {
        self.costs.insert(resource.into(), amount);
        self
    }

    #[must_use]
    pub fn with_on_build(mut self, effects: Vec<Effect>) -> Self {
        self.on_build = effects;
        self
    }
}

impl DevelopmentDefinition {
    pub fn new(id: impl Into<DevelopmentId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            upkeep: BTreeMap::new(),
            on_build: Vec::new(),
            triggers: TriggerTable::new(),
        }
    }

    #[must_use]
    pub fn with_on_build(mut self, effects: Vec<Effect>) -> Self {
        self.on_build = effects;
        self
    }
}

impl PopulationDefinition {
    pub fn new(id: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            display: DisplayInfo::default(),
            upkeep: BTreeMap::new(),
            on_assigned: Vec::new(),
            on_unassigned: Vec::new(),
            triggers: TriggerTable::new(),
        }
    }

    #[must_use]
    pub fn with_on_assigned(mut self, effects: Vec<Effect>) -> Self {
        self.on_assigned = effects;
        self
    }

    #[must_use]
    pub fn with_on_unassigned(mut self, effects: Vec<Effect>) -> Self {
        self.on_unassigned = effects;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_from_json() {
        let json = r#"{
            "id": "raid",
            "base_costs": { "ap": 1 },
            "effect_groups": [
                { "id": "target", "options": [ { "id": "farm" }, { "id": "mine", "effects": [] } ] }
            ]
        }"#;
        let action: ActionDefinition = serde_json::from_str(json).unwrap();

        assert!(!action.system);
        assert_eq!(action.base_costs[&ResourceId::new("ap")], 1);
        assert!(action.effect_groups[0].option("mine").is_some());
        assert!(action.effect_groups[0].option("quarry").is_none());
    }

    #[test]
    fn test_population_builder() {
        let council = PopulationDefinition::new("council")
            .with_upkeep("gold", 1)
            .with_trigger("on_growth_phase", vec![]);

        assert_eq!(council.id, RoleId::new("council"));
        assert_eq!(council.upkeep[&ResourceId::new("gold")], 1);
        assert!(council.trigger_effects("on_growth_phase").is_some());
        assert!(council.trigger_effects("on_upkeep_phase").is_none());
    }
}
