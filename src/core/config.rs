//! Engine configuration.
//!
//! Content is supplied once at startup, either assembled in code with the
//! [`EngineConfig`] builder or loaded from JSON [`RegistryTables`]. The
//! engine never hardcodes resources, actions or phases.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::error::{EngineError, EngineResult};
use super::player::PlayerId;
use crate::content::{
    ActionDefinition, BuildingDefinition, ContentRegistry, DevelopmentDefinition,
    PopulationDefinition,
};
use crate::effects::EffectRegistry;
use crate::ledger::{GroupDefinition, ResourceDefinition, ResourceRegistry};
use crate::phases::PhaseDefinition;

/// Registry tables as content authors write them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryTables {
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
    #[serde(default)]
    pub groups: Vec<GroupDefinition>,
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,
    #[serde(default)]
    pub buildings: Vec<BuildingDefinition>,
    #[serde(default)]
    pub developments: Vec<DevelopmentDefinition>,
    #[serde(default)]
    pub populations: Vec<PopulationDefinition>,
    #[serde(default)]
    pub phases: Vec<PhaseDefinition>,
}

impl RegistryTables {
    /// Parse tables from JSON.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| EngineError::InvalidDefinition(format!("registry tables: {err}")))
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of players (1-255).
    pub player_count: usize,

    /// Player who takes the first turn.
    pub starting_player: PlayerId,

    /// Frozen resource, group and tier definitions.
    pub resources: Rc<ResourceRegistry>,

    /// Actions, buildings, developments and population roles.
    pub content: Rc<ContentRegistry>,

    /// Turn structure, in order.
    pub phases: Vec<PhaseDefinition>,

    /// Effect handlers and evaluators. Defaults to the built-ins.
    pub effects: Rc<EffectRegistry>,
}

impl EngineConfig {
    /// Create a configuration with empty registries and built-in handlers.
    pub fn new(player_count: usize) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        Self {
            player_count,
            starting_player: PlayerId::new(0),
            resources: Rc::new(ResourceRegistry::default()),
            content: Rc::new(ContentRegistry::default()),
            phases: Vec::new(),
            effects: Rc::new(EffectRegistry::with_builtins()),
        }
    }

    /// Build a configuration from loaded tables.
    pub fn from_tables(player_count: usize, tables: RegistryTables) -> EngineResult<Self> {
        let resources = ResourceRegistry::builder()
            .resources(tables.resources)
            .groups(tables.groups)
            .build()?;
        let content = ContentRegistry::builder()
            .actions(tables.actions)
            .buildings(tables.buildings)
            .developments(tables.developments)
            .populations(tables.populations)
            .build()?;

        let mut config = Self::new(player_count)
            .with_resources(resources)
            .with_content(content);
        config.phases = tables.phases;
        Ok(config)
    }

    #[must_use]
    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = Rc::new(resources);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentRegistry) -> Self {
        self.content = Rc::new(content);
        self
    }

    /// Append a phase to the turn structure.
    #[must_use]
    pub fn with_phase(mut self, phase: PhaseDefinition) -> Self {
        self.phases.push(phase);
        self
    }

    /// Replace the effect registry.
    #[must_use]
    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.effects = Rc::new(effects);
        self
    }

    #[must_use]
    pub fn with_starting_player(mut self, player: PlayerId) -> Self {
        self.starting_player = player;
        self
    }

    /// Check cross-registry references.
    pub fn validate(&self) -> EngineResult<()> {
        if self.starting_player.index() >= self.player_count {
            return Err(EngineError::InvalidDefinition(format!(
                "starting player {} out of range for {} players",
                self.starting_player, self.player_count
            )));
        }
        self.content.validate(&self.resources)?;

        let mut seen = rustc_hash::FxHashSet::default();
        for phase in &self.phases {
            if !seen.insert(phase.id.as_str()) {
                return Err(EngineError::duplicate("phase", &phase.id));
            }
            phase.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let registry = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .build()
            .unwrap();
        let config = EngineConfig::new(3)
            .with_resources(registry)
            .with_phase(PhaseDefinition::new("growth"))
            .with_starting_player(PlayerId::new(2));

        assert_eq!(config.player_count, 3);
        assert_eq!(config.phases.len(), 1);
        assert!(config.resources.resource("gold").is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_starting_player_out_of_range() {
        let config = EngineConfig::new(2).with_starting_player(PlayerId::new(2));
        assert!(matches!(config.validate(), Err(EngineError::InvalidDefinition(_))));
    }

    #[test]
    fn test_duplicate_phase() {
        let config = EngineConfig::new(2)
            .with_phase(PhaseDefinition::new("growth"))
            .with_phase(PhaseDefinition::new("growth"));
        assert!(matches!(config.validate(), Err(EngineError::DuplicateId { kind: "phase", .. })));
    }

    #[test]
    fn test_from_tables() {
        let json = r#"{
            "resources": [
                { "id": "gold" },
                { "id": "ap", "global_action_cost": 1 }
            ],
            "actions": [
                { "id": "tax", "base_costs": { "ap": 1 },
                  "effects": [ { "type": "resource", "method": "add",
                                 "params": { "key": "gold", "amount": 2 } } ] }
            ],
            "phases": [
                { "id": "main", "action": true, "steps": [ { "id": "main" } ] }
            ]
        }"#;
        let tables = RegistryTables::from_json(json).unwrap();
        let config = EngineConfig::from_tables(2, tables).unwrap();

        assert_eq!(config.resources.global_action_cost().map(|(_, n)| n), Some(1));
        assert!(config.content.action("tax").is_ok());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            RegistryTables::from_json("{ not json"),
            Err(EngineError::InvalidDefinition(_))
        ));
    }

    #[test]
    #[should_panic(expected = "Must have at least 1 player")]
    fn test_zero_players() {
        EngineConfig::new(0);
    }
}
