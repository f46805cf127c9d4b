//! Frozen content registry.
//!
//! Lookups by id are fatal when the id is missing: content that names an
//! action, building, development or role that does not exist is broken.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::hash::Hash;

use super::definition::{
    ActionDefinition, BuildingDefinition, DevelopmentDefinition, PopulationDefinition,
};
use crate::core::{ActionId, BuildingId, DevelopmentId, EngineError, EngineResult, ResourceId, RoleId};
use crate::ledger::ResourceRegistry;

/// Collects content definitions for validation.
#[derive(Clone, Debug, Default)]
pub struct ContentRegistryBuilder {
    actions: Vec<ActionDefinition>,
    buildings: Vec<BuildingDefinition>,
    developments: Vec<DevelopmentDefinition>,
    populations: Vec<PopulationDefinition>,
}

impl ContentRegistryBuilder {
    #[must_use]
    pub fn action(mut self, definition: ActionDefinition) -> Self {
        self.actions.push(definition);
        self
    }

    #[must_use]
    pub fn actions(mut self, definitions: impl IntoIterator<Item = ActionDefinition>) -> Self {
        self.actions.extend(definitions);
        self
    }

    #[must_use]
    pub fn building(mut self, definition: BuildingDefinition) -> Self {
        self.buildings.push(definition);
        self
    }

    #[must_use]
    pub fn buildings(mut self, definitions: impl IntoIterator<Item = BuildingDefinition>) -> Self {
        self.buildings.extend(definitions);
        self
    }

    #[must_use]
    pub fn development(mut self, definition: DevelopmentDefinition) -> Self {
        self.developments.push(definition);
        self
    }

    #[must_use]
    pub fn developments(
        mut self,
        definitions: impl IntoIterator<Item = DevelopmentDefinition>,
    ) -> Self {
        self.developments.extend(definitions);
        self
    }

    #[must_use]
    pub fn population(mut self, definition: PopulationDefinition) -> Self {
        self.populations.push(definition);
        self
    }

    #[must_use]
    pub fn populations(mut self, definitions: impl IntoIterator<Item = PopulationDefinition>) -> Self {
        self.populations.extend(definitions);
        self
    }

    /// Validate ids and freeze.
    pub fn build(self) -> EngineResult<ContentRegistry> {
        Ok(ContentRegistry {
            actions: index("action", self.actions, |d| d.id.clone())?,
            buildings: index("building", self.buildings, |d| d.id.clone())?,
            developments: index("development", self.developments, |d| d.id.clone())?,
            populations: index("population", self.populations, |d| d.id.clone())?,
        })
    }
}

/// Index definitions by id, keeping declaration order.
fn index<K, T>(
    kind: &'static str,
    definitions: Vec<T>,
    id: impl Fn(&T) -> K,
) -> EngineResult<Indexed<K, T>>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    let mut positions = FxHashMap::default();
    for (position, definition) in definitions.iter().enumerate() {
        let key = id(definition);
        if positions.insert(key.clone(), position).is_some() {
            return Err(EngineError::duplicate(kind, key));
        }
    }
    Ok(Indexed {
        positions,
        definitions,
    })
}

#[derive(Clone, Debug)]
struct Indexed<K, T> {
    positions: FxHashMap<K, usize>,
    definitions: Vec<T>,
}

impl<K, T> Default for Indexed<K, T> {
    fn default() -> Self {
        Self {
            positions: FxHashMap::default(),
            definitions: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + std::borrow::Borrow<str>, T> Indexed<K, T> {
    fn get(&self, kind: &'static str, id: &str) -> EngineResult<&T> {
        self.positions
            .get(id)
            .map(|&position| &self.definitions[position])
            .ok_or_else(|| EngineError::unknown(kind, id))
    }
}

/// Actions, buildings, developments and population roles by id.
#[derive(Clone, Debug, Default)]
pub struct ContentRegistry {
    actions: Indexed<ActionId, ActionDefinition>,
    buildings: Indexed<BuildingId, BuildingDefinition>,
    developments: Indexed<DevelopmentId, DevelopmentDefinition>,
    populations: Indexed<RoleId, PopulationDefinition>,
}

impl ContentRegistry {
    #[must_use]
    pub fn builder() -> ContentRegistryBuilder {
        ContentRegistryBuilder::default()
    }

    // === Lookup ===

    pub fn action(&self, id: &str) -> EngineResult<&ActionDefinition> {
        self.actions.get("action", id)
    }

    pub fn building(&self, id: &str) -> EngineResult<&BuildingDefinition> {
        self.buildings.get("building", id)
    }

    pub fn development(&self, id: &str) -> EngineResult<&DevelopmentDefinition> {
        self.developments.get("development", id)
    }

    pub fn population(&self, id: &str) -> EngineResult<&PopulationDefinition> {
        self.populations.get("population", id)
    }

    /// Actions in declaration order.
    pub fn actions(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.definitions.iter()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingDefinition> {
        self.buildings.definitions.iter()
    }

    pub fn developments(&self) -> impl Iterator<Item = &DevelopmentDefinition> {
        self.developments.definitions.iter()
    }

    pub fn populations(&self) -> impl Iterator<Item = &PopulationDefinition> {
        self.populations.definitions.iter()
    }

    // === Validation ===

    /// Check that every cost and upkeep names a concrete resource.
    pub fn validate(&self, resources: &ResourceRegistry) -> EngineResult<()> {
        let check = |table: &BTreeMap<ResourceId, i64>| -> EngineResult<()> {
            for id in table.keys() {
                if resources.is_parent(id.as_str()) {
                    return Err(EngineError::ParentMutation(id.clone()));
                }
                if resources.resource(id.as_str()).is_none() {
                    return Err(EngineError::unknown("resource", id));
                }
            }
            Ok(())
        };

        for action in self.actions() {
            check(&action.base_costs)?;
        }
        for building in self.buildings() {
            check(&building.costs)?;
            check(&building.upkeep)?;
        }
        for development in self.developments() {
            check(&development.upkeep)?;
        }
        for population in self.populations() {
            check(&population.upkeep)?;
        }
        Ok(())
    }
}
