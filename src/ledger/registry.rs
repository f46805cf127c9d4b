//! Frozen resource registry.
//!
//! [`ResourceRegistryBuilder`] collects definitions, validates them and
//! produces an immutable [`ResourceRegistry`]. The registry owns the
//! child/parent index used for group aggregation and tier propagation.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::definition::{
    GroupDefinition, GroupMembership, GroupParentDefinition, ResourceDefinition, TierTrack,
};
use crate::core::{EngineError, EngineResult, GroupId, ResourceId};

/// Parent chain of a resource, innermost first.
pub type Ancestors = SmallVec<[ResourceId; 4]>;

/// Collects resource and group definitions for validation.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistryBuilder {
    resources: Vec<ResourceDefinition>,
    groups: Vec<GroupDefinition>,
}

impl ResourceRegistryBuilder {
    #[must_use]
    pub fn resource(mut self, definition: ResourceDefinition) -> Self {
        self.resources.push(definition);
        self
    }

    #[must_use]
    pub fn resources(mut self, definitions: impl IntoIterator<Item = ResourceDefinition>) -> Self {
        self.resources.extend(definitions);
        self
    }

    #[must_use]
    pub fn group(mut self, definition: GroupDefinition) -> Self {
        self.groups.push(definition);
        self
    }

    #[must_use]
    pub fn groups(mut self, definitions: impl IntoIterator<Item = GroupDefinition>) -> Self {
        self.groups.extend(definitions);
        self
    }

    /// Validate and freeze.
    ///
    /// Fails on duplicate ids, memberships naming unknown groups, parent ids
    /// colliding with resource ids, inverted bounds, malformed tier tracks,
    /// group cycles and more than one global action cost.
    pub fn build(self) -> EngineResult<ResourceRegistry> {
        let mut resources = FxHashMap::default();
        let mut order = Vec::with_capacity(self.resources.len());
        let mut global_action_cost: Option<(ResourceId, i64)> = None;

        for definition in self.resources {
            if resources.contains_key(&definition.id) {
                return Err(EngineError::duplicate("resource", &definition.id));
            }
            if let Some(bounds) = definition.bounds {
                if let (Some(lower), Some(upper)) = (bounds.lower, bounds.upper) {
                    if lower > upper {
                        return Err(EngineError::InvalidDefinition(format!(
                            "resource '{}' has lower bound {lower} above upper bound {upper}",
                            definition.id
                        )));
                    }
                }
            }
            if let Some(track) = &definition.tier_track {
                validate_track(&definition.id, track)?;
            }
            if let Some(amount) = definition.global_action_cost {
                if let Some((first, _)) = &global_action_cost {
                    return Err(EngineError::ConflictingGlobalActionCost {
                        first: first.clone(),
                        second: definition.id.clone(),
                    });
                }
                global_action_cost = Some((definition.id.clone(), amount));
            }
            order.push(definition.id.clone());
            resources.insert(definition.id.clone(), definition);
        }

        let mut groups: FxHashMap<GroupId, GroupDefinition> = FxHashMap::default();
        let mut group_order = Vec::with_capacity(self.groups.len());
        let mut parents: FxHashMap<ResourceId, GroupId> = FxHashMap::default();

        for mut definition in self.groups {
            if groups.contains_key(&definition.id) {
                return Err(EngineError::duplicate("group", &definition.id));
            }
            definition.children.clear();
            if let Some(parent) = &definition.parent {
                if resources.contains_key(&parent.id) || parents.contains_key(&parent.id) {
                    return Err(EngineError::duplicate("resource", &parent.id));
                }
                if let Some(track) = &parent.tier_track {
                    validate_track(&parent.id, track)?;
                }
                parents.insert(parent.id.clone(), definition.id.clone());
            }
            group_order.push((definition.order, definition.id.clone()));
            groups.insert(definition.id.clone(), definition);
        }
        group_order.sort();

        // Members: concrete resources and nested parents.
        let mut members: Vec<(GroupId, i32, ResourceId)> = Vec::new();
        for definition in resources.values() {
            if let Some(GroupMembership { group, order }) = &definition.group {
                members.push((group.clone(), *order, definition.id.clone()));
            }
        }
        for group in groups.values() {
            if let Some(parent) = &group.parent {
                if let Some(GroupMembership { group: outer, order }) = &parent.group {
                    members.push((outer.clone(), *order, parent.id.clone()));
                }
            }
        }
        members.sort_by(|a, b| (a.1, &a.2).cmp(&(b.1, &b.2)));

        let mut parent_of = FxHashMap::default();
        let mut children_of: FxHashMap<ResourceId, Vec<ResourceId>> = FxHashMap::default();
        for (group_id, _, member) in members {
            let group = groups
                .get_mut(&group_id)
                .ok_or_else(|| EngineError::unknown("group", &group_id))?;
            group.children.push(member.clone());
            if let Some(parent) = &group.parent {
                if parent.id == member {
                    return Err(EngineError::InvalidDefinition(format!(
                        "group parent '{member}' cannot be its own child"
                    )));
                }
                parent_of.insert(member.clone(), parent.id.clone());
                children_of.entry(parent.id.clone()).or_default().push(member);
            }
        }

        let registry = ResourceRegistry {
            resources,
            order,
            groups,
            group_order: group_order.into_iter().map(|(_, id)| id).collect(),
            parents,
            parent_of,
            children_of,
            global_action_cost,
        };
        registry.check_acyclic()?;
        Ok(registry)
    }
}

fn validate_track(owner: &ResourceId, track: &TierTrack) -> EngineResult<()> {
    let mut seen = FxHashSet::default();
    for tier in &track.tiers {
        if !seen.insert(tier.id.as_str()) {
            return Err(EngineError::duplicate("tier", &tier.id));
        }
        if let Some(max) = tier.range.max {
            if max <= tier.range.min {
                return Err(EngineError::InvalidDefinition(format!(
                    "tier '{}' on '{owner}' has an empty range [{}, {max})",
                    tier.id, tier.range.min
                )));
            }
        }
    }
    Ok(())
}

/// Immutable resource registry. The default registry is empty.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: FxHashMap<ResourceId, ResourceDefinition>,
    order: Vec<ResourceId>,
    groups: FxHashMap<GroupId, GroupDefinition>,
    group_order: Vec<GroupId>,
    /// Parent id -> owning group.
    parents: FxHashMap<ResourceId, GroupId>,
    /// Child (resource or nested parent) -> parent id.
    parent_of: FxHashMap<ResourceId, ResourceId>,
    children_of: FxHashMap<ResourceId, Vec<ResourceId>>,
    global_action_cost: Option<(ResourceId, i64)>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::default()
    }

    // === Lookup ===

    /// A concrete resource definition.
    #[must_use]
    pub fn resource(&self, id: &str) -> Option<&ResourceDefinition> {
        self.resources.get(id)
    }

    /// A group parent definition.
    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&GroupParentDefinition> {
        let group = self.parents.get(id)?;
        self.groups.get(group)?.parent.as_ref()
    }

    #[must_use]
    pub fn group(&self, id: &str) -> Option<&GroupDefinition> {
        self.groups.get(id)
    }

    #[must_use]
    pub fn is_parent(&self, id: &str) -> bool {
        self.parents.contains_key(id)
    }

    /// True for both concrete resources and parents.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id) || self.parents.contains_key(id)
    }

    /// Concrete resource ids in definition order.
    pub fn resource_ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.order.iter()
    }

    /// Parent ids in group order.
    pub fn parent_ids(&self) -> impl Iterator<Item = &ResourceId> {
        self.group_order
            .iter()
            .filter_map(|group| self.groups.get(group)?.parent.as_ref())
            .map(|parent| &parent.id)
    }

    /// Groups in `order`, then id.
    pub fn groups(&self) -> impl Iterator<Item = &GroupDefinition> {
        self.group_order.iter().filter_map(|id| self.groups.get(id))
    }

    // === Aggregation ===

    /// The immediate parent of a resource or nested parent.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&ResourceId> {
        self.parent_of.get(id)
    }

    /// Direct children of a parent.
    #[must_use]
    pub fn children_of(&self, id: &str) -> &[ResourceId] {
        self.children_of.get(id).map_or(&[], Vec::as_slice)
    }

    /// Parent chain of `id`, innermost first. Stops on a revisit.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> Ancestors {
        let mut chain = Ancestors::new();
        let mut current = self.parent_of.get(id);
        while let Some(parent) = current {
            if parent.as_str() == id || chain.contains(parent) {
                break;
            }
            chain.push(parent.clone());
            current = self.parent_of.get(parent.as_str());
        }
        chain
    }

    // === Tiers ===

    /// Tier track for a resource or parent.
    #[must_use]
    pub fn tier_track(&self, id: &str) -> Option<&TierTrack> {
        match self.resources.get(id) {
            Some(definition) => definition.tier_track.as_ref(),
            None => self.parent(id)?.tier_track.as_ref(),
        }
    }

    /// Every resource and parent that carries a tier track.
    #[must_use]
    pub fn tiered_ids(&self) -> Vec<ResourceId> {
        self.order
            .iter()
            .chain(self.parent_ids())
            .filter(|id| self.tier_track(id.as_str()).is_some())
            .cloned()
            .collect()
    }

    // === Costs ===

    /// The resource every non-system action must pay, and how much.
    #[must_use]
    pub fn global_action_cost(&self) -> Option<(&ResourceId, i64)> {
        self.global_action_cost.as_ref().map(|(id, amount)| (id, *amount))
    }

    fn check_acyclic(&self) -> EngineResult<()> {
        for start in self.parent_of.keys() {
            let mut seen = FxHashSet::default();
            let mut current = Some(start);
            while let Some(id) = current {
                if !seen.insert(id) {
                    return Err(EngineError::InvalidDefinition(format!(
                        "group nesting through '{start}' forms a cycle"
                    )));
                }
                current = self.parent_of.get(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::definition::{Bounds, TierDefinition, TierRange};

    fn population_registry() -> ResourceRegistry {
        ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .resource(ResourceDefinition::new("legion").in_group("population", 2))
            .resource(ResourceDefinition::new("council").in_group("population", 1))
            .group(
                GroupDefinition::new("population")
                    .with_parent(GroupParentDefinition::new("populationTotal")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_children_ordered() {
        let registry = population_registry();
        let group = registry.group("population").unwrap();

        let children: Vec<_> = group.children.iter().map(ResourceId::as_str).collect();
        assert_eq!(children, vec!["council", "legion"]);
        assert_eq!(registry.children_of("populationTotal").len(), 2);
        assert_eq!(registry.parent_of("legion").map(ResourceId::as_str), Some("populationTotal"));
        assert!(registry.is_parent("populationTotal"));
        assert!(registry.parent_of("gold").is_none());
    }

    #[test]
    fn test_nested_ancestors() {
        let registry = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("wheat").in_group("food", 0))
            .group(
                GroupDefinition::new("food")
                    .with_parent(GroupParentDefinition::new("foodTotal").in_group("goods", 0)),
            )
            .group(GroupDefinition::new("goods").with_parent(GroupParentDefinition::new("goodsTotal")))
            .build()
            .unwrap();

        let chain: Vec<_> = registry.ancestors("wheat").into_iter().collect();
        assert_eq!(chain, vec![ResourceId::new("foodTotal"), ResourceId::new("goodsTotal")]);
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let result = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .resource(ResourceDefinition::new("gold"))
            .build();

        assert!(matches!(result, Err(EngineError::DuplicateId { kind: "resource", .. })));
    }

    #[test]
    fn test_parent_id_collision_rejected() {
        let result = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .group(GroupDefinition::new("g").with_parent(GroupParentDefinition::new("gold")))
            .build();

        assert!(matches!(result, Err(EngineError::DuplicateId { .. })));
    }

    #[test]
    fn test_unknown_group_rejected() {
        let result = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold").in_group("missing", 0))
            .build();

        assert!(matches!(result, Err(EngineError::UnknownId { kind: "group", .. })));
    }

    #[test]
    fn test_conflicting_global_action_cost() {
        let result = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("ap").with_global_action_cost(1))
            .resource(ResourceDefinition::new("focus").with_global_action_cost(1))
            .build();

        assert!(matches!(result, Err(EngineError::ConflictingGlobalActionCost { .. })));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold").with_bounds(Bounds::range(5, 1)))
            .build();

        assert!(matches!(result, Err(EngineError::InvalidDefinition(_))));
    }

    #[test]
    fn test_tiered_ids() {
        let track = TierTrack::new(
            "mood",
            vec![TierDefinition::new("calm", TierRange::new(0, None))],
        );
        let registry = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("happiness").with_tiers(track))
            .resource(ResourceDefinition::new("gold"))
            .build()
            .unwrap();

        assert_eq!(registry.tiered_ids(), vec![ResourceId::new("happiness")]);
    }
}
