//! Cost, result and evaluation modifiers.
//!
//! Modifiers are registered by content effects (`cost_mod:add`, ...) and
//! keyed by `(id, owner)`. Each registry keeps registration order, which
//! matters for cost modifiers: flat deltas apply in that order before any
//! percent.

use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{ActionId, PlayerId, ResourceId};
use crate::effects::Effect;
use crate::ledger::ResourceGain;

/// Common identity of registered modifiers.
pub trait Modifier {
    fn id(&self) -> &str;
    fn owner(&self) -> PlayerId;

    /// True if this modifier applies to `action` (or to every action).
    fn applies_to(&self, action: &str) -> bool;
}

/// Adjusts action costs: flat deltas, then percent of the flat-adjusted
/// total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostModifier {
    pub id: String,
    pub owner: PlayerId,
    /// `None` applies to every action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionId>,
    #[serde(default)]
    pub flat: BTreeMap<ResourceId, f64>,
    /// Fractions: `0.5` adds half the flat-adjusted cost.
    #[serde(default)]
    pub percent: BTreeMap<ResourceId, f64>,
}

/// Side effects run after an action completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultModifier {
    pub id: String,
    pub owner: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionId>,
    pub effects: Vec<Effect>,
}

/// Percent adjustment of gains produced under an evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationModifier {
    pub id: String,
    pub owner: PlayerId,
    /// Exact evaluator target key, e.g. `"development:farm"`.
    pub target: String,
    /// Applies to every gain.
    #[serde(default)]
    pub percent: f64,
    /// Applies to gains of one resource.
    #[serde(default)]
    pub per_resource: BTreeMap<ResourceId, f64>,
}

macro_rules! impl_modifier {
    ($($ty:ty),*) => {
        $(
            impl Modifier for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn owner(&self) -> PlayerId {
                    self.owner
                }

                fn applies_to(&self, action: &str) -> bool {
                    self.action.as_ref().is_none_or(|only| only.as_str() == action)
                }
            }
        )*
    };
}

impl_modifier!(CostModifier, ResultModifier);

impl Modifier for EvaluationModifier {
    fn id(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> PlayerId {
        self.owner
    }

    fn applies_to(&self, _action: &str) -> bool {
        true
    }
}

fn replace<M: Modifier + Clone>(list: &mut Vector<M>, modifier: M) {
    remove(list, modifier.id(), modifier.owner());
    list.push_back(modifier);
}

fn remove<M: Modifier + Clone>(list: &mut Vector<M>, id: &str, owner: PlayerId) -> bool {
    let before = list.len();
    list.retain(|m| !(m.id() == id && m.owner() == owner));
    list.len() != before
}

/// All registered modifiers, in registration order.
#[derive(Clone, Debug, Default)]
pub struct ModifierRegistry {
    cost: Vector<CostModifier>,
    result: Vector<ResultModifier>,
    evaluation: Vector<EvaluationModifier>,
}

impl ModifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Registration ===

    /// Register a cost modifier. A modifier with the same id and owner is
    /// replaced and moves to the end of the order.
    pub fn register_cost(&mut self, modifier: CostModifier) {
        replace(&mut self.cost, modifier);
    }

    pub fn remove_cost(&mut self, id: &str, owner: PlayerId) -> bool {
        remove(&mut self.cost, id, owner)
    }

    pub fn register_result(&mut self, modifier: ResultModifier) {
        replace(&mut self.result, modifier);
    }

    pub fn remove_result(&mut self, id: &str, owner: PlayerId) -> bool {
        remove(&mut self.result, id, owner)
    }

    pub fn register_evaluation(&mut self, modifier: EvaluationModifier) {
        replace(&mut self.evaluation, modifier);
    }

    pub fn remove_evaluation(&mut self, id: &str, owner: PlayerId) -> bool {
        remove(&mut self.evaluation, id, owner)
    }

    pub fn cost_modifiers(&self) -> impl Iterator<Item = &CostModifier> {
        self.cost.iter()
    }

    pub fn result_modifiers(&self) -> impl Iterator<Item = &ResultModifier> {
        self.result.iter()
    }

    pub fn evaluation_modifiers(&self) -> impl Iterator<Item = &EvaluationModifier> {
        self.evaluation.iter()
    }

    // === Application ===

    /// Apply `owner`'s cost modifiers for `action` to `costs` in place.
    ///
    /// Flat deltas accumulate in registration order; percent totals are
    /// applied once at the end against the flat-adjusted cost.
    pub fn apply_cost(&self, owner: PlayerId, action: &str, costs: &mut BTreeMap<ResourceId, f64>) {
        let mut percent_totals: BTreeMap<&ResourceId, f64> = BTreeMap::new();
        for modifier in self.cost.iter().filter(|m| m.owner == owner && m.applies_to(action)) {
            for (resource, delta) in &modifier.flat {
                *costs.entry(resource.clone()).or_insert(0.0) += delta;
            }
            for (resource, percent) in &modifier.percent {
                *percent_totals.entry(resource).or_insert(0.0) += percent;
            }
        }
        for (resource, percent) in percent_totals {
            if let Some(cost) = costs.get_mut(resource) {
                *cost += *cost * percent;
            }
        }
    }

    /// Effect lists of `owner`'s result modifiers for `action`.
    #[must_use]
    pub fn result_effects(&self, owner: PlayerId, action: &str) -> Vec<Vec<Effect>> {
        self.result
            .iter()
            .filter(|m| m.owner == owner && m.applies_to(action))
            .map(|m| m.effects.clone())
            .collect()
    }

    /// Combined percent for gains of `resource` under `target`.
    #[must_use]
    pub fn evaluation_percent(&self, owner: PlayerId, target: &str, resource: &str) -> f64 {
        self.evaluation
            .iter()
            .filter(|m| m.owner == owner && m.target == target)
            .map(|m| m.percent + m.per_resource.get(resource).copied().unwrap_or(0.0))
            .sum()
    }

    /// Scale each gain by `1 + percent` in place, rounding to nearest.
    /// Gains whose combined percent is exactly zero are left alone.
    pub fn apply_evaluation(&self, owner: PlayerId, target: &str, gains: &mut [ResourceGain]) {
        for gain in gains {
            let percent = self.evaluation_percent(owner, target, gain.resource.as_str());
            if percent == 0.0 {
                continue;
            }
            gain.amount = (gain.amount as f64 * (1.0 + percent)).round() as i64;
        }
    }
}
