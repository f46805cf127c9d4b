//! Trigger collection.
//!
//! A trigger point (`"on_upkeep_phase"`, `"on_pay_upkeep_step"`, ...) owes
//! effects from everything the player owns. Bundles are gathered in a
//! fixed order: population roles, developments, buildings, then passives
//! in key order.
//!
//! Population bundles run once per head and development bundles once per
//! instance, via the multiplier. On [`PAY_UPKEEP_TRIGGER`] each source's
//! declared upkeep is turned into `resource:remove` effects ahead of its
//! own trigger effects.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{ActivePlayerScope, EngineResult, FrameScope, GameContext, PlayerId, ResourceId};
use crate::effects::{execute_effects, Effect, Method};
use crate::stats::{SourceLink, StatSourceFrame};

/// The trigger that also collects upkeep.
pub const PAY_UPKEEP_TRIGGER: &str = "on_pay_upkeep_step";

/// Effects owed by one source at a trigger point.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerBundle {
    pub source: SourceLink,
    /// Player the effects run for.
    pub player: PlayerId,
    pub effects: Vec<Effect>,
    pub multiplier: f64,
}

impl TriggerBundle {
    /// Attribution frame for stat changes the bundle makes.
    #[must_use]
    pub fn frame(&self, trigger: &str) -> StatSourceFrame {
        let id = self.source.id.clone().unwrap_or_default();
        StatSourceFrame::new(self.source.kind.clone(), id.clone())
            .with_key(format!("{}:{id}:{trigger}", self.source.kind))
    }
}

fn upkeep_effects(upkeep: &BTreeMap<ResourceId, i64>) -> impl Iterator<Item = Effect> + '_ {
    upkeep.iter().filter(|(_, &amount)| amount != 0).map(|(resource, &amount)| {
        Effect::new("resource", Method::Remove)
            .with_param("key", resource.as_str())
            .with_param("amount", amount)
    })
}

/// Gather the bundles `player` owes at `trigger`.
pub fn collect_trigger_effects(
    ctx: &GameContext,
    trigger: &str,
    player: PlayerId,
) -> EngineResult<Vec<TriggerBundle>> {
    let content = ctx.content();
    let state = ctx.player(player);
    let with_upkeep = trigger == PAY_UPKEEP_TRIGGER;
    let mut bundles = Vec::new();

    let mut push = |kind: &str,
                    id: &str,
                    upkeep: Option<&BTreeMap<ResourceId, i64>>,
                    effects: Option<&[Effect]>,
                    multiplier: f64| {
        let mut collected: Vec<Effect> = Vec::new();
        if let Some(upkeep) = upkeep.filter(|_| with_upkeep) {
            collected.extend(upkeep_effects(upkeep));
        }
        if let Some(effects) = effects {
            collected.extend_from_slice(effects);
        }
        if !collected.is_empty() {
            bundles.push(TriggerBundle {
                source: SourceLink::new(kind, id),
                player,
                effects: collected,
                multiplier,
            });
        }
    };

    for role in content.populations() {
        let count = state.population(role.id.as_str());
        if count > 0 {
            push(
                "population",
                role.id.as_str(),
                Some(&role.upkeep),
                role.trigger_effects(trigger),
                f64::from(count),
            );
        }
    }
    for development in content.developments() {
        let count = state.development_count(development.id.as_str());
        if count > 0 {
            push(
                "development",
                development.id.as_str(),
                Some(&development.upkeep),
                development.trigger_effects(trigger),
                f64::from(count),
            );
        }
    }
    for building in content.buildings() {
        if state.has_building(building.id.as_str()) {
            push(
                "building",
                building.id.as_str(),
                Some(&building.upkeep),
                building.trigger_effects(trigger),
                1.0,
            );
        }
    }
    for record in ctx.passives().list(Some(player)) {
        push("passive", record.id().as_str(), None, record.trigger_effects(trigger), 1.0);
    }
    Ok(bundles)
}

/// Collect and run everything `player` owes at `trigger`. Returns the
/// number of bundles run.
pub fn run_trigger(ctx: &mut GameContext, trigger: &str, player: PlayerId) -> EngineResult<usize> {
    let bundles = collect_trigger_effects(ctx, trigger, player)?;
    debug!(%trigger, %player, bundles = bundles.len(), "running trigger");
    for bundle in &bundles {
        let mut scope = ActivePlayerScope::new(ctx, bundle.player);
        let mut scope = FrameScope::new(&mut scope, [bundle.frame(trigger)]);
        execute_effects(&bundle.effects, &mut scope, bundle.multiplier)?;
    }
    Ok(bundles.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        BuildingDefinition, ContentRegistry, DevelopmentDefinition, PopulationDefinition,
    };
    use crate::core::{BuildingId, DevelopmentId, EngineConfig, RoleId};
    use crate::ledger::{ResourceDefinition, ResourceRegistry};
    use crate::passives::{add_passive, AddPassiveOptions, PassiveDefinition};

    fn gold(amount: i64) -> Effect {
        Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", amount)
    }

    fn context() -> GameContext {
        let resources = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .build()
            .unwrap();
        let content = ContentRegistry::builder()
            .population(
                PopulationDefinition::new("council")
                    .with_upkeep("gold", 1)
                    .with_trigger("on_growth_phase", vec![gold(2)]),
            )
            .development(
                DevelopmentDefinition::new("farm").with_trigger("on_growth_phase", vec![gold(1)]),
            )
            .building(BuildingDefinition::new("mill").with_upkeep("gold", 2))
            .build()
            .unwrap();
        let mut ctx = GameContext::new(
            EngineConfig::new(2)
                .with_resources(resources)
                .with_content(content),
        )
        .unwrap();
        let player = ctx.player_mut(PlayerId::new(0));
        player.set_population(&RoleId::new("council"), 2);
        player.set_development_count(&DevelopmentId::new("farm"), 3);
        player.insert_building(BuildingId::new("mill"));
        ctx
    }

    #[test]
    fn test_collect_order_and_multipliers() {
        let mut ctx = context();
        let passive = PassiveDefinition::new("harvest_festival", vec![])
            .with_trigger("on_growth_phase", vec![gold(5)]);
        add_passive(&mut ctx, passive, AddPassiveOptions::default()).unwrap();

        let bundles = collect_trigger_effects(&ctx, "on_growth_phase", PlayerId::new(0)).unwrap();
        let summary: Vec<_> = bundles
            .iter()
            .map(|b| (b.source.kind.as_str(), b.multiplier))
            .collect();
        assert_eq!(summary, vec![("population", 2.0), ("development", 3.0), ("passive", 1.0)]);

        // The other player owns nothing.
        assert!(collect_trigger_effects(&ctx, "on_growth_phase", PlayerId::new(1)).unwrap().is_empty());
    }

    #[test]
    fn test_upkeep_only_on_pay_step() {
        let ctx = context();
        let bundles = collect_trigger_effects(&ctx, PAY_UPKEEP_TRIGGER, PlayerId::new(0)).unwrap();
        let kinds: Vec<_> = bundles.iter().map(|b| b.source.kind.as_str()).collect();
        assert_eq!(kinds, vec!["population", "building"]);
        assert_eq!(bundles[0].effects[0].method, Some(Method::Remove));

        assert!(collect_trigger_effects(&ctx, "on_upkeep_phase", PlayerId::new(0)).unwrap().is_empty());
    }

    #[test]
    fn test_run_trigger() {
        let mut ctx = context();
        assert_eq!(run_trigger(&mut ctx, "on_growth_phase", PlayerId::new(0)).unwrap(), 2);
        // 2 council * 2 + 3 farms * 1
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("gold"), 7);

        run_trigger(&mut ctx, PAY_UPKEEP_TRIGGER, PlayerId::new(0)).unwrap();
        // 7 - 2 council upkeep - 2 mill upkeep
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("gold"), 3);
    }
}
