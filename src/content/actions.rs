//! Action costs and performance.
//!
//! Performing an action is all-or-nothing up to the point of payment:
//! choices, affordability and the configuration the action's effects refer
//! to are checked before anything is mutated, so a rejected or misconfigured
//! action leaves the game untouched.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::numeric::{ensure_finite, RoundingMode};
use crate::core::{
    ActionId, ActionRejection, EngineError, EngineResult, FrameScope, GainCaptureScope,
    GameContext, PlayerId, ResourceId,
};
use crate::effects::{execute_effects, validate_effects, Effect};
use crate::ledger::{apply_value_change, ResourceGain, ValueChange};
use crate::stats::StatSourceFrame;

/// Effect-group choices: group id to option id.
pub type ActionChoices = BTreeMap<String, String>;

/// What an action cost and produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionOutcome {
    pub action: ActionId,
    pub costs: BTreeMap<ResourceId, i64>,
    /// The performing player's gains, drained from the recent-gains log.
    pub gains: Vec<ResourceGain>,
}

/// Final costs of `action` for `player`.
///
/// Non-system actions must list the global action cost resource at
/// exactly its declared amount. Cost modifiers then apply: flat deltas,
/// then percents against the flat-adjusted total. Results round to
/// nearest and never go below zero.
pub fn compute_action_costs(
    ctx: &GameContext,
    player: PlayerId,
    action: &str,
) -> EngineResult<BTreeMap<ResourceId, i64>> {
    let content = ctx.content();
    let definition = content.action(action)?;

    if !definition.system {
        if let Some((resource, expected)) = ctx.resource_registry().global_action_cost() {
            let found = definition.base_costs.get(resource).copied();
            if found != Some(expected) {
                return Err(EngineError::GlobalActionCostMismatch {
                    action: definition.id.clone(),
                    resource: resource.clone(),
                    expected,
                    found,
                });
            }
        }
    }

    let mut costs: BTreeMap<ResourceId, f64> = definition
        .base_costs
        .iter()
        .map(|(resource, &amount)| (resource.clone(), amount as f64))
        .collect();
    ctx.passives().modifiers().apply_cost(player, action, &mut costs);

    costs
        .into_iter()
        .map(|(resource, cost)| {
            let cost = ensure_finite(cost, || format!("cost of '{resource}' for '{action}'"))?;
            let rounded = RoundingMode::Nearest.apply(cost).max(0.0) as i64;
            Ok((resource, rounded))
        })
        .collect()
}

/// Perform `action` as the active player.
///
/// Runs the action's effects, then the chosen option of each effect
/// group, all under an `action` stat-source frame, then the player's
/// result modifiers for the action.
pub fn perform_action(
    ctx: &mut GameContext,
    action: &str,
    choices: &ActionChoices,
) -> EngineResult<ActionOutcome> {
    let player = ctx.active_player();
    let content = ctx.content();
    let definition = content.action(action)?;

    let mut chosen: Vec<&[Effect]> = Vec::with_capacity(definition.effect_groups.len());
    for group in &definition.effect_groups {
        let option_id = choices.get(&group.id).ok_or_else(|| ActionRejection::MissingChoice {
            action: definition.id.clone(),
            group: group.id.clone(),
        })?;
        let option = group.option(option_id).ok_or_else(|| ActionRejection::UnknownOption {
            group: group.id.clone(),
            option: option_id.clone(),
        })?;
        chosen.push(&option.effects);
    }

    let costs = compute_action_costs(ctx, player, action)?;
    for (resource, &required) in &costs {
        let available = ctx.player(player).resources().amount(resource.as_str());
        if available < required {
            return Err(ActionRejection::InsufficientResource {
                resource: resource.clone(),
                required,
                available,
            }
            .into());
        }
    }

    for effects in std::iter::once(definition.effects.as_slice()).chain(chosen.iter().copied()) {
        validate_effects(effects, ctx)?;
    }
    let results = ctx.passives().modifiers().result_effects(player, action);
    for effects in &results {
        validate_effects(effects, ctx)?;
    }

    debug!(%action, %player, ?costs, "performing action");
    // Gains produced here are reported in the outcome, not the outer log.
    // On an error the outer log is still restored.
    let mut capture = GainCaptureScope::new(ctx);
    for (resource, &cost) in &costs {
        if cost > 0 {
            let payment = ValueChange::amount(-(cost as f64)).unlogged();
            apply_value_change(&mut capture, player, resource, &payment)?;
        }
    }

    {
        let frame = StatSourceFrame::new("action", action).with_key(format!("action:{action}"));
        let mut scope = FrameScope::new(&mut capture, [frame]);
        execute_effects(&definition.effects, &mut scope, 1.0)?;
        for effects in chosen {
            execute_effects(effects, &mut scope, 1.0)?;
        }
    }

    for effects in &results {
        execute_effects(effects, &mut capture, 1.0)?;
    }

    let gains = capture.take_recent_gains();
    Ok(ActionOutcome {
        action: definition.id.clone(),
        costs,
        gains,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ActionDefinition, ContentRegistry, EffectGroup, EffectGroupOption};
    use crate::core::EngineConfig;
    use crate::effects::Method;
    use crate::ledger::{ResourceDefinition, ResourceRegistry};

    fn gain(key: &str, amount: i64) -> Effect {
        Effect::new("resource", Method::Add)
            .with_param("key", key)
            .with_param("amount", amount)
    }

    fn context(actions: Vec<ActionDefinition>) -> GameContext {
        let resources = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("ap").with_global_action_cost(1))
            .resource(ResourceDefinition::new("gold"))
            .build()
            .unwrap();
        let content = ContentRegistry::builder().actions(actions).build().unwrap();
        let mut ctx = GameContext::new(
            EngineConfig::new(2)
                .with_resources(resources)
                .with_content(content),
        )
        .unwrap();
        let player = ctx.active_player();
        apply_value_change(&mut ctx, player, &ResourceId::new("ap"), &ValueChange::amount(3.0))
            .unwrap();
        ctx.take_recent_gains();
        ctx
    }

    fn tax() -> ActionDefinition {
        ActionDefinition::new("tax")
            .with_cost("ap", 1)
            .with_effects(vec![gain("gold", 2)])
    }

    #[test]
    fn test_perform_pays_and_reports_gains() {
        let mut ctx = context(vec![tax()]);
        let outcome = perform_action(&mut ctx, "tax", &ActionChoices::new()).unwrap();

        assert_eq!(outcome.costs[&ResourceId::new("ap")], 1);
        assert_eq!(
            outcome.gains,
            vec![ResourceGain {
                resource: ResourceId::new("gold"),
                amount: 2
            }]
        );
        let resources = ctx.player(PlayerId::new(0)).resources();
        assert_eq!(resources.amount("ap"), 2);
        assert_eq!(resources.amount("gold"), 2);
    }

    #[test]
    fn test_global_action_cost_enforced() {
        let ctx = context(vec![
            ActionDefinition::new("free"),
            ActionDefinition::new("pricey").with_cost("ap", 2),
            ActionDefinition::new("reset").system(),
        ]);
        let player = PlayerId::new(0);

        assert!(matches!(
            compute_action_costs(&ctx, player, "free"),
            Err(EngineError::GlobalActionCostMismatch { found: None, .. })
        ));
        assert!(matches!(
            compute_action_costs(&ctx, player, "pricey"),
            Err(EngineError::GlobalActionCostMismatch { found: Some(2), .. })
        ));
        assert!(compute_action_costs(&ctx, player, "reset").is_ok());
    }

    #[test]
    fn test_insufficient_is_rejection() {
        let expensive = ActionDefinition::new("feast")
            .with_cost("ap", 1)
            .with_cost("gold", 5);
        let mut ctx = context(vec![expensive]);

        let err = perform_action(&mut ctx, "feast", &ActionChoices::new()).unwrap_err();
        assert!(err.is_rejection());
        // Nothing was paid.
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("ap"), 3);
    }

    #[test]
    fn test_effect_group_choices() {
        let raid = ActionDefinition::new("raid").with_cost("ap", 1).with_group(EffectGroup::new(
            "loot",
            vec![
                EffectGroupOption::new("gold", vec![gain("gold", 3)]),
                EffectGroupOption::new("nothing", vec![]),
            ],
        ));
        let mut ctx = context(vec![raid]);

        let missing = perform_action(&mut ctx, "raid", &ActionChoices::new()).unwrap_err();
        assert!(matches!(
            missing,
            EngineError::Rejected(ActionRejection::MissingChoice { .. })
        ));

        let choices = ActionChoices::from([("loot".to_string(), "silver".to_string())]);
        let unknown = perform_action(&mut ctx, "raid", &choices).unwrap_err();
        assert!(matches!(
            unknown,
            EngineError::Rejected(ActionRejection::UnknownOption { .. })
        ));

        let choices = ActionChoices::from([("loot".to_string(), "gold".to_string())]);
        perform_action(&mut ctx, "raid", &choices).unwrap();
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("gold"), 3);
    }

    #[test]
    fn test_misconfigured_effect_pays_nothing() {
        let broken = ActionDefinition::new("conjure")
            .with_cost("ap", 1)
            .with_effects(vec![gain("gold", 1), gain("mana", 2)]);
        let mut ctx = context(vec![broken]);
        let player = PlayerId::new(0);
        apply_value_change(&mut ctx, player, &ResourceId::new("gold"), &ValueChange::amount(1.0))
            .unwrap();
        apply_value_change(&mut ctx, player, &ResourceId::new("gold"), &ValueChange::amount(1.0))
            .unwrap();

        let err = perform_action(&mut ctx, "conjure", &ActionChoices::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownId { kind: "resource", .. }));
        assert!(!err.is_rejection());

        let resources = ctx.player(player).resources();
        assert_eq!(resources.amount("ap"), 3);
        assert_eq!(resources.amount("gold"), 2);
        assert_eq!(ctx.recent_gains().len(), 2);
    }

    #[test]
    fn test_outer_gains_restored_on_error() {
        let fractional = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 1.5);
        let broken = ActionDefinition::new("mint")
            .with_cost("ap", 1)
            .with_effects(vec![gain("gold", 2), fractional]);
        let mut ctx = context(vec![broken]);
        let player = PlayerId::new(0);
        apply_value_change(&mut ctx, player, &ResourceId::new("gold"), &ValueChange::amount(1.0))
            .unwrap();

        let err = perform_action(&mut ctx, "mint", &ActionChoices::new()).unwrap_err();
        assert!(matches!(err, EngineError::NonInteger { .. }));

        // The caller's gain survives, followed by what the action applied.
        let gains = ctx.take_recent_gains();
        assert_eq!(gains.len(), 2);
        assert_eq!(gains[0].amount, 1);
        assert_eq!(gains[1].amount, 2);
    }

    #[test]
    fn test_outer_gains_untouched_on_success() {
        let mut ctx = context(vec![tax()]);
        let player = PlayerId::new(0);
        apply_value_change(&mut ctx, player, &ResourceId::new("gold"), &ValueChange::amount(5.0))
            .unwrap();

        let outcome = perform_action(&mut ctx, "tax", &ActionChoices::new()).unwrap();
        assert_eq!(outcome.gains.len(), 1);
        assert_eq!(ctx.take_recent_gains().len(), 1);
    }

    #[test]
    fn test_unknown_action_is_fatal() {
        let mut ctx = context(vec![tax()]);
        let err = perform_action(&mut ctx, "pray", &ActionChoices::new()).unwrap_err();
        assert!(!err.is_rejection());
    }
}
