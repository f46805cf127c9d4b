//! Phase and turn advancement.
//!
//! Each call to [`advance`] executes the step under the clock for the
//! active player, then moves the clock one step forward:
//!
//! ```text
//! step -> next step
//! last step -> first step of the next phase
//! last phase -> first phase, next player
//! back to the starting player -> next turn
//! ```
//!
//! Executing a step runs its trigger points, then its own effects. A step
//! is skipped (nothing runs, the clock still moves) while the player has a
//! skip flag for the step or its phase.

use tracing::debug;

use super::triggers::run_trigger;
use crate::core::{
    EngineError, EngineResult, FrameScope, GameClock, GameContext, PhaseId, PlayerId, StepId,
};
use crate::effects::execute_effects;
use crate::stats::StatSourceFrame;

/// What one call to [`advance`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvanceOutcome {
    pub player: PlayerId,
    pub phase: PhaseId,
    /// `None` for a phase with no steps.
    pub step: Option<StepId>,
    pub skipped: bool,
    /// Trigger bundles run.
    pub bundles: usize,
    /// Clock after advancing.
    pub clock: GameClock,
    pub turn_advanced: bool,
}

/// Phase and step under the clock.
pub fn current_position(ctx: &GameContext) -> EngineResult<(PhaseId, Option<StepId>)> {
    let phases = ctx.phases();
    let clock = ctx.clock();
    let phase = phases
        .get(clock.phase_index)
        .ok_or_else(|| EngineError::InvalidDefinition("no phases configured".into()))?;
    let step = phase.steps.get(clock.step_index).map(|step| step.id.clone());
    Ok((phase.id.clone(), step))
}

/// True while the clock is in an action phase.
pub fn in_action_phase(ctx: &GameContext) -> bool {
    ctx.phases()
        .get(ctx.clock().phase_index)
        .is_some_and(|phase| phase.action)
}

/// Execute the current step and move the clock.
pub fn advance(ctx: &mut GameContext) -> EngineResult<AdvanceOutcome> {
    let phases = ctx.phases();
    let clock = *ctx.clock();
    let phase = phases
        .get(clock.phase_index)
        .ok_or_else(|| EngineError::InvalidDefinition("no phases configured".into()))?;
    let step = phase.steps.get(clock.step_index);
    let player = clock.active_player;

    let state = ctx.player(player);
    let skipped = state.is_phase_skipped(&phase.id)
        || step.is_some_and(|step| state.is_step_skipped(&phase.id, &step.id));

    let mut bundles = 0;
    if let Some(step) = step.filter(|_| !skipped) {
        debug!(phase = %phase.id, step = %step.id, %player, "executing step");
        for trigger in &step.triggers {
            bundles += run_trigger(ctx, trigger, player)?;
        }
        if !step.effects.is_empty() {
            let frame = StatSourceFrame::new("phase", phase.id.as_str())
                .with_key(format!("phase:{}:{}", phase.id, step.id));
            let mut scope = FrameScope::new(ctx, [frame]);
            execute_effects(&step.effects, &mut scope, 1.0)?;
        }
    } else if skipped {
        debug!(phase = %phase.id, %player, "step skipped");
    }

    let turn_advanced = move_clock(ctx, phase.steps.len(), phases.len());
    Ok(AdvanceOutcome {
        player,
        phase: phase.id.clone(),
        step: step.map(|step| step.id.clone()),
        skipped,
        bundles,
        clock: *ctx.clock(),
        turn_advanced,
    })
}

/// Move one step forward. Returns true when a new turn starts.
fn move_clock(ctx: &mut GameContext, step_count: usize, phase_count: usize) -> bool {
    let clock = ctx.clock_mut();
    clock.step_index += 1;
    if clock.step_index < step_count {
        return false;
    }
    clock.step_index = 0;
    clock.phase_index += 1;
    if clock.phase_index < phase_count {
        return false;
    }
    clock.phase_index = 0;
    clock.active_player = clock.active_player.next(clock.player_count);
    if clock.active_player != clock.starting_player {
        return false;
    }
    clock.turn += 1;
    let turn = clock.turn;
    // Cached percent bases are keyed by turn; older entries are dead.
    ctx.pct_bases_mut().clear();
    debug!(turn, "turn advanced");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::effects::{Effect, Method};
    use crate::ledger::{ResourceDefinition, ResourceRegistry};
    use crate::passives::{add_passive, AddPassiveOptions, PassiveDefinition};
    use crate::phases::{PhaseDefinition, StepDefinition};

    fn context() -> GameContext {
        let resources = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .build()
            .unwrap();
        let income = Effect::new("resource", Method::Add)
            .with_param("key", "gold")
            .with_param("amount", 1);
        GameContext::new(
            EngineConfig::new(2)
                .with_resources(resources)
                .with_phase(
                    PhaseDefinition::new("growth")
                        .with_step(StepDefinition::new("income").with_effects(vec![income]))
                        .with_step(StepDefinition::new("grow")),
                )
                .with_phase(PhaseDefinition::new("main").action_phase().with_step(StepDefinition::new("main"))),
        )
        .unwrap()
    }

    #[test]
    fn test_clock_walks_steps_phases_players_turns() {
        let mut ctx = context();
        let mut seen = Vec::new();
        for _ in 0..6 {
            let outcome = advance(&mut ctx).unwrap();
            seen.push((
                outcome.player.index(),
                outcome.phase.to_string(),
                outcome.step.map(|s| s.to_string()),
                outcome.turn_advanced,
            ));
        }

        let expected = [
            (0, "growth", "income", false),
            (0, "growth", "grow", false),
            (0, "main", "main", false),
            (1, "growth", "income", false),
            (1, "growth", "grow", false),
            (1, "main", "main", true),
        ];
        for (actual, expected) in seen.iter().zip(expected) {
            assert_eq!(actual.0, expected.0);
            assert_eq!(actual.1, expected.1);
            assert_eq!(actual.2.as_deref(), Some(expected.2));
            assert_eq!(actual.3, expected.3);
        }
        assert_eq!(ctx.clock().turn, 2);
        assert_eq!(ctx.active_player(), PlayerId::new(0));
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("gold"), 1);
        assert_eq!(ctx.player(PlayerId::new(1)).resources().amount("gold"), 1);
    }

    #[test]
    fn test_skipped_phase_runs_nothing() {
        let mut ctx = context();
        let drought = PassiveDefinition::new("drought", vec![]).skipping_phase("growth");
        add_passive(&mut ctx, drought, AddPassiveOptions::default()).unwrap();

        let outcome = advance(&mut ctx).unwrap();
        assert!(outcome.skipped);
        assert_eq!(ctx.player(PlayerId::new(0)).resources().amount("gold"), 0);
        // The clock still moves.
        assert_eq!(ctx.clock().step_index, 1);
    }

    #[test]
    fn test_action_phase_and_position() {
        let mut ctx = context();
        assert!(!in_action_phase(&ctx));
        advance(&mut ctx).unwrap();
        advance(&mut ctx).unwrap();
        assert!(in_action_phase(&ctx));
        let (phase, step) = current_position(&ctx).unwrap();
        assert_eq!(phase.as_str(), "main");
        assert_eq!(step.map(|s| s.to_string()).as_deref(), Some("main"));
    }

    #[test]
    fn test_no_phases() {
        let mut ctx = GameContext::new(EngineConfig::new(1)).unwrap();
        assert!(matches!(advance(&mut ctx), Err(EngineError::InvalidDefinition(_))));
    }
}
