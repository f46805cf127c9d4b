//! Ledger mutation entry points.
//!
//! Every amount change goes through [`apply_value_change`], which clamps,
//! records flags and deltas, notifies observers and re-evaluates tiers.
//! [`transfer`] and [`increase_upper_bound`] build on the same path.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::definition::Bounds;
use super::state::HookSuppression;
use super::tiers;
use crate::core::numeric::{round_to_integer, to_integer, RoundingMode};
use crate::core::{EngineError, EngineResult, GameContext, PlayerId, ResourceId};

/// How a change is specified before it is resolved to an integer delta.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSpec {
    /// Integer delta (fractional values are rejected).
    Amount(f64),
    /// Percent of the current amount; negative removes.
    Percent(f64),
}

/// How an out-of-bounds result is reconciled. Only clamping exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    #[default]
    Clamp,
}

/// A requested change to one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueChange {
    pub spec: ChangeSpec,
    /// Required for percent changes.
    pub rounding: Option<RoundingMode>,
    pub reconciliation: Reconciliation,
    /// Skip gain/loss observers, recording this note instead.
    pub suppress_hooks: Option<HookSuppression>,
    /// Append to the active player's recent-gains log.
    pub log_gain: bool,
}

impl ValueChange {
    #[must_use]
    pub fn amount(delta: f64) -> Self {
        Self {
            spec: ChangeSpec::Amount(delta),
            rounding: None,
            reconciliation: Reconciliation::Clamp,
            suppress_hooks: None,
            log_gain: true,
        }
    }

    #[must_use]
    pub fn percent(percent: f64, rounding: RoundingMode) -> Self {
        Self {
            spec: ChangeSpec::Percent(percent),
            rounding: Some(rounding),
            ..Self::amount(0.0)
        }
    }

    #[must_use]
    pub fn with_rounding(mut self, rounding: Option<RoundingMode>) -> Self {
        self.rounding = rounding;
        self
    }

    #[must_use]
    pub fn suppressed(mut self, note: Option<String>) -> Self {
        self.suppress_hooks = Some(HookSuppression { note });
        self
    }

    /// Do not append to the recent-gains log.
    #[must_use]
    pub fn unlogged(mut self) -> Self {
        self.log_gain = false;
        self
    }
}

/// A logged gain (or loss, if negative) for the active player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGain {
    pub resource: ResourceId,
    pub amount: i64,
}

/// Payload delivered to gain/loss observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceChangeEvent {
    pub resource: ResourceId,
    /// Magnitude of the applied change.
    pub amount: i64,
    pub player: PlayerId,
}

/// Result of a transfer. The two sides can differ when the recipient's
/// headroom is smaller than what the donor gave up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub debited: i64,
    pub credited: i64,
}

fn concrete(ctx: &GameContext, resource: &ResourceId) -> EngineResult<()> {
    let registry = ctx.resource_registry();
    if registry.is_parent(resource.as_str()) {
        return Err(EngineError::ParentMutation(resource.clone()));
    }
    if registry.resource(resource.as_str()).is_none() {
        return Err(EngineError::unknown("resource", resource));
    }
    Ok(())
}

fn percent_of(
    resource: &ResourceId,
    amount: i64,
    percent: f64,
    rounding: Option<RoundingMode>,
) -> EngineResult<i64> {
    let mode = rounding.ok_or_else(|| EngineError::MissingRounding(resource.clone()))?;
    let raw = amount as f64 * percent / 100.0;
    round_to_integer(raw, mode, || format!("percent change on '{resource}'"))
}

/// Apply a change to one of `player`'s concrete resources.
///
/// Returns the applied delta after clamping. A zero result mutates nothing:
/// no touched flag, no hooks, no gain log.
pub fn apply_value_change(
    ctx: &mut GameContext,
    player: PlayerId,
    resource: &ResourceId,
    change: &ValueChange,
) -> EngineResult<i64> {
    concrete(ctx, resource)?;
    let state = ctx.player(player).resources();
    let current = state.amount(resource.as_str());
    let delta = match change.spec {
        ChangeSpec::Amount(amount) => {
            to_integer(amount, || format!("amount change on '{resource}'"))?
        }
        ChangeSpec::Percent(percent) => percent_of(resource, current, percent, change.rounding)?,
    };
    let proposed = current
        .checked_add(delta)
        .ok_or_else(|| EngineError::Overflow(resource.clone()))?;
    let next = match change.reconciliation {
        Reconciliation::Clamp => state.bounds(resource.as_str()).clamp(proposed),
    };
    let applied = next - current;
    if applied == 0 {
        trace!(%resource, %player, delta, "value change resolved to zero");
        return Ok(0);
    }

    {
        let ledger = ctx.player_mut(player).resources_mut();
        ledger.set_amount(resource, next)?;
        ledger.mark_touched(resource);
        ledger.record_delta(resource, applied);
    }
    if change.log_gain && player == ctx.active_player() {
        ctx.push_recent_gain(ResourceGain {
            resource: resource.clone(),
            amount: applied,
        });
    }
    match &change.suppress_hooks {
        Some(suppression) => ctx
            .player_mut(player)
            .resources_mut()
            .record_suppression(resource, suppression.clone()),
        None => {
            let event = ResourceChangeEvent {
                resource: resource.clone(),
                amount: applied.abs(),
                player,
            };
            ctx.notify_resource_change(&event, applied > 0)?;
        }
    }
    tiers::reevaluate(ctx, player, resource)?;
    Ok(applied)
}

/// Move a resource from `donor` to `recipient`.
///
/// The request is clamped to what the donor holds above its floor (its
/// lower bound, or 0), then the credit is clamped to the recipient's
/// headroom. Any excess the recipient cannot hold is lost.
pub fn transfer(
    ctx: &mut GameContext,
    donor: PlayerId,
    recipient: PlayerId,
    resource: &ResourceId,
    spec: ChangeSpec,
    rounding: Option<RoundingMode>,
) -> EngineResult<TransferOutcome> {
    concrete(ctx, resource)?;
    let donor_state = ctx.player(donor).resources();
    let donor_amount = donor_state.amount(resource.as_str());
    let requested = match spec {
        ChangeSpec::Amount(amount) => to_integer(amount, || format!("transfer of '{resource}'"))?,
        ChangeSpec::Percent(percent) => percent_of(resource, donor_amount, percent, rounding)?,
    };
    if requested < 0 {
        return Err(EngineError::NegativeTransfer {
            resource: resource.clone(),
            amount: requested,
        });
    }

    let floor = donor_state.bounds(resource.as_str()).lower.unwrap_or(0);
    let debit = requested.min((donor_amount - floor).max(0));
    let recipient_state = ctx.player(recipient).resources();
    let headroom = headroom(
        recipient_state.bounds(resource.as_str()),
        recipient_state.amount(resource.as_str()),
    );
    let credit = debit.min(headroom);
    trace!(%resource, %donor, %recipient, requested, debit, credit, "transfer");

    let debited = -apply_value_change(ctx, donor, resource, &ValueChange::amount(-debit as f64))?;
    let credited = apply_value_change(ctx, recipient, resource, &ValueChange::amount(credit as f64))?;
    Ok(TransferOutcome { debited, credited })
}

fn headroom(bounds: Bounds, amount: i64) -> i64 {
    bounds.upper.map_or(i64::MAX, |upper| (upper - amount).max(0))
}

/// Raise a resource's upper bound by `amount`. The current amount is not
/// touched; the resource and its ancestors are marked bound-touched.
///
/// A resource without an upper bound gets one, anchored at its lower
/// bound (or 0).
pub fn increase_upper_bound(
    ctx: &mut GameContext,
    player: PlayerId,
    resource: &ResourceId,
    amount: i64,
) -> EngineResult<()> {
    if amount < 0 {
        return Err(EngineError::NegativeBoundIncrease {
            resource: resource.clone(),
            amount,
        });
    }
    concrete(ctx, resource)?;
    let current = ctx.player(player).resources().bounds(resource.as_str());
    let upper = current.upper.or(current.lower).unwrap_or(0);
    let raised = upper
        .checked_add(amount)
        .ok_or_else(|| EngineError::Overflow(resource.clone()))?;

    let ancestors = ctx.resource_registry().ancestors(resource.as_str());
    let ledger = ctx.player_mut(player).resources_mut();
    ledger.set_bounds(resource, Bounds::new(current.lower, Some(raised)));
    ledger.mark_bound_touched(resource);
    for parent in &ancestors {
        ledger.mark_bound_touched(parent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::ledger::definition::ResourceDefinition;
    use crate::ledger::ResourceRegistry;

    fn context() -> GameContext {
        let registry = ResourceRegistry::builder()
            .resource(ResourceDefinition::new("gold"))
            .resource(ResourceDefinition::new("castle").with_bounds(Bounds::range(0, 10)))
            .build()
            .unwrap();
        GameContext::new(EngineConfig::new(2).with_resources(registry)).unwrap()
    }

    #[test]
    fn test_amount_must_be_integer() {
        let mut ctx = context();
        let result = apply_value_change(
            &mut ctx,
            PlayerId::new(0),
            &ResourceId::new("gold"),
            &ValueChange::amount(1.5),
        );
        assert!(matches!(result, Err(EngineError::NonInteger { .. })));
    }

    #[test]
    fn test_percent_requires_rounding() {
        let mut ctx = context();
        let change = ValueChange::percent(10.0, RoundingMode::Up).with_rounding(None);
        let result = apply_value_change(&mut ctx, PlayerId::new(0), &ResourceId::new("gold"), &change);
        assert!(matches!(result, Err(EngineError::MissingRounding(_))));
    }

    #[test]
    fn test_unknown_resource() {
        let mut ctx = context();
        let result = apply_value_change(
            &mut ctx,
            PlayerId::new(0),
            &ResourceId::new("mana"),
            &ValueChange::amount(1.0),
        );
        assert!(matches!(result, Err(EngineError::UnknownId { kind: "resource", .. })));
    }

    #[test]
    fn test_suppressed_change_records_note() {
        let mut ctx = context();
        let gold = ResourceId::new("gold");
        let change = ValueChange::amount(4.0).suppressed(Some("tribute".into()));
        apply_value_change(&mut ctx, PlayerId::new(0), &gold, &change).unwrap();

        let ledger = ctx.player(PlayerId::new(0)).resources();
        assert_eq!(ledger.amount("gold"), 4);
        assert_eq!(
            ledger.hook_suppression("gold").and_then(|s| s.note.as_deref()),
            Some("tribute")
        );
    }

    #[test]
    fn test_non_active_player_not_logged() {
        let mut ctx = context();
        let gold = ResourceId::new("gold");
        apply_value_change(&mut ctx, PlayerId::new(1), &gold, &ValueChange::amount(2.0)).unwrap();

        assert!(ctx.take_recent_gains().is_empty());
        assert_eq!(ctx.player(PlayerId::new(1)).resources().amount("gold"), 2);
    }

    #[test]
    fn test_increase_upper_bound() {
        let mut ctx = context();
        let castle = ResourceId::new("castle");
        increase_upper_bound(&mut ctx, PlayerId::new(0), &castle, 5).unwrap();

        let ledger = ctx.player(PlayerId::new(0)).resources();
        assert_eq!(ledger.bounds("castle"), Bounds::range(0, 15));
        assert!(ledger.is_bound_touched("castle"));
        assert_eq!(ledger.amount("castle"), 0);

        // No upper bound yet: one is created from the lower bound.
        increase_upper_bound(&mut ctx, PlayerId::new(0), &ResourceId::new("gold"), 3).unwrap();
        let ledger = ctx.player(PlayerId::new(0)).resources();
        assert_eq!(ledger.bounds("gold"), Bounds::new(None, Some(3)));
        assert!(ledger.is_bound_touched("gold"));

        let err = increase_upper_bound(&mut ctx, PlayerId::new(0), &castle, -1);
        assert!(matches!(err, Err(EngineError::NegativeBoundIncrease { .. })));
    }

    #[test]
    fn test_negative_transfer_rejected() {
        let mut ctx = context();
        let result = transfer(
            &mut ctx,
            PlayerId::new(1),
            PlayerId::new(0),
            &ResourceId::new("gold"),
            ChangeSpec::Amount(-3.0),
            None,
        );
        assert!(matches!(result, Err(EngineError::NegativeTransfer { .. })));
    }
}
