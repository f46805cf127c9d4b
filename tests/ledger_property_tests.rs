//! Property tests for ledger invariants.
//!
//! Random sequences of changes, transfers and bound increases must keep
//! every group parent equal to the sum of its children and every bounded
//! resource inside its bounds.

use proptest::prelude::*;

use realm_rules::core::{EngineConfig, GameContext, PlayerId, ResourceId};
use realm_rules::ledger::{
    apply_value_change, increase_upper_bound, transfer, Bounds, ChangeSpec, GroupDefinition,
    GroupParentDefinition, ResourceDefinition, ResourceRegistry, ValueChange,
};

const CHILDREN: [&str; 3] = ["council", "legion", "fortifier"];

#[derive(Clone, Debug)]
enum Op {
    Change { player: u8, child: usize, delta: i64 },
    Transfer { donor: u8, child: usize, amount: i64 },
    Raise { player: u8, amount: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..3, 0usize..3, -20i64..20).prop_map(|(player, child, delta)| Op::Change {
            player,
            child,
            delta
        }),
        (0u8..3, 0usize..3, 0i64..15).prop_map(|(donor, child, amount)| Op::Transfer {
            donor,
            child,
            amount
        }),
        (0u8..3, 0i64..4).prop_map(|(player, amount)| Op::Raise { player, amount }),
    ]
}

fn context() -> GameContext {
    let mut builder = ResourceRegistry::builder();
    for (order, id) in CHILDREN.iter().enumerate() {
        builder = builder.resource(
            ResourceDefinition::new(*id)
                .with_bounds(Bounds::range(0, 12))
                .in_group("people", order as i32),
        );
    }
    let registry = builder
        .group(
            GroupDefinition::new("people")
                .with_parent(GroupParentDefinition::new("populationTotal")),
        )
        .build()
        .unwrap();
    GameContext::new(EngineConfig::new(3).with_resources(registry)).unwrap()
}

fn apply(ctx: &mut GameContext, op: &Op) {
    match *op {
        Op::Change { player, child, delta } => {
            let id = ResourceId::new(CHILDREN[child]);
            let change = ValueChange::amount(delta as f64);
            apply_value_change(ctx, PlayerId::new(player), &id, &change).unwrap();
        }
        Op::Transfer { donor, child, amount } => {
            let donor = PlayerId::new(donor);
            let recipient = ctx.opponent_of(donor);
            let id = ResourceId::new(CHILDREN[child]);
            let outcome =
                transfer(ctx, donor, recipient, &id, ChangeSpec::Amount(amount as f64), None).unwrap();
            assert!(outcome.credited <= outcome.debited);
        }
        Op::Raise { player, amount } => {
            let id = ResourceId::new(CHILDREN[0]);
            increase_upper_bound(ctx, PlayerId::new(player), &id, amount).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn test_ledger_invariants_hold(ops in prop::collection::vec(op(), 1..40)) {
        let mut ctx = context();
        for op in &ops {
            apply(&mut ctx, op);

            for (_, player) in ctx.players() {
                let ledger = player.resources();
                let sum: i64 = CHILDREN.iter().map(|id| ledger.amount(id)).sum();
                prop_assert_eq!(ledger.amount("populationTotal"), sum);
                for id in CHILDREN {
                    prop_assert!(ledger.bounds(id).contains(ledger.amount(id)));
                }
            }
        }
    }

    #[test]
    fn test_drained_deltas_match_amounts(deltas in prop::collection::vec(-20i64..20, 1..20)) {
        let mut ctx = context();
        let player = PlayerId::new(0);
        let id = ResourceId::new("legion");
        for delta in deltas {
            apply_value_change(&mut ctx, player, &id, &ValueChange::amount(delta as f64)).unwrap();
        }

        let drained: i64 = ctx.take_recent_deltas(player).iter().map(|(_, delta)| delta).sum();
        prop_assert_eq!(drained, ctx.player(player).resources().amount("legion"));
        prop_assert!(ctx.take_recent_deltas(player).is_empty());
    }
}
