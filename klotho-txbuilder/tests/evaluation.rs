mod common;

use std::sync::Arc;

use klotho_txbuilder::prelude::*;

use common::*;

const SCRIPT_CBOR: &str = "4e4d01000033222220051200120011";

fn script_spend(builder: &mut TxBuilder) {
    builder
        .spending_plutus_script(LanguageVersion::V2)
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(20_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_in_script(SCRIPT_CBOR)
        .unwrap()
        .tx_in_datum_value(BuilderData::Cbor("d87980".into()))
        .unwrap()
        .tx_in_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
}

#[tokio::test]
async fn evaluated_budgets_replace_the_defaults_with_a_safety_margin() {
    let evaluator = Arc::new(MockEvaluator {
        actions: vec![Action {
            tag: RedeemerTag::Spend,
            index: 0,
            budget: Budget {
                mem: 1_000,
                steps: 2_000,
            },
        }],
    });
    let mut builder = builder_with(None, Some(evaluator), None);
    script_spend(&mut builder);
    builder.complete().await.unwrap();

    let TxIn::Script { script_tx_in, .. } = &builder.tx_builder_body.inputs[0] else {
        panic!("expected a script input");
    };
    let budget = script_tx_in.redeemer.as_ref().unwrap().ex_units;
    assert_eq!(budget.mem, 1_100);
    assert_eq!(budget.steps, 2_200);
    assert_eq!(builder.status(), BuildStatus::Final);
}

#[tokio::test]
async fn without_an_evaluator_default_budgets_are_kept() {
    let mut builder = builder();
    script_spend(&mut builder);
    builder.complete().await.unwrap();

    let TxIn::Script { script_tx_in, .. } = &builder.tx_builder_body.inputs[0] else {
        panic!("expected a script input");
    };
    let budget = script_tx_in.redeemer.as_ref().unwrap().ex_units;
    assert_eq!(budget.mem, DEFAULT_REDEEMER_BUDGET.mem);
    assert_eq!(budget.steps, DEFAULT_REDEEMER_BUDGET.steps);
}

#[tokio::test]
async fn evaluation_failures_abort_the_build() {
    let mut builder = builder_with(None, Some(Arc::new(FailingEvaluator)), None);
    script_spend(&mut builder);
    let error = builder.complete().await.unwrap_err();
    match error {
        TxBuilderError::Evaluation { tx_hex, .. } => assert!(!tx_hex.is_empty()),
        other => panic!("expected an evaluation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn mint_entries_sharing_a_policy_share_the_updated_budget() {
    let evaluator = Arc::new(MockEvaluator {
        actions: vec![Action {
            tag: RedeemerTag::Mint,
            index: 0,
            budget: Budget {
                mem: 500_000,
                steps: 200_000_000,
            },
        }],
    });
    let mut builder = builder_with(None, Some(evaluator), None);
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(30_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .mint_plutus_script(LanguageVersion::V2)
        .mint(1i64, POLICY_A, "aa")
        .unwrap()
        .minting_script(SCRIPT_CBOR)
        .unwrap()
        .mint_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap()
        .mint_plutus_script(LanguageVersion::V2)
        .mint(2i64, POLICY_A, "bb")
        .unwrap()
        .minting_script(SCRIPT_CBOR)
        .unwrap()
        .mint_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap();
    builder.complete().await.unwrap();

    let mints = &builder.tx_builder_body.mints;
    assert_eq!(mints.len(), 2);
    for mint in mints {
        let MintItem::Plutus { redeemer, .. } = mint else {
            panic!("expected plutus mints");
        };
        let budget = redeemer.as_ref().unwrap().ex_units;
        assert_eq!(budget.mem, 550_000);
        assert_eq!(budget.steps, 220_000_000);
    }
}

#[tokio::test]
async fn script_withdrawal_budgets_update_from_reward_actions() {
    let evaluator = Arc::new(MockEvaluator {
        actions: vec![Action {
            tag: RedeemerTag::Reward,
            index: 0,
            budget: Budget {
                mem: 40_000,
                steps: 9_000_000,
            },
        }],
    });
    let mut builder = builder_with(None, Some(evaluator), None);
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(20_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .withdrawal_plutus_script(LanguageVersion::V2);
    builder
        .withdrawal("stake_test1script", 3_000_000)
        .unwrap()
        .withdrawal_script(SCRIPT_CBOR)
        .unwrap()
        .withdrawal_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap();
    builder.complete().await.unwrap();

    let Withdrawal::Script { redeemer, .. } = &builder.tx_builder_body.withdrawals[0] else {
        panic!("expected a script withdrawal");
    };
    let budget = redeemer.as_ref().unwrap().ex_units;
    assert_eq!(budget.mem, 44_000);
    assert_eq!(budget.steps, 9_900_000);
}
