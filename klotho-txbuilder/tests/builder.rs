mod common;

use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::Zero;

use klotho_txbuilder::prelude::*;

use common::*;

#[tokio::test]
async fn simple_transfer_produces_payment_and_change() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    builder.complete().await.unwrap();

    let body = &builder.tx_builder_body;
    assert_eq!(body.outputs.len(), 2);
    assert_eq!(body.outputs[0].address, RECIPIENT);
    assert_eq!(body.outputs[1].address, CHANGE);

    let fee = body.fee.clone().unwrap();
    assert!(fee > BigInt::zero());

    // value conservation: input == payment + change + fee
    let paid = coin_of(&body.outputs[0].amount);
    let change = coin_of(&body.outputs[1].amount);
    assert_eq!(paid + change + fee, BigInt::from(5_000_000u64));

    // every output sits on at least its computed minimum coin
    let serializer = MockSerializer;
    let params = Protocol::default();
    for output in &body.outputs {
        let size = serializer.serialize_output(output).unwrap().len() / 2;
        let floor = BigInt::from((160 + size as u64) * params.coins_per_utxo_size);
        assert!(coin_of(&output.amount) >= floor);
    }

    assert_eq!(builder.status(), BuildStatus::Final);
    assert!(!builder.tx_hex().is_empty());
}

#[tokio::test]
async fn duplicate_inputs_collapse_to_one() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    builder.complete().await.unwrap();

    assert_eq!(builder.tx_builder_body.inputs.len(), 1);
}

#[tokio::test]
async fn script_input_missing_datum_fails_at_flush() {
    let mut builder = builder();
    builder
        .spending_plutus_script(LanguageVersion::V2)
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(10_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_in_script("4e4d01000033222220051200120011")
        .unwrap()
        .tx_in_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    let error = builder.complete().await.unwrap_err();
    assert!(matches!(error, TxBuilderError::MissingDatum(_)));
}

#[tokio::test]
async fn script_input_missing_redeemer_fails_at_flush() {
    let mut builder = builder();
    builder
        .spending_plutus_script(LanguageVersion::V2)
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(10_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_in_script("4e4d01000033222220051200120011")
        .unwrap()
        .tx_in_datum_value(BuilderData::Cbor("d87980".into()))
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    let error = builder.complete().await.unwrap_err();
    assert!(matches!(error, TxBuilderError::MissingRedeemer(_)));
}

#[tokio::test]
async fn datum_on_plain_input_is_rejected() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap();
    let error = builder
        .tx_in_datum_value(BuilderData::Cbor("d87980".into()))
        .unwrap_err();
    assert!(matches!(error, TxBuilderError::DatumOnNonScriptInput));
}

#[tokio::test]
async fn missing_change_address_is_rejected() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)]);
    let error = builder.complete().await.unwrap_err();
    assert!(matches!(error, TxBuilderError::NoChangeAddress));
}

#[tokio::test]
async fn shared_script_reference_collapses_to_one_reference_input() {
    let mut builder = builder();
    builder
        .spending_plutus_script(LanguageVersion::V2)
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(10_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .spending_tx_in_reference(HASH_C, 0, Some("scripthash"), Some(1200))
        .unwrap()
        .tx_in_datum_value(BuilderData::Cbor("d87980".into()))
        .unwrap()
        .tx_in_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap()
        .spending_plutus_script(LanguageVersion::V2)
        .tx_in(
            HASH_B,
            1,
            Some(vec![Asset::lovelace(10_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .spending_tx_in_reference(HASH_C, 0, Some("scripthash"), Some(1200))
        .unwrap()
        .tx_in_datum_value(BuilderData::Cbor("d87980".into()))
        .unwrap()
        .tx_in_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    builder.complete().await.unwrap();

    let references = &builder.tx_builder_body.reference_inputs;
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].tx_hash, HASH_C);
    assert_eq!(references[0].script_size, Some(1200));
}

#[tokio::test]
async fn withdrawals_and_deposits_balance_exactly() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(10_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .register_stake_certificate("stake_test1payer");
    builder.withdrawal("stake_test1rewards", 1_000_000).unwrap();
    builder.complete().await.unwrap();

    let body = &builder.tx_builder_body;
    let fee = body.fee.clone().unwrap();
    let change = coin_of(&body.outputs[1].amount);
    // inputs + withdrawal == payment + change + fee + key deposit
    assert_eq!(
        BigInt::from(10_000_000u64) + BigInt::from(1_000_000u64),
        BigInt::from(2_000_000u64) + change + fee + BigInt::from(2_000_000u64)
    );
}

#[tokio::test]
async fn minted_assets_flow_into_change() {
    let evaluator = Arc::new(MockEvaluator {
        actions: vec![Action {
            tag: RedeemerTag::Mint,
            index: 0,
            budget: Budget {
                mem: 100_000,
                steps: 40_000_000,
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
        .mint_plutus_script(LanguageVersion::V2)
        .mint(5i64, POLICY_A, "746f6b656e")
        .unwrap()
        .minting_script("4e4d01000033222220051200120011")
        .unwrap()
        .mint_redeemer_value(BuilderData::Cbor("d87980".into()), None)
        .unwrap();
    builder.complete().await.unwrap();

    let body = &builder.tx_builder_body;
    let change = &body.outputs[1];
    let minted_unit = format!("{POLICY_A}746f6b656e");
    let minted_in_change = Value::from_assets(&change.amount).get(&minted_unit);
    assert_eq!(minted_in_change, BigInt::from(5));
}

#[tokio::test]
async fn reset_returns_the_builder_to_empty() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    builder.complete().await.unwrap();
    assert_eq!(builder.status(), BuildStatus::Final);

    // a finalized session refuses further completions until reset
    let error = builder.complete().await.unwrap_err();
    assert!(matches!(error, TxBuilderError::SessionFinalized));

    builder.reset();
    assert_eq!(builder.status(), BuildStatus::Empty);
    assert!(builder.tx_builder_body.inputs.is_empty());
    assert!(builder.tx_builder_body.outputs.is_empty());

    builder
        .tx_in(
            HASH_B,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE);
    builder.complete().await.unwrap();
    assert_eq!(builder.tx_builder_body.inputs.len(), 1);
}

#[tokio::test]
async fn signing_and_submission_round_trip() {
    let mut builder = builder_with(None, None, Some(Arc::new(MockSubmitter)));
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .signing_key("582000000000000000000000000000000000");
    let unsigned = builder.complete().await.unwrap();
    let signed = builder.complete_signing().unwrap();
    assert!(signed.len() > unsigned.len());

    let tx_hash = builder.submit_tx(&signed).await.unwrap();
    assert_eq!(tx_hash, HASH_D);
}

#[tokio::test]
async fn submission_without_submitter_fails() {
    let builder = builder();
    let error = builder.submit_tx("00").await.unwrap_err();
    assert!(matches!(error, TxBuilderError::NoSubmitter));
}

#[tokio::test]
async fn metadata_and_validity_survive_into_the_body() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .invalid_before(100)
        .invalid_hereafter(200)
        .metadata_value(674, serde_json::json!({ "msg": ["hello"] }));
    builder.complete().await.unwrap();

    let body = &builder.tx_builder_body;
    assert_eq!(body.validity_range.invalid_before, Some(100));
    assert_eq!(body.validity_range.invalid_hereafter, Some(200));
    assert!(body.metadata.contains_key(&674));
}

#[tokio::test]
async fn manual_fee_is_honored() {
    let mut builder = builder();
    builder
        .tx_in(
            HASH_A,
            0,
            Some(vec![Asset::lovelace(5_000_000)]),
            Some(PAYER),
        )
        .unwrap()
        .tx_out(RECIPIENT, vec![Asset::lovelace(2_000_000)])
        .change_address(CHANGE)
        .set_fee(400_000);
    builder.complete().await.unwrap();

    let body = &builder.tx_builder_body;
    assert_eq!(body.fee.clone().unwrap(), BigInt::from(400_000u64));
    let change = coin_of(&body.outputs[1].amount);
    assert_eq!(change, BigInt::from(5_000_000u64 - 2_000_000 - 400_000));
}
