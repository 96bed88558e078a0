use scrypt_bsv::primitives::ec::PrivateKey;
use scrypt_bsv::script::Script;
use scrypt_bsv::transaction::template::p2pkh;
use scrypt_bsv::transaction::{
    InputParams, Transaction, TransactionInput, TransactionOutput, VerifyResult,
};

const PRIVATE_KEY_HEX: &str = "14b2c42482bbc5c76632f1b216421f6cebf27fd7909dbaefc17a5e3bcc4ad30a";
const PREV_TX_ID: &str = "5184ac5523a42faed7cd6a105da1a86d7b1fa6a5f6e7fc2406c5a46cbb5e3a28";
const PREV_SATOSHIS: u64 = 100_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn prev_tx_id() -> [u8; 32] {
    let mut id = [0u8; 32];
    id.copy_from_slice(&hex::decode(PREV_TX_ID).unwrap());
    id
}

/// One input spending a P2PKH output of `key`, one output paying it back
/// minus the fee.
fn build_spend(key: &PrivateKey) -> Transaction {
    let spent = TransactionOutput::new(PREV_SATOSHIS, p2pkh::lock_pub_key(&key.pub_key()));
    let input = TransactionInput::from_params(InputParams {
        prev_tx_id: prev_tx_id(),
        output_index: 0,
        script: Some(Script::new()),
        output: Some(spent),
        ..Default::default()
    })
    .unwrap();

    let mut tx = Transaction::new();
    tx.add_input(input);
    tx.add_output(TransactionOutput::new(
        PREV_SATOSHIS - 1_000,
        p2pkh::lock_pub_key(&key.pub_key()),
    ));
    tx
}

#[test]
fn p2pkh_sign_then_verify() {
    init_tracing();
    let key = PrivateKey::from_hex(PRIVATE_KEY_HEX).unwrap();
    let mut tx = build_spend(&key);

    let signatures = tx.inputs[0].get_signatures(&tx, &[(&key, None)], 0).unwrap();
    assert_eq!(signatures.len(), 1);
    tx.inputs[0].set_script(p2pkh::unlock(&signatures[0]).unwrap());

    let result = tx.inputs[0].verify(&tx, 0).unwrap();
    assert_eq!(
        result,
        VerifyResult {
            success: true,
            error: String::new(),
            failed_at: Default::default(),
        }
    );
    assert_eq!(
        serde_json::to_string(&result).unwrap(),
        r#"{"success":true,"error":"","failedAt":{}}"#
    );
}

#[test]
fn signed_transaction_survives_the_wire() {
    init_tracing();
    let key = PrivateKey::from_hex(PRIVATE_KEY_HEX).unwrap();
    let mut tx = build_spend(&key);
    tx.sign_input(0, &p2pkh::P2PKH::new(key.clone(), None)).unwrap();

    let mut parsed = Transaction::from_hex(&tx.to_hex()).unwrap();
    assert_eq!(parsed.tx_id(), tx.tx_id());
    assert_eq!(parsed.inputs[0].prev_tx_id, prev_tx_id());

    // the wire form does not carry the spent output
    assert!(parsed.inputs[0].verify(&parsed, 0).is_err());
    let spent = tx.inputs[0].output().cloned();
    parsed.inputs[0].set_output(spent);
    assert!(parsed.inputs[0].verify(&parsed, 0).unwrap().success);
    assert_eq!(parsed.inputs[0].script().chunks().len(), 2);
}

#[test]
fn low_s_signing_flow() {
    init_tracing();
    let key = PrivateKey::from_hex(PRIVATE_KEY_HEX).unwrap();
    let mut tx = build_spend(&key);

    let preimage = tx.inputs[0].get_preimage(&tx, 0, None, true).unwrap();
    let digest = preimage.digest();
    assert!(digest[0] < 0x80 && digest[31] < 0x80);
    preimage.apply_to(&mut tx);

    let signatures = tx.inputs[0].get_signatures(&tx, &[(&key, None)], 0).unwrap();
    tx.inputs[0].set_script(p2pkh::unlock(&signatures[0]).unwrap());
    let result = tx.inputs[0].verify(&tx, 0).unwrap();
    assert!(result.success, "{}", result.error);
}

#[test]
fn tampered_output_fails_with_site() {
    init_tracing();
    let key = PrivateKey::from_hex(PRIVATE_KEY_HEX).unwrap();
    let mut tx = build_spend(&key);
    tx.sign_input(0, &p2pkh::P2PKH::new(key, None)).unwrap();
    tx.outputs[0].satoshis += 1;

    let result = tx.inputs[0].verify(&tx, 0).unwrap();
    assert!(!result.success);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["failedAt"]["scriptIndex"], 1);
    assert!(!json["error"].as_str().unwrap().is_empty());
}
