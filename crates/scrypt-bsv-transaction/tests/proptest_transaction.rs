use proptest::prelude::*;

use scrypt_bsv_primitives::util::ByteReader;
use scrypt_bsv_script::Script;
use scrypt_bsv_transaction::{InputParams, Transaction, TransactionInput, TransactionOutput};

fn script_len() -> impl Strategy<Value = usize> {
    prop_oneof![
        0usize..300,
        Just(75usize),
        Just(76usize),
        Just(255usize),
        Just(256usize),
        Just(65535usize),
        Just(65536usize),
    ]
}

fn input() -> impl Strategy<Value = TransactionInput> {
    (
        any::<[u8; 32]>(),
        any::<u32>(),
        any::<u32>(),
        script_len(),
        any::<u8>(),
    )
        .prop_map(|(prev_tx_id, output_index, sequence_number, len, fill)| {
            TransactionInput::from_params(InputParams {
                prev_tx_id,
                output_index,
                sequence_number: Some(sequence_number),
                script_buffer: Some(vec![fill; len]),
                ..Default::default()
            })
            .unwrap()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn input_decode_inverts_encode(input in input()) {
        let bytes = input.to_bytes();
        let mut reader = ByteReader::new(&bytes);
        let decoded = TransactionInput::read_from(&mut reader).unwrap();
        prop_assert!(reader.is_finished());
        prop_assert_eq!(decoded.to_bytes(), bytes);
        prop_assert_eq!(decoded, input);
    }

    #[test]
    fn transaction_decode_inverts_encode(
        version in any::<u32>(),
        lock_time in any::<u32>(),
        inputs in prop::collection::vec(input(), 0..4),
        outputs in prop::collection::vec(
            (any::<u64>(), prop::collection::vec(any::<u8>(), 0..80)),
            0..4,
        ),
    ) {
        let mut tx = Transaction::new();
        tx.version = version;
        tx.lock_time = lock_time;
        for input in inputs {
            tx.add_input(input);
        }
        for (satoshis, script) in outputs {
            tx.add_output(TransactionOutput::new(satoshis, Script::from(script)));
        }

        let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        prop_assert_eq!(decoded.to_hex(), tx.to_hex());
        prop_assert_eq!(decoded.tx_id(), tx.tx_id());
    }
}
