use proptest::prelude::*;

use scrypt_bsv_primitives::ec::private_key::PrivateKey;
use scrypt_bsv_primitives::hash::sha256d;
use scrypt_bsv_primitives::util::{varint_buf_num, ByteReader, ByteSink, VarInt, MAX_SAFE_INTEGER};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn varint_decode_inverts_encode(value in 0u64..=MAX_SAFE_INTEGER) {
        let bytes = varint_buf_num(value);
        prop_assert_eq!(bytes.len(), VarInt(value).length());
        let mut reader = ByteReader::new(&bytes);
        prop_assert_eq!(reader.read_varint_num().unwrap(), value);
        prop_assert!(reader.is_finished());
    }

    #[test]
    fn sink_holds_exactly_what_was_written(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32),
        start_capacity in 0usize..16,
    ) {
        let mut sink = ByteSink::with_capacity(start_capacity);
        let mut expected = Vec::new();
        for chunk in &chunks {
            sink.write(chunk);
            expected.extend_from_slice(chunk);
            prop_assert!(sink.len() <= sink.capacity());
        }
        prop_assert_eq!(sink.into_bytes(), expected);
    }

    #[test]
    fn ecdsa_sign_verify_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256d(&msg);
            let sig = pk.sign(&digest).unwrap();
            prop_assert!(sig.has_low_s());
            prop_assert!(pk.pub_key().verify(&digest, &sig));
        }
    }
}
