//! Reusable transaction-wide sighash digests.

use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// The hashPrevouts, hashSequence and hashOutputs digests of one
/// transaction.
///
/// A missing digest means "not computed yet" and serializes as `null`,
/// never as an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCache {
    #[serde(rename = "prevoutsHashBuf", default, with = "hex_opt")]
    pub(super) prevouts_hash: Option<[u8; 32]>,
    #[serde(rename = "sequenceHashBuf", default, with = "hex_opt")]
    pub(super) sequence_hash: Option<[u8; 32]>,
    #[serde(rename = "outputsHashBuf", default, with = "hex_opt")]
    pub(super) outputs_hash: Option<[u8; 32]>,
}

impl HashCache {
    pub fn new(
        prevouts_hash: Option<[u8; 32]>,
        sequence_hash: Option<[u8; 32]>,
        outputs_hash: Option<[u8; 32]>,
    ) -> Self {
        HashCache {
            prevouts_hash,
            sequence_hash,
            outputs_hash,
        }
    }

    pub fn prevouts_hash(&self) -> Option<&[u8; 32]> {
        self.prevouts_hash.as_ref()
    }

    pub fn sequence_hash(&self) -> Option<&[u8; 32]> {
        self.sequence_hash.as_ref()
    }

    pub fn outputs_hash(&self) -> Option<&[u8; 32]> {
        self.outputs_hash.as_ref()
    }

    /// Render as a JSON object with hex or `null` fields.
    pub fn to_json(&self) -> Result<String, TransactionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Hex of the JSON form's UTF-8 bytes.
    pub fn to_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.to_json()?))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hash cache hex: {}", e))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

mod hex_opt {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let bytes = hex::decode(&s).map_err(de::Error::custom)?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| de::Error::invalid_length(b.len(), &"32 bytes"))?;
        Ok(Some(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_serializes_nulls() {
        let json = HashCache::default().to_json().expect("json");
        assert_eq!(
            json,
            r#"{"prevoutsHashBuf":null,"sequenceHashBuf":null,"outputsHashBuf":null}"#
        );
        assert_eq!(HashCache::from_json(&json).expect("parse"), HashCache::default());
    }

    #[test]
    fn test_partial_cache_round_trips_through_hex() {
        let cache = HashCache::new(Some([0x01; 32]), None, Some([0xfe; 32]));
        let json = cache.to_json().expect("json");
        assert!(json.contains(&format!(r#""prevoutsHashBuf":"{}""#, "01".repeat(32))));
        assert!(json.contains(r#""sequenceHashBuf":null"#));

        let back = HashCache::from_hex(&cache.to_hex().expect("hex")).expect("parse");
        assert_eq!(back, cache);
        assert_eq!(back.outputs_hash(), Some(&[0xfe; 32]));
    }

    #[test]
    fn test_rejects_wrong_digest_length() {
        let json = r#"{"prevoutsHashBuf":"abcd","sequenceHashBuf":null,"outputsHashBuf":null}"#;
        assert!(matches!(
            HashCache::from_json(json),
            Err(TransactionError::Json(_))
        ));
        assert!(HashCache::from_hex("zz").is_err());
    }
}
