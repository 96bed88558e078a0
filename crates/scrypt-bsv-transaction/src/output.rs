//! Transaction output with satoshi value and locking script.

use scrypt_bsv_primitives::util::{ByteReader, ByteSink, VarInt};
use scrypt_bsv_script::Script;

use crate::TransactionError;

/// A single output in a BSV transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionOutput {
    pub satoshis: u64,
    pub locking_script: Script,
}

impl TransactionOutput {
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
        }
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// # Returns
    /// The output, or `SerializationError` if the data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_len = reader.read_varint_num().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `ByteSink`.
    pub fn write_to(&self, sink: &mut ByteSink) {
        sink.write_u64_le(self.satoshis);
        let script_bytes = self.locking_script.to_bytes();
        sink.write_varint(VarInt::from(script_bytes.len()));
        sink.write(script_bytes);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteSink::new();
        self.write_to(&mut sink);
        sink.into_bytes()
    }
}
