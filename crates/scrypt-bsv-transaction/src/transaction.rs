//! Core transaction type for the BSV blockchain.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! lock time, with binary and hex serialization and transaction ID
//! computation.

use scrypt_bsv_primitives::hash::sha256d;
use scrypt_bsv_primitives::util::{decode_hex, ByteReader, ByteSink, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash::HashCache;
use crate::template::UnlockingScriptTemplate;
use crate::TransactionError;

/// A BSV transaction consisting of a version, a set of inputs, a set of
/// outputs, and a lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// If non-zero, the transaction is not valid until the specified
    /// block height or Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Returns
    /// The transaction, or a `TransactionError` if the hex is invalid or
    /// the bytes do not form exactly one transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = decode_hex(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes with no trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if !reader.is_finished() {
            return Err(TransactionError::InvalidTransaction(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized transaction.
    ///
    /// # Returns
    /// The transaction, or a `TransactionError` on truncated or oversized data.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint_num().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        // each input is at least 41 bytes; cap the preallocation accordingly
        let mut inputs = Vec::with_capacity((input_count as usize).min(reader.remaining() / 41));
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint_num().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity((output_count as usize).min(reader.remaining() / 9));
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteSink::with_capacity(256);
        sink.write_u32_le(self.version);

        sink.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut sink);
        }

        sink.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut sink);
        }

        sink.write_u32_le(self.lock_time);
        sink.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Double SHA-256 of the serialized transaction, in internal byte order.
    pub fn hash(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// The transaction ID as conventionally displayed (byte-reversed hash).
    ///
    /// # Returns
    /// A 64-character hex string.
    pub fn tx_id(&self) -> String {
        let mut id = self.hash();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// All three sighash digests of the current inputs and outputs.
    ///
    /// The cache is only valid until the inputs, outputs or sequence
    /// numbers change.
    pub fn hash_cache(&self) -> HashCache {
        HashCache::for_transaction(self)
    }

    // -----------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------

    /// Sign one input with a template and install the unlocking script it
    /// produces.
    ///
    /// # Arguments
    /// * `input_index` - The input to sign.
    /// * `template` - Produces the unlocking script from the transaction.
    ///
    /// # Returns
    /// `Ok(())`, `InvalidInputIndex`, or the template's error.
    pub fn sign_input(
        &mut self,
        input_index: usize,
        template: &dyn UnlockingScriptTemplate,
    ) -> Result<(), TransactionError> {
        if input_index >= self.inputs.len() {
            return Err(TransactionError::InvalidInputIndex {
                index: input_index,
                count: self.inputs.len(),
            });
        }
        let script = template.sign(self, input_index)?;
        self.inputs[input_index].set_script(script);
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
