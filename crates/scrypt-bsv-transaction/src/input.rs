//! Transaction input referencing a previous output.
//!
//! Besides the wire codec, an input knows how to sign itself and how to
//! verify itself against the output it spends, which it keeps as an
//! optional back-reference.

use std::borrow::Cow;

use scrypt_bsv_primitives::ec::PrivateKey;
use scrypt_bsv_primitives::hash::sha256d;
use scrypt_bsv_primitives::util::{ByteReader, ByteSink, VarInt};
use scrypt_bsv_script::interpreter::{Config, ScriptFlags, DEFAULT_VERIFY_FLAGS};
use scrypt_bsv_script::Script;

use crate::output::TransactionOutput;
use crate::sighash::{self, HashCache, SIGHASH_ALL_FORKID};
use crate::signature::TransactionSignature;
use crate::transaction::Transaction;
use crate::verify::{self, VerifyResult};
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Output index of a null (coinbase-shaped) input.
pub const NULL_OUTPUT_INDEX: u32 = 0xFFFF_FFFF;

static EMPTY_SCRIPT: Script = Script::new();

/// The unlocking script in whichever form was last assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputScript {
    /// Bytes as read from the wire or supplied by the caller.
    Raw(Vec<u8>),
    /// A parsed script; produced from `Raw` only by [`TransactionInput::script`].
    Structured(Script),
}

impl InputScript {
    fn as_bytes(&self) -> &[u8] {
        match self {
            InputScript::Raw(bytes) => bytes,
            InputScript::Structured(script) => script.to_bytes(),
        }
    }
}

/// Construction parameters for [`TransactionInput::from_params`].
///
/// One of `script` or `script_buffer` must be set; `script` wins when both are.
#[derive(Clone, Debug, Default)]
pub struct InputParams {
    /// Previous transaction id in display order.
    pub prev_tx_id: [u8; 32],
    pub output_index: u32,
    /// Defaults to [`DEFAULT_SEQUENCE_NUMBER`].
    pub sequence_number: Option<u32>,
    pub script: Option<Script>,
    pub script_buffer: Option<Vec<u8>>,
    pub output: Option<TransactionOutput>,
}

/// A single input in a BSV transaction.
///
/// # Wire format
///
/// | Field              | Size                         |
/// |--------------------|------------------------------|
/// | prev_tx_id         | 32 bytes (reversed)          |
/// | output_index       | 4 bytes (LE)                 |
/// | script length      | VarInt                       |
/// | unlocking script   | variable                     |
/// | sequence_number    | 4 bytes (LE)                 |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// Id of the transaction being spent, in display (big-endian) order.
    /// It is byte-reversed on the wire.
    pub prev_tx_id: [u8; 32],

    /// Index of the output within the previous transaction.
    pub output_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    script: InputScript,

    /// The output being spent: needed for signing and verification.
    output: Option<TransactionOutput>,
}

/// A sighash preimage together with the lock time it commits to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preimage {
    pub bytes: Vec<u8>,
    /// How far `lock_time` was moved past the transaction's own lock time.
    pub lock_time_offset: u32,
    pub lock_time: u32,
}

impl Preimage {
    /// Double SHA-256 of the preimage: the digest a signature covers.
    pub fn digest(&self) -> [u8; 32] {
        sha256d(&self.bytes)
    }

    /// Write the committed lock time into `tx`, so that it matches the
    /// preimage. A no-op when no grinding was needed.
    pub fn apply_to(&self, tx: &mut Transaction) {
        tx.lock_time = self.lock_time;
    }
}

impl TransactionInput {
    /// Create an input spending `output_index` of `prev_tx_id` with a final
    /// sequence number and no previous output attached.
    pub fn new(prev_tx_id: [u8; 32], output_index: u32, script: Script) -> Self {
        TransactionInput {
            prev_tx_id,
            output_index,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            script: InputScript::Structured(script),
            output: None,
        }
    }

    /// Build an input from a parameter set.
    ///
    /// # Returns
    /// The input, or `MissingScript` if neither `script` nor
    /// `script_buffer` is supplied.
    pub fn from_params(params: InputParams) -> Result<Self, TransactionError> {
        let script = match (params.script, params.script_buffer) {
            (Some(script), _) => InputScript::Structured(script),
            (None, Some(bytes)) => InputScript::Raw(bytes),
            (None, None) => return Err(TransactionError::MissingScript),
        };
        Ok(TransactionInput {
            prev_tx_id: params.prev_tx_id,
            output_index: params.output_index,
            sequence_number: params.sequence_number.unwrap_or(DEFAULT_SEQUENCE_NUMBER),
            script,
            output: params.output,
        })
    }

    // -----------------------------------------------------------------
    // Wire format
    // -----------------------------------------------------------------

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// The script is kept as raw bytes until first accessed through
    /// [`TransactionInput::script`].
    ///
    /// # Returns
    /// The input, or `SerializationError` if the data is truncated or the
    /// script length is above 2^53-1.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let id = reader.read_reverse(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading previous tx id: {}", e))
        })?;
        let mut prev_tx_id = [0u8; 32];
        prev_tx_id.copy_from_slice(&id);

        let output_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint_num().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            prev_tx_id,
            output_index,
            sequence_number,
            script: InputScript::Raw(script_bytes.to_vec()),
            output: None,
        })
    }

    /// Serialize this input into a `ByteSink`; the exact inverse of `read_from`.
    pub fn write_to(&self, sink: &mut ByteSink) {
        sink.write_reverse(&self.prev_tx_id);
        sink.write_u32_le(self.output_index);

        let script_bytes = self.script.as_bytes();
        sink.write_varint(VarInt::from(script_bytes.len()));
        sink.write(script_bytes);

        sink.write_u32_le(self.sequence_number);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteSink::new();
        self.write_to(&mut sink);
        sink.into_bytes()
    }

    // -----------------------------------------------------------------
    // Script access
    // -----------------------------------------------------------------

    /// The unlocking script, parsing raw bytes into a `Script` on first use.
    pub fn script(&mut self) -> &Script {
        if let InputScript::Raw(bytes) = &mut self.script {
            let script = Script::from(std::mem::take(bytes));
            self.script = InputScript::Structured(script);
        }
        match &self.script {
            InputScript::Structured(script) => script,
            InputScript::Raw(_) => &EMPTY_SCRIPT,
        }
    }

    /// The unlocking script bytes, in either representation.
    pub fn script_bytes(&self) -> &[u8] {
        self.script.as_bytes()
    }

    /// The current representation, without materializing it.
    pub fn input_script(&self) -> &InputScript {
        &self.script
    }

    /// Replace the unlocking script.
    pub fn set_script(&mut self, script: Script) {
        self.script = InputScript::Structured(script);
    }

    /// Replace the unlocking script with raw bytes.
    pub fn set_script_bytes(&mut self, bytes: Vec<u8>) {
        self.script = InputScript::Raw(bytes);
    }

    fn script_view(&self) -> Cow<'_, Script> {
        match &self.script {
            InputScript::Structured(script) => Cow::Borrowed(script),
            InputScript::Raw(bytes) => Cow::Owned(Script::from_bytes(bytes)),
        }
    }

    // -----------------------------------------------------------------
    // Previous output
    // -----------------------------------------------------------------

    /// Attach (or clear) the output this input spends.
    pub fn set_output(&mut self, output: Option<TransactionOutput>) {
        self.output = output;
    }

    pub fn output(&self) -> Option<&TransactionOutput> {
        self.output.as_ref()
    }

    /// Whether this is a coinbase-shaped input: an all-zero previous id
    /// and the all-ones output index.
    pub fn is_null(&self) -> bool {
        self.prev_tx_id == [0u8; 32] && self.output_index == NULL_OUTPUT_INDEX
    }

    /// Whether the input opts out of relative lock-time semantics.
    pub fn is_final(&self) -> bool {
        self.sequence_number == DEFAULT_SEQUENCE_NUMBER
    }

    // -----------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------

    /// Sign the input at `input_index` of `tx` once per key.
    ///
    /// # Arguments
    /// * `tx` - The transaction holding this input.
    /// * `keys` - Private keys, each with its own sighash type or `None`
    ///   for `SIGHASH_ALL_FORKID`.
    /// * `input_index` - Position of this input in `tx`.
    ///
    /// # Returns
    /// One signature record per key, in key order, or `MissingPrevOutput`
    /// if no previous output is attached.
    pub fn get_signatures(
        &self,
        tx: &Transaction,
        keys: &[(&PrivateKey, Option<u32>)],
        input_index: usize,
    ) -> Result<Vec<TransactionSignature>, TransactionError> {
        let output = self.output.as_ref().ok_or(TransactionError::MissingPrevOutput)?;
        let script = output.locking_script.to_bytes();

        let mut cache: Option<HashCache> = None;
        let mut signatures = Vec::with_capacity(keys.len());
        for (key, sighash_type) in keys {
            let sighash_type = sighash_type.unwrap_or(SIGHASH_ALL_FORKID);
            let (preimage, used) = sighash::calc_preimage(
                tx,
                input_index,
                script,
                sighash_type,
                output.satoshis,
                cache.as_ref(),
            )?;
            cache = Some(used);

            let signature = key.sign(&sha256d(&preimage))?;
            tracing::debug!(
                input = input_index,
                sighash = sighash_type,
                pub_key = %key.pub_key().to_hex(),
                "signed input"
            );
            signatures.push(TransactionSignature {
                public_key: key.pub_key(),
                prev_tx_id: self.prev_tx_id,
                output_index: self.output_index,
                input_index,
                signature,
                sighash_type,
            });
        }
        Ok(signatures)
    }

    /// Compute the sighash preimage for this input.
    ///
    /// With `low_s`, candidate lock times `tx.lock_time + offset` are tried
    /// in order from offset 0 until the preimage digest has both its first
    /// and last byte below 0x80. `tx` is never modified; apply the result
    /// with [`Preimage::apply_to`] before signing.
    ///
    /// # Arguments
    /// * `tx` - The transaction holding this input.
    /// * `input_index` - Position of this input in `tx`.
    /// * `sighash_type` - Sighash flags, or `None` for `SIGHASH_ALL_FORKID`.
    /// * `low_s` - Whether to grind the lock time.
    ///
    /// # Returns
    /// The preimage, `MissingPrevOutput` without a previous output, or
    /// `LowSGrindExhausted` if no lock time up to `u32::MAX` qualifies.
    pub fn get_preimage(
        &self,
        tx: &Transaction,
        input_index: usize,
        sighash_type: Option<u32>,
        low_s: bool,
    ) -> Result<Preimage, TransactionError> {
        let output = self.output.as_ref().ok_or(TransactionError::MissingPrevOutput)?;
        let script = output.locking_script.to_bytes();
        let sighash_type = sighash_type.unwrap_or(SIGHASH_ALL_FORKID);

        let (bytes, cache) = sighash::calc_preimage(
            tx,
            input_index,
            script,
            sighash_type,
            output.satoshis,
            None,
        )?;
        if !low_s {
            return Ok(Preimage {
                bytes,
                lock_time_offset: 0,
                lock_time: tx.lock_time,
            });
        }

        let mut candidate = bytes;
        for lock_time_offset in 0..=(u32::MAX - tx.lock_time) {
            let lock_time = tx.lock_time + lock_time_offset;
            if lock_time_offset > 0 {
                candidate = sighash::calc_preimage_with_lock_time(
                    tx,
                    input_index,
                    script,
                    sighash_type,
                    output.satoshis,
                    lock_time,
                    Some(&cache),
                )?
                .0;
            }
            let digest = sha256d(&candidate);
            if is_low_s_digest(&digest) {
                tracing::debug!(input = input_index, lock_time_offset, lock_time, "low-S preimage found");
                return Ok(Preimage {
                    bytes: candidate,
                    lock_time_offset,
                    lock_time,
                });
            }
            tracing::trace!(input = input_index, lock_time, "preimage digest rejected");
        }
        Err(TransactionError::LowSGrindExhausted)
    }

    // -----------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------

    /// Run the unlocking script against the previous output's locking
    /// script with [`DEFAULT_VERIFY_FLAGS`] and no element size limits.
    pub fn verify(&self, tx: &Transaction, input_index: usize) -> Result<VerifyResult, TransactionError> {
        self.verify_with(tx, input_index, Config::unlimited(), DEFAULT_VERIFY_FLAGS)
    }

    /// Like [`TransactionInput::verify`], with explicit interpreter limits
    /// and flags.
    ///
    /// # Returns
    /// A `VerifyResult` for both passing and failing scripts, or
    /// `MissingPrevOutput` if no previous output is attached.
    pub fn verify_with(
        &self,
        tx: &Transaction,
        input_index: usize,
        config: Config,
        flags: ScriptFlags,
    ) -> Result<VerifyResult, TransactionError> {
        let output = self.output.as_ref().ok_or(TransactionError::MissingPrevOutput)?;
        if input_index >= tx.inputs.len() {
            return Err(TransactionError::InvalidInputIndex {
                index: input_index,
                count: tx.inputs.len(),
            });
        }
        let unlocking = self.script_view();
        Ok(verify::run(
            tx,
            input_index,
            &unlocking,
            output,
            config,
            flags,
        ))
    }
}

/// The grinding predicate: first and last digest bytes non-negative as
/// signed bytes.
fn is_low_s_digest(digest: &[u8; 32]) -> bool {
    digest[0] < 0x80 && digest[31] < 0x80
}
