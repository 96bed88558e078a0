//! Signature hash computation for transaction signing.
//!
//! BSV signs a BIP-143-style preimage with the FORKID flag for replay
//! protection. The three transaction-wide digests the preimage commits to
//! can be carried between calls in a [`HashCache`], which is how a single
//! transaction is signed for many inputs without rehashing every outpoint.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

use scrypt_bsv_primitives::hash::sha256d;
use scrypt_bsv_primitives::util::{ByteSink, VarInt};

use crate::transaction::Transaction;
use crate::TransactionError;

mod cache;
pub use cache::HashCache;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection flag required on all BSV transactions after the UAHF fork.
pub const SIGHASH_FORKID: u32 = 0x40;

/// The standard BSV sighash type: ALL | FORKID.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

// -----------------------------------------------------------------------
// BIP-143 (FORKID) signature hash
// -----------------------------------------------------------------------

/// Compute the signature hash for a given input.
///
/// # Arguments
/// * `tx`                  - The transaction being signed.
/// * `input_index`         - Index of the input being signed.
/// * `prev_output_script`  - The script code of the output being spent.
/// * `sighash_type`        - The combined sighash flags (e.g. `SIGHASH_ALL_FORKID`).
/// * `satoshis`            - The satoshi value of the output being spent.
///
/// # Returns
/// The 32-byte double-SHA256 of the preimage, to be signed by ECDSA.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let (preimage, _) =
        calc_preimage(tx, input_index, prev_output_script, sighash_type, satoshis, None)?;
    Ok(sha256d(&preimage))
}

/// Compute the preimage bytes for the FORKID sighash before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script) - the locking script being satisfied
/// 6. value (8 bytes LE) - satoshis of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
///
/// # Arguments
/// * `cache` - Digests from an earlier call on the same transaction. Any
///   digest present is used as is; missing ones are computed.
///
/// # Returns
/// The raw preimage and a cache holding every digest this call used.
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
    cache: Option<&HashCache>,
) -> Result<(Vec<u8>, HashCache), TransactionError> {
    calc_preimage_with_lock_time(
        tx,
        input_index,
        prev_output_script,
        sighash_type,
        satoshis,
        tx.lock_time,
        cache,
    )
}

/// Like [`calc_preimage`], but commits to `lock_time` in place of the
/// transaction's own lock time.
///
/// The lock time is not part of any cached digest, so one cache serves
/// every candidate lock time.
pub fn calc_preimage_with_lock_time(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    sighash_type: u32,
    satoshis: u64,
    lock_time: u32,
    cache: Option<&HashCache>,
) -> Result<(Vec<u8>, HashCache), TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidInputIndex {
            index: input_index,
            count: tx.inputs.len(),
        });
    }
    if sighash_type & SIGHASH_FORKID == 0 {
        return Err(TransactionError::UnsupportedSighash(sighash_type));
    }

    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let mut used = cache.cloned().unwrap_or_default();

    let hash_prevouts = if !anyone_can_pay {
        *used.prevouts_hash.get_or_insert_with(|| prevouts_hash(tx))
    } else {
        [0u8; 32]
    };

    let hash_sequence = if !anyone_can_pay
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        *used.sequence_hash.get_or_insert_with(|| sequence_hash(tx))
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        *used.outputs_hash.get_or_insert_with(|| outputs_hash(tx))
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        // single-output digest is per input and never cached
        sha256d(&tx.outputs[input_index].to_bytes())
    } else {
        [0u8; 32]
    };

    let mut sink = ByteSink::with_capacity(156 + prev_output_script.len());
    sink.write_u32_le(tx.version);
    sink.write(&hash_prevouts);
    sink.write(&hash_sequence);

    // outpoint, txid in internal order
    sink.write_reverse(&input.prev_tx_id);
    sink.write_u32_le(input.output_index);

    sink.write_varint(VarInt::from(prev_output_script.len()));
    sink.write(prev_output_script);

    sink.write_u64_le(satoshis);
    sink.write_u32_le(input.sequence_number);
    sink.write(&hash_outputs);
    sink.write_u32_le(lock_time);
    sink.write_u32_le(sighash_type);

    Ok((sink.into_bytes(), used))
}

// -----------------------------------------------------------------------
// Transaction-wide digests
// -----------------------------------------------------------------------

/// sha256d of every outpoint (internal-order txid + LE vout).
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut sink = ByteSink::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        sink.write_reverse(&input.prev_tx_id);
        sink.write_u32_le(input.output_index);
    }
    sha256d(sink.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut sink = ByteSink::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        sink.write_u32_le(input.sequence_number);
    }
    sha256d(sink.as_bytes())
}

fn outputs_hash(tx: &Transaction) -> [u8; 32] {
    let mut sink = ByteSink::new();
    for output in &tx.outputs {
        output.write_to(&mut sink);
    }
    sha256d(sink.as_bytes())
}

impl HashCache {
    /// Compute all three digests for `tx` up front.
    pub fn for_transaction(tx: &Transaction) -> Self {
        HashCache::new(
            Some(prevouts_hash(tx)),
            Some(sequence_hash(tx)),
            Some(outputs_hash(tx)),
        )
    }
}
