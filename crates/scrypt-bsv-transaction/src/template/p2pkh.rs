//! Pay-to-Public-Key-Hash (P2PKH) script template.
//!
//! Creates standard P2PKH locking scripts (`OP_DUP OP_HASH160 <hash>
//! OP_EQUALVERIFY OP_CHECKSIG`) and unlocking scripts (`<sig> <pubkey>`).

use scrypt_bsv_primitives::ec::{PrivateKey, PublicKey};
use scrypt_bsv_script::opcodes::*;
use scrypt_bsv_script::Script;

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::signature::TransactionSignature;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Create a P2PKH locking script for a 20-byte public key hash.
///
/// Produces: `OP_DUP OP_HASH160 <20-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn lock(public_key_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(public_key_hash.len() as u8);
    bytes.extend_from_slice(public_key_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from(bytes)
}

/// P2PKH locking script for a public key's hash160.
pub fn lock_pub_key(public_key: &PublicKey) -> Script {
    lock(&public_key.hash160())
}

/// Build the unlocking script `<DER_sig || sighash_byte> <compressed_pubkey>`
/// from a signature record.
pub fn unlock(signature: &TransactionSignature) -> Result<Script, TransactionError> {
    let mut script = Script::new();
    script.append_push_data(&signature.to_checksig_format())?;
    script.append_push_data(&signature.public_key.to_compressed())?;
    Ok(script)
}

/// P2PKH signing template holding a private key and sighash flag.
pub struct P2PKH {
    private_key: PrivateKey,
    sighash_flag: u32,
}

impl P2PKH {
    /// # Arguments
    /// * `private_key` - The private key used to sign.
    /// * `sighash_flag` - Optional sighash flag. Defaults to `SIGHASH_ALL_FORKID` (0x41).
    pub fn new(private_key: PrivateKey, sighash_flag: Option<u32>) -> Self {
        P2PKH {
            private_key,
            sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
        }
    }
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input through [`crate::TransactionInput::get_signatures`]
    /// and wrap the single signature in a P2PKH unlocking script.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let input = tx.inputs.get(input_index).ok_or(TransactionError::InvalidInputIndex {
            index: input_index,
            count: tx.inputs.len(),
        })?;
        let signatures =
            input.get_signatures(tx, &[(&self.private_key, Some(self.sighash_flag))], input_index)?;
        let signature = signatures.first().ok_or_else(|| {
            TransactionError::InvalidTransaction("no signature produced".to_string())
        })?;
        unlock(signature)
    }

    /// 1 (push len) + 72 (DER sig + sighash) + 1 (push len) + 33 (compressed pubkey)
    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        107
    }
}
