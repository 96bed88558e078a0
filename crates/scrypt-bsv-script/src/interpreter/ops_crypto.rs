//! Hashing and signature opcodes.

use scrypt_bsv_primitives::ec::Signature;
use scrypt_bsv_primitives::hash;

use crate::opcodes::OP_CODESEPARATOR;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::thread::Thread;

const SIGHASH_ALL: u8 = 0x01;
const SIGHASH_SINGLE: u8 = 0x03;
const SIGHASH_FORKID: u8 = 0x40;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

pub(crate) enum HashKind {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, kind: HashKind) -> Result<(), InterpreterError> {
        let buf = self.pop()?;
        let digest = match kind {
            HashKind::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashKind::Sha1 => hash::sha1(&buf).to_vec(),
            HashKind::Sha256 => hash::sha256(&buf).to_vec(),
            HashKind::Hash160 => hash::hash160(&buf).to_vec(),
            HashKind::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.push(digest);
        Ok(())
    }

    /// The part of the current script after the last OP_CODESEPARATOR,
    /// with separators removed. Without FORKID, pushes of the signature
    /// itself are removed too.
    pub(crate) fn sub_script(&self, full_sig: &[u8], shf: u8) -> Script {
        let strip_sig = shf & SIGHASH_FORKID == 0;
        let chunks: Vec<_> = self.scripts[self.script_idx]
            .iter()
            .skip(self.last_code_sep)
            .filter(|c| c.op != OP_CODESEPARATOR)
            .filter(|c| !(strip_sig && c.data.as_deref() == Some(full_sig)))
            .cloned()
            .collect();
        Script::from_chunks(&chunks)
    }

    /// OP_CHECKSIG: pops a public key and signature and pushes the result.
    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.pop()?;
        let full_sig = self.pop()?;

        let valid = self.check_sig(&full_sig, &pub_key)?;
        if !valid && !full_sig.is_empty() && self.has_flag(ScriptFlags::VERIFY_NULL_FAIL) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig",
            ));
        }
        self.push_bool(valid);
        Ok(())
    }

    fn check_sig(&self, full_sig: &[u8], pub_key: &[u8]) -> Result<bool, InterpreterError> {
        let Some((&shf, sig)) = full_sig.split_last() else {
            return Ok(false);
        };
        self.check_hash_type_encoding(shf)?;
        self.check_signature_encoding(sig)?;
        self.check_pub_key_encoding(pub_key)?;

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no transaction context for OP_CHECKSIG",
            )
        })?;
        let sub_script = self.sub_script(full_sig, shf);
        match ctx.verify_signature(full_sig, pub_key, &sub_script, self.input_idx, shf) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                tracing::debug!(input = self.input_idx, error = %e, "signature check errored");
                Ok(false)
            }
        }
    }

    fn check_hash_type_encoding(&self, shf: u8) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }
        let base = shf & !(SIGHASH_ANYONECANPAY | SIGHASH_FORKID);
        if !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type 0x{:02x}", shf),
            ));
        }
        let uses_fork_id = shf & SIGHASH_FORKID != 0;
        let fork_id_enabled = self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID);
        if uses_fork_id != fork_id_enabled {
            let msg = if fork_id_enabled {
                "fork id sighash must be used"
            } else {
                "fork id sighash set without flag"
            };
            return Err(InterpreterError::new(InterpreterErrorCode::IllegalForkID, msg));
        }
        Ok(())
    }

    fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        let strict = self.has_flag(ScriptFlags::VERIFY_DER_SIGNATURES)
            || self.has_flag(ScriptFlags::VERIFY_LOW_S)
            || self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING);
        if !strict {
            return Ok(());
        }
        let parsed = Signature::from_der(sig)
            .map_err(|e| InterpreterError::new(InterpreterErrorCode::SigDer, e.to_string()))?;
        if self.has_flag(ScriptFlags::VERIFY_LOW_S) && !parsed.has_low_s() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigHighS,
                "signature is not canonical due to unnecessarily high S value",
            ));
        }
        Ok(())
    }

    fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_STRICT_ENCODING) {
            return Ok(());
        }
        let ok = match pub_key.first() {
            Some(0x02) | Some(0x03) => pub_key.len() == 33,
            Some(0x04) => pub_key.len() == 65,
            _ => false,
        };
        if !ok {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type",
            ));
        }
        Ok(())
    }
}
