//! Signature records produced when signing an input.

use scrypt_bsv_primitives::ec::{PublicKey, Signature};

/// One signature over one input, with everything needed to place it in an
/// unlocking script.
#[derive(Clone, Debug)]
pub struct TransactionSignature {
    pub public_key: PublicKey,
    /// Previous transaction id in display order.
    pub prev_tx_id: [u8; 32],
    pub output_index: u32,
    pub input_index: usize,
    pub signature: Signature,
    pub sighash_type: u32,
}

impl TransactionSignature {
    /// DER signature followed by the sighash flag byte, as OP_CHECKSIG
    /// expects it on the stack.
    pub fn to_checksig_format(&self) -> Vec<u8> {
        let mut out = self.signature.to_der();
        out.push(self.sighash_type as u8);
        out
    }
}
