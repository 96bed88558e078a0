//! ECDSA signature with DER serialization and RFC6979 deterministic nonces.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa;
use k256::elliptic_curve::scalar::IsHigh;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Half of the secp256k1 curve order (N/2). An S value above this is "high".
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// An ECDSA signature with R and S components (32 bytes each, big-endian).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a strictly DER-encoded ECDSA signature.
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>` with
    /// no trailing bytes and minimally encoded, non-negative integers.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes (without a sighash flag byte).
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` describing the defect.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let bad = |msg: &str| PrimitivesError::InvalidSignature(msg.to_string());

        if bytes.len() < 8 || bytes.len() > 72 {
            return Err(bad("malformed signature: bad size"));
        }
        if bytes[0] != 0x30 {
            return Err(bad("malformed signature: no header magic"));
        }
        if bytes[1] as usize != bytes.len() - 2 {
            return Err(bad("malformed signature: bad length"));
        }

        let (r, rest) = read_der_int(&bytes[2..]).ok_or_else(|| bad("malformed signature: bogus R"))?;
        let (s, rest) = read_der_int(rest).ok_or_else(|| bad("malformed signature: bogus S"))?;
        if !rest.is_empty() {
            return Err(bad("malformed signature: trailing bytes"));
        }

        let r = to_32_bytes(r)?;
        let s = to_32_bytes(s)?;
        if r == [0u8; 32] || s == [0u8; 32] {
            return Err(bad("signature component is zero"));
        }
        Ok(Signature { r, s })
    }

    /// Serialize the signature in DER format.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&self.s);

        let mut out = Vec::with_capacity(6 + rb.len() + sb.len());
        out.push(0x30);
        out.push((4 + rb.len() + sb.len()) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Whether S lies in the lower half of the curve order.
    pub fn has_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Sign a 32-byte digest using an RFC6979 deterministic nonce.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte digest to sign.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// A low-S signature, or an error if the digest has the wrong size.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        if hash.len() != 32 {
            return Err(PrimitivesError::InvalidSignature(format!(
                "digest must be 32 bytes, got {}",
                hash.len()
            )));
        }
        let k256_sig: ecdsa::Signature = priv_key
            .signing_key()
            .sign_prehash(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let mut r = [0u8; 32];
        r.copy_from_slice(&k256_sig.r().to_bytes());
        let s_scalar = *k256_sig.s();
        let s_scalar = if bool::from(s_scalar.is_high()) {
            -s_scalar
        } else {
            s_scalar
        };
        let mut s = [0u8; 32];
        s.copy_from_slice(&s_scalar.to_bytes());

        Ok(Signature { r, s })
    }

    /// Verify this signature against a digest and public key.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        let k256_sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        pub_key
            .verifying_key()
            .verify_prehash(hash, &k256_sig)
            .is_ok()
    }
}

/// Read one DER INTEGER, returning its content bytes and the remainder.
fn read_der_int(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if data.len() < 2 || data[0] != 0x02 {
        return None;
    }
    let len = data[1] as usize;
    if len == 0 || data.len() < 2 + len {
        return None;
    }
    let int = &data[2..2 + len];
    // negative
    if int[0] & 0x80 != 0 {
        return None;
    }
    // non-minimal padding
    if len > 1 && int[0] == 0x00 && int[1] & 0x80 == 0 {
        return None;
    }
    Some((int, &data[2 + len..]))
}

/// Strip leading zeros and add a 0x00 pad if the high bit is set.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    if trimmed[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(trimmed.len() + 1);
        out.push(0x00);
        out.extend_from_slice(trimmed);
        out
    } else {
        trimmed.to_vec()
    }
}

fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer value too large for 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}
