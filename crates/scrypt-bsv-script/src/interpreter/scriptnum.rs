//! Script number codec.
//!
//! Numbers on the stack are little-endian sign-magnitude byte strings: the
//! high bit of the last byte is the sign and zero is the empty string.
//! Arithmetic is carried out on `BigInt` so post-genesis operands of any
//! permitted length behave the same as small ones.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// Decode a stack element as a number no longer than `max_len` bytes.
pub fn decode_num(bytes: &[u8], max_len: usize) -> Result<BigInt, InterpreterError> {
    if bytes.len() > max_len {
        return Err(InterpreterError::new(
            InterpreterErrorCode::NumberTooBig,
            format!(
                "numeric value is {} bytes which exceeds the max allowed of {}",
                bytes.len(),
                max_len
            ),
        ));
    }
    let Some((&last, _)) = bytes.split_last() else {
        return Ok(BigInt::zero());
    };

    let mut magnitude = bytes.to_vec();
    let idx = magnitude.len() - 1;
    magnitude[idx] = last & 0x7f;
    let sign = if last & 0x80 != 0 { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_bytes_le(sign, &magnitude))
}

/// Encode a number in its minimal stack form.
pub fn encode_num(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    let (_, mut out) = n.abs().to_bytes_le();
    let negative = n.is_negative();
    let idx = out.len() - 1;
    if out[idx] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[idx] |= 0x80;
    }
    out
}

/// Strip redundant trailing bytes so `data` is the minimal encoding of the
/// same number. Negative zero becomes the empty string.
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    let Some((&last, _)) = data.split_last() else {
        return Vec::new();
    };
    if last & 0x7f != 0 {
        return data.to_vec();
    }
    if data.len() == 1 {
        return Vec::new();
    }
    if data[data.len() - 2] & 0x80 != 0 {
        return data.to_vec();
    }

    let mut out = data.to_vec();
    for i in (1..out.len()).rev() {
        if out[i - 1] != 0 {
            if out[i - 1] & 0x80 != 0 {
                out[i] = last;
                out.truncate(i + 1);
            } else {
                out[i - 1] |= last;
                out.truncate(i);
            }
            return out;
        }
    }
    Vec::new()
}

/// Interpret a stack element as a boolean. Any non-zero byte is true,
/// except a lone sign bit in the last position (negative zero).
pub fn as_bool(bytes: &[u8]) -> bool {
    for (i, &b) in bytes.iter().enumerate() {
        if b != 0 {
            return !(i == bytes.len() - 1 && b == 0x80);
        }
    }
    false
}

pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        Vec::new()
    }
}
