//! Script chunk parsing and the push-data codec.
//!
//! A script chunk is either an operand-less opcode or a data push carrying
//! its opcode, declared length and payload. Decoding is permissive: a push
//! that runs past the end of the script is kept with whatever bytes remain.
//! Encoding always uses an explicit length-prefixed push, never the
//! OP_1..OP_16 / OP_1NEGATE small-integer opcodes.

use scrypt_bsv_primitives::util::ByteSink;

use crate::opcodes::*;
use crate::ScriptError;

/// Largest payload a single push can carry (OP_PUSHDATA4 limit).
pub const MAX_PUSH_DATA_LEN: usize = 0xFFFF_FFFF;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The payload, present for push opcodes (OP_0 through OP_PUSHDATA4).
    pub data: Option<Vec<u8>>,
    /// Length the push declared. Larger than `data.len()` only for a
    /// truncated trailing push.
    pub declared_len: usize,
    /// Length-prefix bytes present after an OP_PUSHDATA opcode. Short of
    /// the full width only when the script ends inside the prefix.
    prefix_len: usize,
}

impl ScriptChunk {
    /// An operand-less opcode chunk.
    pub fn opcode(op: u8) -> Self {
        ScriptChunk {
            op,
            data: None,
            declared_len: 0,
            prefix_len: 0,
        }
    }

    /// A push chunk for `data`, using the same opcode `write_push_data` emits.
    pub fn push(data: Vec<u8>) -> Result<Self, ScriptError> {
        let op = push_opcode_for_len(data.len())?;
        Ok(ScriptChunk {
            op,
            declared_len: data.len(),
            data: Some(data),
            prefix_len: prefix_width(op),
        })
    }

    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }

    /// Whether the script ended before this push's length prefix or
    /// declared payload did.
    pub fn is_truncated(&self) -> bool {
        self.data.as_ref().map_or(false, |d| {
            d.len() < self.declared_len || self.prefix_len < prefix_width(self.op)
        })
    }

    /// Encode the chunk back to script bytes in its own opcode form.
    ///
    /// A decoded chunk re-encodes to exactly the bytes it was read from,
    /// including a truncated trailing push.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.op];
        let len = (self.declared_len as u32).to_le_bytes();
        out.extend_from_slice(&len[..self.prefix_len]);
        if let Some(ref data) = self.data {
            out.extend_from_slice(data);
        }
        out
    }

    /// Convert this chunk to its ASM token.
    ///
    /// Pushes render as lower-case hex (an empty push renders as `0`),
    /// OP_1NEGATE renders as `-1`, named opcodes render as their mnemonic,
    /// and unassigned opcodes render as the hex of the opcode byte.
    pub fn to_asm_string(&self) -> String {
        match self.data {
            Some(ref data) if data.is_empty() => "0".to_string(),
            Some(ref data) => hex::encode(data),
            None if self.op == OP_1NEGATE => "-1".to_string(),
            None => opcode_to_string(self.op),
        }
    }
}

/// Decode raw script bytes into chunks.
///
/// Opcode 0 yields an empty push, 0x01..=0x4b and OP_PUSHDATA1/2/4 yield
/// pushes, anything else an operand-less chunk. Never fails: a push that
/// overruns the script keeps the bytes that are present, and a length
/// prefix cut short is read from the bytes that remain.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// The chunks in script order.
pub fn decode_script(bytes: &[u8]) -> Vec<ScriptChunk> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;

        if op > OP_PUSHDATA4 {
            chunks.push(ScriptChunk::opcode(op));
            continue;
        }

        let width = prefix_width(op);
        let prefix_end = (pos + width).min(bytes.len());
        let prefix_len = prefix_end - pos;
        let declared_len = if width == 0 {
            op as usize
        } else {
            let mut le = [0u8; 4];
            le[..prefix_len].copy_from_slice(&bytes[pos..prefix_end]);
            u32::from_le_bytes(le) as usize
        };
        pos = prefix_end;

        let end = pos.saturating_add(declared_len).min(bytes.len());
        chunks.push(ScriptChunk {
            op,
            data: Some(bytes[pos..end].to_vec()),
            declared_len,
            prefix_len,
        });
        pos = end;
    }

    chunks
}

/// Width of the little-endian length that follows a push opcode.
fn prefix_width(op: u8) -> usize {
    match op {
        OP_PUSHDATA1 => 1,
        OP_PUSHDATA2 => 2,
        OP_PUSHDATA4 => 4,
        _ => 0,
    }
}

fn push_opcode_for_len(data_len: usize) -> Result<u8, ScriptError> {
    match data_len {
        0..=0x4b => Ok(data_len as u8),
        0x4c..=0xFF => Ok(OP_PUSHDATA1),
        0x100..=0xFFFF => Ok(OP_PUSHDATA2),
        _ if data_len <= MAX_PUSH_DATA_LEN => Ok(OP_PUSHDATA4),
        _ => Err(ScriptError::DataTooLarge(data_len)),
    }
}

/// Compute the push prefix for a payload of `data_len` bytes.
///
/// | length | prefix |
/// |---|---|
/// | 0 | `00` |
/// | 1..=75 | one length byte |
/// | 76..=255 | `4c` + 1 byte |
/// | 256..=65535 | `4d` + 2 bytes LE |
/// | 65536..=2^32-1 | `4e` + 4 bytes LE |
///
/// # Returns
/// The prefix bytes, or `DataTooLarge` above 2^32-1.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    let op = push_opcode_for_len(data_len)?;
    let mut prefix = vec![op];
    match op {
        OP_PUSHDATA1 => prefix.push(data_len as u8),
        OP_PUSHDATA2 => prefix.extend_from_slice(&(data_len as u16).to_le_bytes()),
        OP_PUSHDATA4 => prefix.extend_from_slice(&(data_len as u32).to_le_bytes()),
        _ => {}
    }
    Ok(prefix)
}

/// Write `data` as a single push into `sink`.
pub fn write_push_data(sink: &mut ByteSink, data: &[u8]) -> Result<(), ScriptError> {
    let prefix = push_data_prefix(data.len())?;
    sink.write(&prefix);
    sink.write(data);
    Ok(())
}

/// Encode multiple payloads as consecutive pushes.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut sink = ByteSink::new();
    for part in parts {
        write_push_data(&mut sink, part)?;
    }
    Ok(sink.into_bytes())
}
