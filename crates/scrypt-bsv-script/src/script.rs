/// Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (unlocking) and outputs (locking)
/// to define spending conditions. The Script wraps a `Vec<u8>` and provides
/// construction from hex, ASM and chunks, plus hex and ASM rendering.

use std::fmt;

use scrypt_bsv_primitives::util::decode_hex;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub const fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex string.
    ///
    /// Accepts an optional `0x` prefix and odd-length input.
    ///
    /// # Returns
    /// The script, or `InvalidHex` on non-hex characters.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex_token(hex_str)?))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Assemble a script from chunks.
    pub fn from_chunks(chunks: &[ScriptChunk]) -> Self {
        Script(chunks.iter().flat_map(ScriptChunk::to_bytes).collect())
    }

    /// Parse a space separated ASM string.
    ///
    /// Each token is a known mnemonic, the literal `0` (empty push), the
    /// literal `-1` (OP_1NEGATE), or hex data which is encoded as an
    /// explicit push.
    ///
    /// # Arguments
    /// * `asm` - ASM text such as `"OP_DUP OP_HASH160 89ab... OP_EQUALVERIFY OP_CHECKSIG"`.
    ///
    /// # Returns
    /// The assembled script, or `InvalidHex` / `DataTooLarge` for a bad data token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            match token {
                "0" => script.0.push(OP_0),
                "-1" => script.0.push(OP_1NEGATE),
                _ => match string_to_opcode(token) {
                    Some(op) => script.0.push(op),
                    None => {
                        let data = hex_token(token)?;
                        script.append_push_data(&data)?;
                    }
                },
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render the script as space separated ASM.
    pub fn to_asm(&self) -> String {
        self.chunks()
            .iter()
            .map(ScriptChunk::to_asm_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Borrow the raw script bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the script into chunks (see `decode_script`).
    pub fn chunks(&self) -> Vec<ScriptChunk> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Check for the pattern `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == 0x14
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Whether the script contains only push operations (including the
    /// small-integer opcodes) and no truncated push.
    pub fn is_push_only(&self) -> bool {
        self.chunks()
            .iter()
            .all(|c| (c.is_push() && !c.is_truncated()) || c.op == OP_1NEGATE || is_small_int_op(c.op))
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append `data` as an explicit length-prefixed push.
    ///
    /// # Returns
    /// `Ok(())` on success, or `DataTooLarge` above 2^32-1 bytes.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append operand-less opcodes.
    ///
    /// Rejects the length-carrying push opcodes (0x01..=OP_PUSHDATA4); use
    /// `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| op > OP_0 && op <= OP_PUSHDATA4) {
            return Err(ScriptError::InvalidOpcodeType(op));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }
}

fn hex_token(s: &str) -> Result<Vec<u8>, ScriptError> {
    decode_hex(s).map_err(|e| ScriptError::InvalidHex(e.to_string()))
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_asm())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
