/// Error types for script operations.
///
/// Covers push-data encoding limits, hex and ASM parsing failures, and
/// execution stack misuse.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Push data exceeds the 2^32-1 byte limit of OP_PUSHDATA4.
    #[error("data too large: {0} bytes")]
    DataTooLarge(usize),

    /// A hex string or ASM hex token contained non-hex characters.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcode {0:#04x}")]
    InvalidOpcodeType(u8),

    /// More names were supplied than the stack holds.
    #[error("inconsistent stack: {names} names for {depth} slots")]
    InconsistentStack { names: usize, depth: usize },
}
