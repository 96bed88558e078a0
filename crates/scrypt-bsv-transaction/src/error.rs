use scrypt_bsv_primitives::PrimitivesError;
use scrypt_bsv_script::ScriptError;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. trailing bytes after the lock time).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An input was built without either a structured or a raw script.
    #[error("missing script: one of script or script_buffer is required")]
    MissingScript,
    /// Signing or verification needs the output this input spends.
    #[error("missing previous output")]
    MissingPrevOutput,
    #[error("input index {index} out of range (tx has {count} inputs)")]
    InvalidInputIndex { index: usize, count: usize },
    /// Only FORKID sighash types are supported.
    #[error("unsupported sighash type {0:#x}: SIGHASH_FORKID is required")]
    UnsupportedSighash(u32),
    /// No lock time in range produced a low-S friendly digest.
    #[error("low-S grinding exhausted the lock time range")]
    LowSGrindExhausted,
    /// An underlying script error (forwarded from `scrypt-bsv-script`).
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    /// An underlying primitives error (forwarded from `scrypt-bsv-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
