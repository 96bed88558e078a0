//! Interpreter error types.

use std::fmt;

/// Error codes for the script interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    /// Internal marker for a successful early OP_RETURN after genesis.
    Ok,
    InvalidParams,
    MalformedPush,
    EarlyReturn,
    EmptyStack,
    EvalFalse,
    ScriptTooBig,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    NumberTooBig,
    InvalidNumberRange,
    DivideByZero,
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    DisabledOpcode,
    ReservedOpcode,
    UnsupportedOpcode,
    InvalidStackOperation,
    InvalidAltStackOperation,
    UnbalancedConditional,
    InvalidSplitRange,
    InvalidOperandSize,
    ImpossibleEncoding,
    MinimalIf,
    InvalidSigHashType,
    SigDer,
    SigHighS,
    NotPushOnly,
    PubKeyType,
    CleanStack,
    NullFail,
    DiscourageUpgradableNOPs,
    IllegalForkID,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script interpreter error with an error code and description.
///
/// The `Display` form is the description alone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{description}")]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: impl Into<String>) -> Self {
        InterpreterError {
            code,
            description: description.into(),
        }
    }
}
