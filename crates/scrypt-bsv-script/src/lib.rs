/// Script tooling for sCrypt BSV transactions.
///
/// Provides the opcode table, script chunk decoding and the push-data codec,
/// the `Script` type with hex and ASM forms, the name-tracking
/// `ExecutionStack`, and a script interpreter with a step observer hook.

pub mod opcodes;
pub mod chunk;
pub mod script;
pub mod stack;
pub mod interpreter;

mod error;
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
pub use stack::ExecutionStack;
