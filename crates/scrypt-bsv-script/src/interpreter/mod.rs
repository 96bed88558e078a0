//! Script interpreter.
//!
//! Executes an unlocking script followed by a locking script over a
//! name-tracking [`ExecutionStack`]. The interpreter does not depend on the
//! transaction crate: callers provide a [`TxContext`] that checks
//! signatures, and may attach a [`StepObserver`] that sees every opcode
//! before it runs.
//!
//! # Example
//!
//! ```ignore
//! use scrypt_bsv_script::interpreter::{Config, Engine, DEFAULT_VERIFY_FLAGS};
//!
//! let engine = Engine::new(Config::unlimited());
//! engine.execute(&unlocking_script, &locking_script, DEFAULT_VERIFY_FLAGS, Some(&ctx), 0, None)?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod scriptnum;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;
mod thread;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::{ScriptFlags, DEFAULT_VERIFY_FLAGS};

use crate::{ExecutionStack, Script};
use thread::Thread;

/// Signature verification supplied by the transaction layer.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` includes the sighash flag byte at the end, which is also
    /// passed as `sighash_flag`. `sub_script` is the part of the executing
    /// script that the signature commits to.
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid, Err on failure.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u8,
    ) -> Result<bool, InterpreterError>;
}

/// One opcode about to be evaluated.
#[derive(Debug)]
pub struct Step<'s> {
    /// 0 for the unlocking script, 1 for the locking script.
    pub script_index: usize,
    /// Chunk index within the script.
    pub offset: usize,
    pub opcode: u8,
    /// False when the opcode sits in a branch that is not taken.
    pub executed: bool,
    /// Main stack before the opcode runs.
    pub stack: &'s ExecutionStack,
}

/// Receives every step of an execution, in order.
pub trait StepObserver {
    fn on_step(&mut self, step: &Step<'_>);
}

/// The script execution engine.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Engine { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking script.
    /// * `locking_script` - The spent output's locking script.
    /// * `flags` - Verification flags.
    /// * `tx_context` - Signature checker for OP_CHECKSIG; without one,
    ///   any non-empty signature check fails.
    /// * `input_idx` - The input index being verified.
    /// * `observer` - Optional per-step callback.
    ///
    /// # Returns
    /// `Ok(())` if the scripts leave a true value on the stack.
    pub fn execute<'a>(
        &'a self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
        observer: Option<&'a mut dyn StepObserver>,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(
            unlocking_script,
            locking_script,
            &self.config,
            flags,
            tx_context,
            input_idx,
            observer,
        )?;
        let result = thread.execute();
        if let Err(ref e) = result {
            tracing::debug!(input = input_idx, code = %e.code, error = %e, "script execution failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::*;

    fn after_genesis() -> ScriptFlags {
        ScriptFlags::UTXO_AFTER_GENESIS
    }

    fn run(unlock: &str, lock: &str) -> Result<(), InterpreterError> {
        run_with(unlock, lock, after_genesis())
    }

    fn run_with(unlock: &str, lock: &str, flags: ScriptFlags) -> Result<(), InterpreterError> {
        let unlock = Script::from_asm(unlock).expect("unlock asm");
        let lock = Script::from_asm(lock).expect("lock asm");
        Engine::default().execute(&unlock, &lock, flags, None, 0, None)
    }

    fn code(result: Result<(), InterpreterError>) -> InterpreterErrorCode {
        result.expect_err("expected failure").code
    }

    #[test]
    fn test_simple_true() {
        assert!(run("", "OP_1").is_ok());
        assert!(run("OP_1 OP_1", "OP_EQUAL").is_ok());
        assert_eq!(code(run("OP_1 OP_2", "OP_EQUAL")), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_empty_both_scripts() {
        assert_eq!(code(run("", "")), InterpreterErrorCode::EvalFalse);
    }

    #[test]
    fn test_empty_stack_at_end() {
        assert_eq!(code(run("OP_1", "OP_DROP")), InterpreterErrorCode::EmptyStack);
    }

    #[test]
    fn test_arithmetic() {
        assert!(run("OP_2 OP_3", "OP_ADD OP_5 OP_EQUAL").is_ok());
        assert!(run("OP_5 OP_3", "OP_SUB OP_2 OP_EQUAL").is_ok());
        assert!(run("OP_3 OP_4", "OP_MUL OP_12 OP_NUMEQUAL").is_ok());
        assert!(run("-1 OP_5", "OP_MUL OP_5 OP_NEGATE OP_NUMEQUAL").is_ok());
        // truncation toward zero
        assert!(run("OP_7 OP_NEGATE OP_2", "OP_DIV OP_3 OP_NEGATE OP_NUMEQUAL").is_ok());
        assert!(run("OP_7 OP_NEGATE OP_2", "OP_MOD -1 OP_NUMEQUAL").is_ok());
        assert!(run("OP_5 OP_NEGATE", "OP_ABS OP_5 OP_NUMEQUAL").is_ok());
        assert!(run("OP_3 OP_2 OP_5", "OP_WITHIN").is_ok());
        assert!(run("OP_5 OP_2 OP_5", "OP_WITHIN OP_NOT").is_ok());
        assert!(run("OP_3 OP_7", "OP_MIN OP_3 OP_NUMEQUAL").is_ok());
        assert!(run("OP_3 OP_7", "OP_MAX OP_7 OP_NUMEQUAL").is_ok());
        assert!(run("OP_1 OP_2", "OP_LESSTHAN").is_ok());
        assert!(run("OP_0 OP_1", "OP_BOOLOR").is_ok());
        assert!(run("OP_0 OP_1", "OP_BOOLAND OP_NOT").is_ok());
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(code(run("OP_1 OP_0", "OP_DIV")), InterpreterErrorCode::DivideByZero);
        assert_eq!(code(run("OP_1 OP_0", "OP_MOD")), InterpreterErrorCode::DivideByZero);
    }

    #[test]
    fn test_number_length_limit() {
        let engine = Engine::new(Config::after_genesis().with_max_script_number_length(4));
        let unlock = Script::from_asm("0102030405").expect("asm");
        let lock = Script::from_asm("OP_1ADD").expect("asm");
        let err = engine
            .execute(&unlock, &lock, after_genesis(), None, 0, None)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NumberTooBig);
    }

    #[test]
    fn test_if_else_endif() {
        assert!(run("OP_1", "OP_IF OP_1 OP_ELSE OP_0 OP_ENDIF").is_ok());
        assert_eq!(
            code(run("OP_0", "OP_IF OP_1 OP_ELSE OP_0 OP_ENDIF")),
            InterpreterErrorCode::EvalFalse
        );
        assert!(run("OP_0", "OP_NOTIF OP_1 OP_ENDIF").is_ok());
        // nested untaken branch does not pop
        assert!(run("OP_1 OP_0", "OP_IF OP_IF OP_0 OP_ENDIF OP_ENDIF").is_ok());
    }

    #[test]
    fn test_unbalanced_conditionals() {
        assert_eq!(code(run("OP_1", "OP_IF OP_1")), InterpreterErrorCode::UnbalancedConditional);
        assert_eq!(code(run("OP_1", "OP_ENDIF")), InterpreterErrorCode::UnbalancedConditional);
        assert_eq!(code(run("OP_1", "OP_ELSE")), InterpreterErrorCode::UnbalancedConditional);
        assert_eq!(
            code(run("OP_1", "OP_IF OP_1 OP_ELSE OP_1 OP_ELSE OP_1 OP_ENDIF")),
            InterpreterErrorCode::UnbalancedConditional
        );
    }

    #[test]
    fn test_minimal_if() {
        let flags = after_genesis() | ScriptFlags::VERIFY_MINIMAL_IF;
        assert_eq!(
            code(run_with("OP_2", "OP_IF OP_1 OP_ENDIF", flags)),
            InterpreterErrorCode::MinimalIf
        );
        assert!(run_with("OP_1", "OP_IF OP_1 OP_ENDIF", flags).is_ok());
    }

    #[test]
    fn test_op_return() {
        assert_eq!(
            code(run_with("OP_1", "OP_RETURN", ScriptFlags::NONE)),
            InterpreterErrorCode::EarlyReturn
        );
        assert!(run("OP_1", "OP_RETURN OP_0").is_ok());
        // inside a branch, the rest is only parsed for balance
        assert!(run("OP_1 OP_1", "OP_IF OP_RETURN OP_0 OP_ENDIF").is_ok());
    }

    #[test]
    fn test_verify_ops() {
        assert_eq!(code(run("OP_0", "OP_VERIFY OP_1")), InterpreterErrorCode::Verify);
        assert_eq!(
            code(run("OP_1 OP_2", "OP_EQUALVERIFY OP_1")),
            InterpreterErrorCode::EqualVerify
        );
        assert_eq!(
            code(run("OP_1 OP_2", "OP_NUMEQUALVERIFY OP_1")),
            InterpreterErrorCode::NumEqualVerify
        );
    }

    #[test]
    fn test_stack_ops() {
        assert!(run("OP_1 OP_2 OP_3", "OP_ROT OP_1 OP_EQUALVERIFY OP_DROP OP_2 OP_EQUAL").is_ok());
        assert!(run("OP_1 OP_2", "OP_SWAP OP_1 OP_EQUALVERIFY OP_2 OP_EQUAL").is_ok());
        assert!(run("OP_1 OP_2", "OP_TUCK OP_DEPTH OP_3 OP_EQUALVERIFY OP_2 OP_EQUALVERIFY OP_DROP OP_2 OP_EQUAL").is_ok());
        assert!(run("OP_5 OP_6 OP_7", "OP_2 OP_PICK OP_5 OP_EQUALVERIFY OP_DEPTH OP_3 OP_EQUAL").is_ok());
        assert!(run("OP_5 OP_6 OP_7", "OP_2 OP_ROLL OP_5 OP_EQUALVERIFY OP_DEPTH OP_2 OP_EQUAL").is_ok());
        assert!(run("OP_1 OP_2", "OP_2DUP OP_DEPTH OP_4 OP_EQUALVERIFY OP_2DROP OP_2DROP OP_1").is_ok());
        assert!(run("OP_1 OP_2 OP_3 OP_4", "OP_2SWAP OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_4 OP_EQUALVERIFY OP_3 OP_EQUAL").is_ok());
        assert!(run("OP_1 OP_2 OP_3 OP_4 OP_5 OP_6", "OP_2ROT OP_2 OP_EQUALVERIFY OP_1 OP_EQUALVERIFY OP_DEPTH OP_4 OP_EQUAL").is_ok());
        assert!(run("OP_7", "OP_TOALTSTACK OP_0 OP_FROMALTSTACK OP_7 OP_EQUAL OP_NIP").is_ok());
    }

    #[test]
    fn test_stack_underflow() {
        assert_eq!(code(run("", "OP_DROP OP_1")), InterpreterErrorCode::InvalidStackOperation);
        assert_eq!(code(run("OP_1", "OP_5 OP_PICK")), InterpreterErrorCode::InvalidStackOperation);
        assert_eq!(
            code(run("OP_1", "OP_FROMALTSTACK")),
            InterpreterErrorCode::InvalidAltStackOperation
        );
    }

    #[test]
    fn test_alt_stack_cleared_between_scripts() {
        assert_eq!(
            code(run("OP_1 OP_TOALTSTACK", "OP_FROMALTSTACK")),
            InterpreterErrorCode::InvalidAltStackOperation
        );
    }

    #[test]
    fn test_splice_ops() {
        assert!(run("0102 0304", "OP_CAT 01020304 OP_EQUAL").is_ok());
        assert!(run("01020304 OP_1", "OP_SPLIT 020304 OP_EQUALVERIFY 01 OP_EQUAL").is_ok());
        assert!(run("0102", "OP_SIZE OP_2 OP_EQUALVERIFY OP_DROP OP_1").is_ok());
        assert_eq!(
            code(run("0102 OP_3", "OP_SPLIT")),
            InterpreterErrorCode::InvalidSplitRange
        );
        assert!(run("OP_2 OP_4", "OP_NUM2BIN 02000000 OP_EQUAL").is_ok());
        assert!(run("-1 OP_3", "OP_NUM2BIN 010080 OP_EQUAL").is_ok());
        assert!(run("02000000", "OP_BIN2NUM OP_2 OP_EQUAL").is_ok());
        assert_eq!(
            code(run("0102 OP_1", "OP_NUM2BIN")),
            InterpreterErrorCode::ImpossibleEncoding
        );
    }

    #[test]
    fn test_cat_respects_element_limit() {
        let engine = Engine::new(Config::after_genesis().with_max_script_element_size(3));
        let unlock = Script::from_asm("0102 0304").expect("asm");
        let lock = Script::from_asm("OP_CAT").expect("asm");
        let err = engine
            .execute(&unlock, &lock, after_genesis(), None, 0, None)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::ElementTooBig);
    }

    #[test]
    fn test_bitwise_ops() {
        assert!(run("f0", "OP_INVERT 0f OP_EQUAL").is_ok());
        assert!(run("ff00 0ff0", "OP_AND 0f00 OP_EQUAL").is_ok());
        assert!(run("ff00 0ff0", "OP_OR fff0 OP_EQUAL").is_ok());
        assert!(run("ff00 0ff0", "OP_XOR f0f0 OP_EQUAL").is_ok());
        assert_eq!(code(run("ff 0ff0", "OP_AND")), InterpreterErrorCode::InvalidOperandSize);
        assert!(run("0180 OP_1", "OP_LSHIFT 0300 OP_EQUAL").is_ok());
        assert!(run("0180 OP_1", "OP_RSHIFT 00c0 OP_EQUAL").is_ok());
    }

    #[test]
    fn test_hash_ops() {
        let empty_sha256 = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(run("0", &format!("OP_SHA256 {} OP_EQUAL", empty_sha256)).is_ok());
        assert!(run("0", "OP_HASH160 OP_SIZE OP_NIP 14 OP_EQUAL").is_ok());
        assert!(run("0", "OP_RIPEMD160 OP_SIZE OP_NIP 14 OP_EQUAL").is_ok());
        assert!(run("0", "OP_SHA1 OP_SIZE OP_NIP 14 OP_EQUAL").is_ok());
        assert!(run("0", "OP_HASH256 OP_SIZE OP_NIP 20 OP_EQUAL").is_ok());
    }

    #[test]
    fn test_disabled_and_reserved() {
        assert_eq!(code(run("OP_1", "OP_2MUL")), InterpreterErrorCode::DisabledOpcode);
        assert_eq!(code(run("OP_1", "OP_RESERVED")), InterpreterErrorCode::ReservedOpcode);
        // reserved opcodes in an untaken branch are harmless
        assert!(run("OP_0", "OP_IF OP_RESERVED OP_ENDIF OP_1").is_ok());
        // disabled opcodes fail anywhere before genesis
        assert_eq!(
            code(run_with("OP_0", "OP_IF OP_2DIV OP_ENDIF OP_1", ScriptFlags::NONE)),
            InterpreterErrorCode::DisabledOpcode
        );
        assert_eq!(
            code(run("OP_1", "OP_CHECKMULTISIG")),
            InterpreterErrorCode::UnsupportedOpcode
        );
    }

    #[test]
    fn test_upgradable_nops() {
        assert!(run("OP_1", "OP_NOP1 OP_NOP10").is_ok());
        let flags = after_genesis() | ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS;
        assert_eq!(
            code(run_with("OP_1", "OP_NOP5", flags)),
            InterpreterErrorCode::DiscourageUpgradableNOPs
        );
    }

    #[test]
    fn test_clean_stack() {
        let flags = after_genesis() | ScriptFlags::VERIFY_CLEAN_STACK;
        assert_eq!(code(run_with("OP_1 OP_1", "OP_1", flags)), InterpreterErrorCode::CleanStack);
        assert!(run_with("", "OP_1", flags).is_ok());
    }

    #[test]
    fn test_sig_push_only() {
        let flags = after_genesis() | ScriptFlags::VERIFY_SIG_PUSH_ONLY;
        assert_eq!(code(run_with("OP_1 OP_DUP", "OP_EQUAL", flags)), InterpreterErrorCode::NotPushOnly);
    }

    #[test]
    fn test_truncated_push_rejected() {
        let unlock = Script::from_bytes(&[0x05, 0x01]);
        let lock = Script::from_bytes(&[OP_1]);
        let err = Engine::default()
            .execute(&unlock, &lock, after_genesis(), None, 0, None)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::MalformedPush);
    }

    #[test]
    fn test_checksig_without_context() {
        // empty signature pushes false without consulting a context
        assert!(run("0 0", "OP_CHECKSIG OP_NOT").is_ok());
    }

    struct AlwaysValid;

    impl TxContext for AlwaysValid {
        fn verify_signature(
            &self,
            _full_sig: &[u8],
            _pub_key: &[u8],
            _sub_script: &Script,
            _input_idx: usize,
            _sighash_flag: u8,
        ) -> Result<bool, InterpreterError> {
            Ok(true)
        }
    }

    #[test]
    fn test_checksig_encoding_checks() {
        let pub_key = format!("02{}", "11".repeat(32));
        let der = "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd410220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09";
        let flags = DEFAULT_VERIFY_FLAGS;
        let exec = |sig: String, key: &str| {
            let unlock = Script::from_asm(&format!("{} {}", sig, key)).expect("asm");
            let lock = Script::from_asm("OP_CHECKSIG").expect("asm");
            Engine::default().execute(&unlock, &lock, flags, Some(&AlwaysValid), 0, None)
        };

        assert!(exec(format!("{}41", der), &pub_key).is_ok());
        assert_eq!(
            code(exec(format!("{}01", der), &pub_key)),
            InterpreterErrorCode::IllegalForkID
        );
        assert_eq!(
            code(exec(format!("{}45", der), &pub_key)),
            InterpreterErrorCode::InvalidSigHashType
        );
        assert_eq!(code(exec("300141".to_string(), &pub_key)), InterpreterErrorCode::SigDer);
        assert_eq!(
            code(exec(format!("{}41", der), "05aa")),
            InterpreterErrorCode::PubKeyType
        );
    }

    struct Recorder {
        steps: Vec<(usize, usize, u8, bool, usize)>,
    }

    impl StepObserver for Recorder {
        fn on_step(&mut self, step: &Step<'_>) {
            self.steps.push((
                step.script_index,
                step.offset,
                step.opcode,
                step.executed,
                step.stack.len(),
            ));
        }
    }

    #[test]
    fn test_observer_sees_every_step() {
        let unlock = Script::from_asm("OP_0").expect("asm");
        let lock = Script::from_asm("OP_IF OP_2 OP_ELSE OP_3 OP_ENDIF").expect("asm");
        let mut recorder = Recorder { steps: Vec::new() };
        Engine::default()
            .execute(&unlock, &lock, after_genesis(), None, 0, Some(&mut recorder))
            .expect("executes");
        assert_eq!(
            recorder.steps,
            vec![
                (0, 0, OP_0, true, 0),
                (1, 0, OP_IF, true, 1),
                (1, 1, OP_2, false, 0),
                (1, 2, OP_ELSE, false, 0),
                (1, 3, OP_3, true, 0),
                (1, 4, OP_ENDIF, true, 1),
            ]
        );
    }

    #[test]
    fn test_stack_names_follow_items() {
        struct Names(Vec<Vec<String>>);
        impl StepObserver for Names {
            fn on_step(&mut self, step: &Step<'_>) {
                self.0.push(step.stack.names().to_vec());
            }
        }
        let mut names = Names(Vec::new());
        let unlock = Script::from_asm("OP_1 OP_2").expect("asm");
        let lock = Script::from_asm("OP_SWAP OP_DROP").expect("asm");
        Engine::default()
            .execute(&unlock, &lock, after_genesis(), None, 0, Some(&mut names))
            .expect("executes");
        assert_eq!(names.0.len(), 4);
        assert!(names.0[3].iter().all(|n| n == crate::stack::DEFAULT_VAR_NAME));
    }

    #[test]
    fn test_too_many_operations() {
        let engine = Engine::new(Config {
            max_ops: 2,
            ..Config::after_genesis()
        });
        let unlock = Script::from_asm("OP_1").expect("asm");
        let lock = Script::from_asm("OP_DUP OP_DROP OP_DUP OP_DROP").expect("asm");
        let err = engine
            .execute(&unlock, &lock, after_genesis(), None, 0, None)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::TooManyOperations);
    }

    #[test]
    fn test_stack_overflow() {
        let engine = Engine::new(Config {
            max_stack_size: 2,
            ..Config::after_genesis()
        });
        let unlock = Script::from_asm("OP_1 OP_1 OP_1").expect("asm");
        let lock = Script::from_asm("OP_DROP").expect("asm");
        let err = engine
            .execute(&unlock, &lock, after_genesis(), None, 0, None)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::StackOverflow);
    }

    #[test]
    fn test_error_display_is_description() {
        let err = run("OP_1 OP_0", "OP_DIV").unwrap_err();
        assert_eq!(err.to_string(), "divide by zero");
    }
}
