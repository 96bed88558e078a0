//! Input verification through the script interpreter.
//!
//! [`SighashChecker`] is the interpreter's signature seam backed by the
//! FORKID sighash; [`FailureTracker`] watches the steps to report where a
//! failing script stopped.

use serde::{Deserialize, Serialize};

use scrypt_bsv_primitives::ec::{PublicKey, Signature};
use scrypt_bsv_script::interpreter::{
    Config, Engine, InterpreterError, InterpreterErrorCode, ScriptFlags, Step, StepObserver,
    TxContext,
};
use scrypt_bsv_script::opcodes::{is_conditional, OP_RETURN};
use scrypt_bsv_script::Script;

use crate::output::TransactionOutput;
use crate::sighash;
use crate::transaction::Transaction;

/// Outcome of verifying one input.
///
/// Serializes as `{"success": bool, "error": string, "failedAt": {...}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResult {
    pub success: bool,
    /// Interpreter error text; empty on success.
    pub error: String,
    pub failed_at: FailedAt,
}

/// Where a failing script stopped. Every field is absent on success.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAt {
    /// 0 for the unlocking script, 1 for the locking script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcode: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed: Option<bool>,
}

impl FailedAt {
    pub fn is_empty(&self) -> bool {
        *self == FailedAt::default()
    }
}

/// Records where a failing script stopped.
///
/// Every relevant step overwrites the site, so after an aborted run it
/// holds the step that was running when execution aborted. A step is
/// relevant when it executes or is a conditional, since conditionals run
/// inside untaken branches too. Conditionals and OP_RETURN only update
/// the opcode, leaving the position on the last ordinary instruction.
#[derive(Debug, Default)]
pub struct FailureTracker {
    failed_at: FailedAt,
}

impl FailureTracker {
    pub fn new() -> Self {
        FailureTracker::default()
    }

    pub fn failed_at(&self) -> &FailedAt {
        &self.failed_at
    }

    pub fn into_failed_at(self) -> FailedAt {
        self.failed_at
    }
}

impl StepObserver for FailureTracker {
    fn on_step(&mut self, step: &Step<'_>) {
        if !step.executed && !is_conditional(step.opcode) {
            return;
        }
        if is_conditional(step.opcode) || step.opcode == OP_RETURN {
            self.failed_at.opcode = Some(step.opcode);
            return;
        }
        self.failed_at = FailedAt {
            script_index: Some(step.script_index),
            offset: Some(step.offset),
            opcode: Some(step.opcode),
            executed: Some(step.executed),
        };
    }
}

/// Checks OP_CHECKSIG signatures against the FORKID sighash of one input.
pub struct SighashChecker<'a> {
    tx: &'a Transaction,
    satoshis: u64,
}

impl<'a> SighashChecker<'a> {
    /// # Arguments
    /// * `tx` - The spending transaction.
    /// * `satoshis` - Value of the output being spent.
    pub fn new(tx: &'a Transaction, satoshis: u64) -> Self {
        SighashChecker { tx, satoshis }
    }
}

impl TxContext for SighashChecker<'_> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u8,
    ) -> Result<bool, InterpreterError> {
        let Some((_, der)) = full_sig.split_last() else {
            return Ok(false);
        };
        let (Ok(signature), Ok(public_key)) =
            (Signature::from_der(der), PublicKey::from_bytes(pub_key))
        else {
            return Ok(false);
        };

        let digest = sighash::signature_hash(
            self.tx,
            input_idx,
            sub_script.to_bytes(),
            sighash_flag as u32,
            self.satoshis,
        )
        .map_err(|e| InterpreterError::new(InterpreterErrorCode::InvalidParams, e.to_string()))?;

        Ok(public_key.verify(&digest, &signature))
    }
}

/// Execute `unlocking` against `output` for one input and fold the outcome
/// into a `VerifyResult`.
pub(crate) fn run(
    tx: &Transaction,
    input_index: usize,
    unlocking: &Script,
    output: &TransactionOutput,
    config: Config,
    flags: ScriptFlags,
) -> VerifyResult {
    let checker = SighashChecker::new(tx, output.satoshis);
    let mut tracker = FailureTracker::new();
    let outcome = Engine::new(config).execute(
        unlocking,
        &output.locking_script,
        flags,
        Some(&checker),
        input_index,
        Some(&mut tracker),
    );

    match outcome {
        Ok(()) => VerifyResult {
            success: true,
            error: String::new(),
            failed_at: FailedAt::default(),
        },
        Err(e) => {
            tracing::debug!(input = input_index, error = %e, "input verification failed");
            VerifyResult {
                success: false,
                error: e.to_string(),
                failed_at: tracker.into_failed_at(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrypt_bsv_script::interpreter::DEFAULT_VERIFY_FLAGS;
    use scrypt_bsv_script::opcodes::*;
    use scrypt_bsv_script::ExecutionStack;

    fn step(
        stack: &ExecutionStack,
        script_index: usize,
        offset: usize,
        opcode: u8,
        executed: bool,
    ) -> Step<'_> {
        Step {
            script_index,
            offset,
            opcode,
            executed,
            stack,
        }
    }

    #[test]
    fn test_tracker_keeps_last_executed_step() {
        let stack = ExecutionStack::new();
        let mut tracker = FailureTracker::new();
        tracker.on_step(&step(&stack, 0, 0, OP_1, true));
        tracker.on_step(&step(&stack, 1, 0, OP_VERIFY, true));
        tracker.on_step(&step(&stack, 1, 1, OP_DUP, false));
        assert_eq!(
            tracker.failed_at(),
            &FailedAt {
                script_index: Some(1),
                offset: Some(0),
                opcode: Some(OP_VERIFY),
                executed: Some(true),
            }
        );
    }

    #[test]
    fn test_tracker_conditionals_only_touch_opcode() {
        let stack = ExecutionStack::new();
        let mut tracker = FailureTracker::new();
        tracker.on_step(&step(&stack, 1, 2, OP_ADD, true));
        tracker.on_step(&step(&stack, 1, 3, OP_ENDIF, false));
        let failed = tracker.failed_at();
        assert_eq!(failed.opcode, Some(OP_ENDIF));
        assert_eq!(failed.offset, Some(2));

        tracker.on_step(&step(&stack, 1, 4, OP_RETURN, true));
        assert_eq!(tracker.failed_at().opcode, Some(OP_RETURN));
        assert_eq!(tracker.failed_at().offset, Some(2));
    }

    #[test]
    fn test_empty_failed_at_serializes_as_empty_object() {
        let result = VerifyResult {
            success: true,
            ..Default::default()
        };
        assert!(result.failed_at.is_empty());
        assert_eq!(
            serde_json::to_string(&result).expect("json"),
            r#"{"success":true,"error":"","failedAt":{}}"#
        );
    }

    #[test]
    fn test_failing_script_reports_site() {
        let mut tx = Transaction::new();
        tx.add_input(crate::TransactionInput::new([0x01; 32], 0, Script::new()));
        let output = TransactionOutput::new(
            1000,
            Script::from_bytes(&[OP_2, OP_EQUALVERIFY, OP_1]),
        );
        let unlocking = Script::from_bytes(&[OP_3]);

        let result = run(&tx, 0, &unlocking, &output, Config::unlimited(), DEFAULT_VERIFY_FLAGS);
        assert!(!result.success);
        assert!(!result.error.is_empty());
        assert_eq!(result.failed_at.script_index, Some(1));
        assert_eq!(result.failed_at.offset, Some(1));
        assert_eq!(result.failed_at.opcode, Some(OP_EQUALVERIFY));

        let json = serde_json::to_value(&result).expect("json");
        assert_eq!(json["failedAt"]["scriptIndex"], 1);
        assert_eq!(json["failedAt"]["executed"], true);
    }

    #[test]
    fn test_checker_rejects_garbage_signature() {
        let mut tx = Transaction::new();
        tx.add_input(crate::TransactionInput::new([0x01; 32], 0, Script::new()));
        let checker = SighashChecker::new(&tx, 1);
        let ok = checker
            .verify_signature(&[0x30, 0x01, 0x41], &[0x02; 33], &Script::new(), 0, 0x41)
            .expect("no error");
        assert!(!ok);
        assert!(!checker
            .verify_signature(&[], &[], &Script::new(), 0, 0x41)
            .expect("no error"));
    }
}
