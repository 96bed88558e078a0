//! Flow control opcodes.

use crate::opcodes::OP_NOP1;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::scriptnum::as_bool;
use super::thread::{CondState, Thread};

impl<'a> Thread<'a> {
    /// OP_IF / OP_NOTIF. The condition is only popped when the enclosing
    /// branch executes.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let state = if self.is_executing() {
            let value = self.pop()?;
            if self.has_flag(ScriptFlags::VERIFY_MINIMAL_IF) && value.len() > 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    "conditional has data of length greater than 1",
                ));
            }
            if self.has_flag(ScriptFlags::VERIFY_MINIMAL_IF) && value.len() == 1 && value[0] != 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    "conditional failed minimal check",
                ));
            }
            if as_bool(&value) != negate {
                CondState::True
            } else {
                CondState::False
            }
        } else {
            CondState::Skip
        };
        self.cond_stack.push(state);
        self.else_stack.push(false);
        Ok(())
    }

    pub(crate) fn op_else(&mut self) -> Result<(), InterpreterError> {
        let (Some(state), Some(seen_else)) = (self.cond_stack.last_mut(), self.else_stack.last_mut())
        else {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "encountered opcode OP_ELSE with no matching opcode to begin conditional execution",
            ));
        };
        // one OP_ELSE per conditional after genesis
        if *seen_else && self.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "encountered duplicate OP_ELSE",
            ));
        }
        *seen_else = true;
        *state = match *state {
            CondState::True => CondState::False,
            CondState::False => CondState::True,
            CondState::Skip => CondState::Skip,
        };
        Ok(())
    }

    pub(crate) fn op_endif(&mut self) -> Result<(), InterpreterError> {
        if self.cond_stack.pop().is_none() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "encountered opcode OP_ENDIF with no matching opcode to begin conditional execution",
            ));
        }
        self.else_stack.pop();
        Ok(())
    }

    /// Pop the top item and fail with `code` unless it is true.
    pub(crate) fn verify_top(&mut self, code: InterpreterErrorCode, name: &str) -> Result<(), InterpreterError> {
        if !self.pop_bool()? {
            return Err(InterpreterError::new(code, format!("{} failed", name)));
        }
        Ok(())
    }

    /// OP_RETURN ends the script successfully after genesis. Inside a
    /// branch, the remaining opcodes are only parsed for balance.
    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        if !self.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EarlyReturn,
                "script returned early",
            ));
        }
        if self.cond_stack.is_empty() {
            return Err(InterpreterError::new(InterpreterErrorCode::Ok, "success"));
        }
        self.early_return = true;
        Ok(())
    }

    pub(crate) fn op_upgradable_nop(&mut self, op: u8) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("OP_NOP{} reserved for soft-fork upgrades", op - (OP_NOP1 - 1)),
            ));
        }
        Ok(())
    }
}
