//! Script execution thread.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::stack::ExecutionStack;
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashKind;
use super::scriptnum::{as_bool, decode_num, encode_num, from_bool};
use super::{Step, StepObserver, TxContext};

/// State of one entry on the conditional stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CondState {
    True,
    False,
    /// Inside a branch that is not executing at all.
    Skip,
}

/// A single run of an unlocking script followed by a locking script.
pub(crate) struct Thread<'a> {
    pub(crate) dstack: ExecutionStack,
    pub(crate) astack: ExecutionStack,
    pub(crate) cfg: &'a Config,
    pub(crate) scripts: Vec<Vec<ScriptChunk>>,
    pub(crate) cond_stack: Vec<CondState>,
    /// Whether each open IF has already seen its OP_ELSE.
    pub(crate) else_stack: Vec<bool>,
    pub(crate) script_idx: usize,
    pub(crate) script_off: usize,
    /// Chunk index just past the most recent OP_CODESEPARATOR.
    pub(crate) last_code_sep: usize,
    pub(crate) num_ops: usize,
    pub(crate) flags: ScriptFlags,
    pub(crate) after_genesis: bool,
    /// Set by an OP_RETURN inside an executing branch after genesis.
    pub(crate) early_return: bool,
    pub(crate) tx_context: Option<&'a dyn TxContext>,
    pub(crate) input_idx: usize,
    observer: Option<&'a mut dyn StepObserver>,
}

impl<'a> Thread<'a> {
    pub(crate) fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        cfg: &'a Config,
        flags: ScriptFlags,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
        observer: Option<&'a mut dyn StepObserver>,
    ) -> Result<Self, InterpreterError> {
        let mut flags = flags;
        if flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            flags.add_flag(ScriptFlags::VERIFY_STRICT_ENCODING);
        }

        for (label, script) in [("unlocking", unlocking_script), ("locking", locking_script)] {
            if script.len() > cfg.max_script_size {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptTooBig,
                    format!(
                        "{} script size {} is larger than the max allowed size {}",
                        label,
                        script.len(),
                        cfg.max_script_size
                    ),
                ));
            }
        }

        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }

        if flags.has_flag(ScriptFlags::VERIFY_SIG_PUSH_ONLY) && !unlocking_script.is_push_only() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only",
            ));
        }

        let scripts = vec![unlocking_script.chunks(), locking_script.chunks()];
        for chunk in scripts.iter().flatten() {
            if chunk.is_truncated() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MalformedPush,
                    format!(
                        "opcode {} requires {} bytes, but script only has {} remaining",
                        op_label(chunk.op),
                        chunk.declared_len,
                        chunk.data.as_ref().map_or(0, Vec::len)
                    ),
                ));
            }
        }

        Ok(Thread {
            dstack: ExecutionStack::new(),
            astack: ExecutionStack::new(),
            cfg,
            scripts,
            cond_stack: Vec::new(),
            else_stack: Vec::new(),
            script_idx: 0,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            after_genesis: flags.has_flag(ScriptFlags::UTXO_AFTER_GENESIS),
            flags,
            early_return: false,
            tx_context,
            input_idx,
            observer,
        })
    }

    pub(crate) fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Whether every enclosing branch is taken and no OP_RETURN has fired.
    pub(crate) fn is_executing(&self) -> bool {
        !self.early_return && self.cond_stack.iter().all(|c| *c == CondState::True)
    }

    /// Run both scripts and evaluate the final stack.
    pub(crate) fn execute(&mut self) -> Result<(), InterpreterError> {
        while self.script_idx < self.scripts.len() {
            if self.script_off >= self.scripts[self.script_idx].len() {
                self.finish_script(false)?;
                continue;
            }
            self.step()?;
        }
        self.check_error_condition()
    }

    fn step(&mut self) -> Result<(), InterpreterError> {
        let chunk = self.scripts[self.script_idx][self.script_off].clone();
        let executed = self.is_executing();

        if let Some(observer) = self.observer.as_mut() {
            observer.on_step(&Step {
                script_index: self.script_idx,
                offset: self.script_off,
                opcode: chunk.op,
                executed,
                stack: &self.dstack,
            });
        }

        if let Err(e) = self.execute_opcode(&chunk, executed) {
            if e.code == InterpreterErrorCode::Ok {
                tracing::trace!(script = self.script_idx, offset = self.script_off, "early return");
                return self.finish_script(true);
            }
            return Err(e);
        }
        self.script_off += 1;

        let combined = self.dstack.len() + self.astack.len();
        if combined > self.cfg.max_stack_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, self.cfg.max_stack_size
                ),
            ));
        }
        Ok(())
    }

    /// Move on to the next script. The alt stack does not carry over.
    fn finish_script(&mut self, early: bool) -> Result<(), InterpreterError> {
        if !early && !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }
        self.cond_stack.clear();
        self.else_stack.clear();
        self.astack = ExecutionStack::new();
        self.script_idx += 1;
        self.script_off = 0;
        self.last_code_sep = 0;
        self.num_ops = 0;
        self.early_return = false;
        Ok(())
    }

    fn check_error_condition(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution",
            ));
        }
        if self.has_flag(ScriptFlags::VERIFY_CLEAN_STACK) && self.dstack.len() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.len() - 1),
            ));
        }
        if !self.pop_bool()? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, chunk: &ScriptChunk, exec: bool) -> Result<(), InterpreterError> {
        if let Some(ref data) = chunk.data {
            if data.len() > self.cfg.max_script_element_size {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ElementTooBig,
                    format!(
                        "element size {} exceeds max allowed size {}",
                        data.len(),
                        self.cfg.max_script_element_size
                    ),
                ));
            }
        }

        let op = chunk.op;
        if (op == OP_2MUL || op == OP_2DIV) && (!self.after_genesis || exec) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", op_label(op)),
            ));
        }
        if (op == OP_VERIF || op == OP_VERNOTIF) && !self.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", op_label(op)),
            ));
        }

        if op > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops),
                ));
            }
        }

        if !exec && !matches!(op, OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF) {
            return Ok(());
        }
        self.dispatch_opcode(chunk)
    }

    fn dispatch_opcode(&mut self, chunk: &ScriptChunk) -> Result<(), InterpreterError> {
        if let Some(ref data) = chunk.data {
            self.push(data.clone());
            return Ok(());
        }

        match chunk.op {
            OP_1NEGATE => {
                self.push_num(&BigInt::from(-1));
                Ok(())
            }
            op if (OP_1..=OP_16).contains(&op) => {
                self.push(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_IF => self.op_if(false),
            OP_NOTIF => self.op_if(true),
            OP_ELSE => self.op_else(),
            OP_ENDIF => self.op_endif(),
            OP_VERIFY => self.verify_top(InterpreterErrorCode::Verify, "OP_VERIFY"),
            OP_RETURN => self.op_return(),

            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.op_drop_n(2),
            OP_2DUP => self.op_dup_n(2),
            OP_3DUP => self.op_dup_n(3),
            OP_2OVER => self.op_2over(),
            OP_2ROT => self.op_2rot(),
            OP_2SWAP => self.op_2swap(),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                self.push_num(&BigInt::from(self.dstack.len()));
                Ok(())
            }
            OP_DROP => self.op_drop_n(1),
            OP_DUP => self.op_dup_n(1),
            OP_NIP => self.remove_at(1).map(|_| ()),
            OP_OVER => self.op_over(),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.op_rot(),
            OP_SWAP => self.op_swap(),
            OP_TUCK => self.op_tuck(),

            OP_CAT => self.op_cat(),
            OP_SPLIT => self.op_split(),
            OP_NUM2BIN => self.op_num2bin(),
            OP_BIN2NUM => self.op_bin2num(),
            OP_SIZE => self.op_size(),

            OP_INVERT => self.op_invert(),
            OP_AND => self.op_bitwise(|a, b| a & b),
            OP_OR => self.op_bitwise(|a, b| a | b),
            OP_XOR => self.op_bitwise(|a, b| a ^ b),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => {
                self.op_equal()?;
                self.verify_top(InterpreterErrorCode::EqualVerify, "OP_EQUALVERIFY")
            }

            OP_1ADD => self.op_unary_num(|n| n + 1i32),
            OP_1SUB => self.op_unary_num(|n| n - 1i32),
            OP_NEGATE => self.op_unary_num(|n| -n),
            OP_ABS => self.op_unary_num(|n| n.abs()),
            OP_NOT => self.op_unary_bool(|n| n.is_zero()),
            OP_0NOTEQUAL => self.op_unary_bool(|n| !n.is_zero()),
            OP_ADD => self.op_binary_num(|a, b| Ok(a + b)),
            OP_SUB => self.op_binary_num(|a, b| Ok(a - b)),
            OP_MUL => self.op_binary_num(|a, b| Ok(a * b)),
            OP_DIV => self.op_div(),
            OP_MOD => self.op_mod(),
            OP_LSHIFT => self.op_shift(true),
            OP_RSHIFT => self.op_shift(false),
            OP_BOOLAND => self.op_binary_bool(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_binary_bool(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_binary_bool(|a, b| a == b),
            OP_NUMEQUALVERIFY => {
                self.op_binary_bool(|a, b| a == b)?;
                self.verify_top(InterpreterErrorCode::NumEqualVerify, "OP_NUMEQUALVERIFY")
            }
            OP_NUMNOTEQUAL => self.op_binary_bool(|a, b| a != b),
            OP_LESSTHAN => self.op_binary_bool(|a, b| a < b),
            OP_GREATERTHAN => self.op_binary_bool(|a, b| a > b),
            OP_LESSTHANOREQUAL => self.op_binary_bool(|a, b| a <= b),
            OP_GREATERTHANOREQUAL => self.op_binary_bool(|a, b| a >= b),
            OP_MIN => self.op_binary_num(|a, b| Ok(a.min(b))),
            OP_MAX => self.op_binary_num(|a, b| Ok(a.max(b))),
            OP_WITHIN => self.op_within(),

            OP_RIPEMD160 => self.op_hash(HashKind::Ripemd160),
            OP_SHA1 => self.op_hash(HashKind::Sha1),
            OP_SHA256 => self.op_hash(HashKind::Sha256),
            OP_HASH160 => self.op_hash(HashKind::Hash160),
            OP_HASH256 => self.op_hash(HashKind::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => {
                self.op_checksig()?;
                self.verify_top(InterpreterErrorCode::CheckSigVerify, "OP_CHECKSIGVERIFY")
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => Err(InterpreterError::new(
                InterpreterErrorCode::UnsupportedOpcode,
                format!("{} is not supported", op_label(chunk.op)),
            )),

            OP_NOP1..=OP_NOP10 => self.op_upgradable_nop(chunk.op),

            OP_RESERVED | OP_VER | OP_VERIF | OP_VERNOTIF | OP_RESERVED1 | OP_RESERVED2 => {
                Err(InterpreterError::new(
                    InterpreterErrorCode::ReservedOpcode,
                    format!("attempt to execute reserved opcode {}", op_label(chunk.op)),
                ))
            }

            op => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute invalid opcode {}", op_label(op)),
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Stack helpers
    // -----------------------------------------------------------------------

    pub(crate) fn push(&mut self, value: Vec<u8>) {
        self.dstack.push(value, None);
    }

    pub(crate) fn push_num(&mut self, n: &BigInt) {
        self.push(encode_num(n));
    }

    pub(crate) fn push_bool(&mut self, v: bool) {
        self.push(from_bool(v));
    }

    pub(crate) fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        let depth = self.dstack.len();
        self.dstack.pop().ok_or_else(|| invalid_index(0, depth))
    }

    pub(crate) fn pop_num(&mut self) -> Result<BigInt, InterpreterError> {
        let bytes = self.pop()?;
        decode_num(&bytes, self.cfg.max_script_number_length)
    }

    pub(crate) fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    /// Slot `n` from the top (0 is the top) with its name.
    pub(crate) fn peek(&self, n: usize) -> Result<(Vec<u8>, String), InterpreterError> {
        let depth = self.dstack.len();
        if n >= depth {
            return Err(invalid_index(n, depth));
        }
        let offset = -(n as isize) - 1;
        match (self.dstack.stack_top(offset), self.dstack.var_top(offset)) {
            (Some(value), Some(name)) => Ok((value.clone(), name.to_string())),
            _ => Err(invalid_index(n, depth)),
        }
    }

    /// Remove slot `n` from the top and return it with its name.
    pub(crate) fn remove_at(&mut self, n: usize) -> Result<(Vec<u8>, String), InterpreterError> {
        let depth = self.dstack.len();
        if n >= depth {
            return Err(invalid_index(n, depth));
        }
        self.dstack
            .splice_named(depth - 1 - n, 1, Vec::new())
            .pop()
            .ok_or_else(|| invalid_index(n, depth))
    }

    /// Insert a slot so that `n` slots sit above it.
    pub(crate) fn insert_below(&mut self, n: usize, item: (Vec<u8>, String)) -> Result<(), InterpreterError> {
        let depth = self.dstack.len();
        if n > depth {
            return Err(invalid_index(n, depth));
        }
        self.dstack.splice_named(depth - n, 0, vec![item]);
        Ok(())
    }
}

pub(crate) fn invalid_index(n: usize, depth: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("index {} is invalid for stack size {}", n, depth),
    )
}

/// Mnemonic of `op`, or its hex byte when unnamed.
pub(crate) fn op_label(op: u8) -> String {
    opcode_name(op)
        .map(str::to_string)
        .unwrap_or_else(|| format!("0x{:02x}", op))
}
