//! Interpreter limits.
//!
//! Limits are carried by value into every execution instead of living in
//! process-wide state, so concurrent verifications can use different limits.

use super::flags::ScriptFlags;

pub const MAX_OPS_BEFORE_GENESIS: usize = 500;
pub const MAX_STACK_SIZE_BEFORE_GENESIS: usize = 1000;
pub const MAX_SCRIPT_SIZE_BEFORE_GENESIS: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE_BEFORE_GENESIS: usize = 520;
pub const MAX_SCRIPT_NUMBER_LENGTH_BEFORE_GENESIS: usize = 4;

pub const MAX_SCRIPT_NUMBER_LENGTH_AFTER_GENESIS: usize = 750 * 1000;

/// Script execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum non-push operations per script.
    pub max_ops: usize,
    /// Maximum combined depth of the main and alt stacks.
    pub max_stack_size: usize,
    /// Maximum size of each of the unlocking and locking scripts.
    pub max_script_size: usize,
    /// Maximum size of a single stack element.
    pub max_script_element_size: usize,
    /// Maximum byte length of a numeric operand.
    pub max_script_number_length: usize,
}

impl Config {
    pub fn before_genesis() -> Self {
        Config {
            max_ops: MAX_OPS_BEFORE_GENESIS,
            max_stack_size: MAX_STACK_SIZE_BEFORE_GENESIS,
            max_script_size: MAX_SCRIPT_SIZE_BEFORE_GENESIS,
            max_script_element_size: MAX_SCRIPT_ELEMENT_SIZE_BEFORE_GENESIS,
            max_script_number_length: MAX_SCRIPT_NUMBER_LENGTH_BEFORE_GENESIS,
        }
    }

    pub fn after_genesis() -> Self {
        Config {
            max_ops: i32::MAX as usize,
            max_stack_size: i32::MAX as usize,
            max_script_size: i32::MAX as usize,
            max_script_element_size: i32::MAX as usize,
            max_script_number_length: MAX_SCRIPT_NUMBER_LENGTH_AFTER_GENESIS,
        }
    }

    /// Post-genesis limits with no bound on element size or number length.
    ///
    /// Used when verifying contract inputs whose scripts push large
    /// serialized state.
    pub fn unlimited() -> Self {
        Config {
            max_script_element_size: usize::MAX,
            max_script_number_length: usize::MAX,
            ..Config::after_genesis()
        }
    }

    /// Pick the genesis-appropriate limits for `flags`.
    pub fn for_flags(flags: ScriptFlags) -> Self {
        if flags.has_flag(ScriptFlags::UTXO_AFTER_GENESIS) {
            Config::after_genesis()
        } else {
            Config::before_genesis()
        }
    }

    pub fn with_max_script_element_size(mut self, size: usize) -> Self {
        self.max_script_element_size = size;
        self
    }

    pub fn with_max_script_number_length(mut self, len: usize) -> Self {
        self.max_script_number_length = len;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::after_genesis()
    }
}
