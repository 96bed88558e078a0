//! Script verification flags (bitmask).

use std::ops::{BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Fail on OP_NOP1 and OP_NOP4..=OP_NOP10 instead of ignoring them.
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 2);
    /// Require exactly one item left on the stack.
    pub const VERIFY_CLEAN_STACK: ScriptFlags = ScriptFlags(1 << 5);
    pub const VERIFY_DER_SIGNATURES: ScriptFlags = ScriptFlags(1 << 6);
    pub const VERIFY_LOW_S: ScriptFlags = ScriptFlags(1 << 7);
    /// A failed signature check must have consumed an empty signature.
    pub const VERIFY_NULL_FAIL: ScriptFlags = ScriptFlags(1 << 9);
    pub const VERIFY_SIG_PUSH_ONLY: ScriptFlags = ScriptFlags(1 << 10);
    /// Implies `VERIFY_STRICT_ENCODING` once execution starts.
    pub const ENABLE_SIGHASH_FORKID: ScriptFlags = ScriptFlags(1 << 11);
    pub const VERIFY_STRICT_ENCODING: ScriptFlags = ScriptFlags(1 << 12);
    /// The spent output was created after the Genesis upgrade: relaxed
    /// limits, OP_RETURN ends execution successfully at top level.
    pub const UTXO_AFTER_GENESIS: ScriptFlags = ScriptFlags(1 << 14);
    /// OP_IF/OP_NOTIF operands must be empty or exactly `0x01`.
    pub const VERIFY_MINIMAL_IF: ScriptFlags = ScriptFlags(1 << 15);

    /// Whether every bit of `flag` is set.
    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }
}

/// Flags used when verifying a signed input.
pub const DEFAULT_VERIFY_FLAGS: ScriptFlags = ScriptFlags(
    ScriptFlags::ENABLE_SIGHASH_FORKID.0
        | ScriptFlags::VERIFY_STRICT_ENCODING.0
        | ScriptFlags::VERIFY_DER_SIGNATURES.0
        | ScriptFlags::VERIFY_LOW_S.0
        | ScriptFlags::VERIFY_NULL_FAIL.0
        | ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS.0
        | ScriptFlags::UTXO_AFTER_GENESIS.0,
);

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
