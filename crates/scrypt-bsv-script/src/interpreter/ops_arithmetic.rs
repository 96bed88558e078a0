//! Numeric opcodes.

use num_bigint::BigInt;
use num_traits::Zero;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_num(&mut self, f: impl FnOnce(BigInt) -> BigInt) -> Result<(), InterpreterError> {
        let n = self.pop_num()?;
        self.push_num(&f(n));
        Ok(())
    }

    pub(crate) fn op_unary_bool(&mut self, f: impl FnOnce(&BigInt) -> bool) -> Result<(), InterpreterError> {
        let n = self.pop_num()?;
        self.push_bool(f(&n));
        Ok(())
    }

    /// Apply `f(a, b)` where `b` is the top item and `a` the one below it.
    pub(crate) fn op_binary_num(
        &mut self,
        f: impl FnOnce(BigInt, BigInt) -> Result<BigInt, InterpreterError>,
    ) -> Result<(), InterpreterError> {
        let b = self.pop_num()?;
        let a = self.pop_num()?;
        let result = f(a, b)?;
        self.push_num(&result);
        Ok(())
    }

    pub(crate) fn op_binary_bool(&mut self, f: impl FnOnce(&BigInt, &BigInt) -> bool) -> Result<(), InterpreterError> {
        let b = self.pop_num()?;
        let a = self.pop_num()?;
        self.push_bool(f(&a, &b));
        Ok(())
    }

    /// Truncating division.
    pub(crate) fn op_div(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_num(|a, b| {
            if b.is_zero() {
                return Err(divide_by_zero());
            }
            Ok(a / b)
        })
    }

    /// Remainder carrying the sign of the dividend.
    pub(crate) fn op_mod(&mut self) -> Result<(), InterpreterError> {
        self.op_binary_num(|a, b| {
            if b.is_zero() {
                return Err(divide_by_zero());
            }
            Ok(a % b)
        })
    }

    /// x min max -> (min <= x < max)
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max = self.pop_num()?;
        let min = self.pop_num()?;
        let x = self.pop_num()?;
        self.push_bool(min <= x && x < max);
        Ok(())
    }
}

fn divide_by_zero() -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::DivideByZero, "divide by zero")
}
