//! Stack manipulation opcodes.
//!
//! Items keep their slot names when they move, and copies inherit the name
//! of the slot they were copied from.

use num_traits::ToPrimitive;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::as_bool;
use super::thread::{invalid_index, Thread};

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let depth = self.dstack.len();
        let (value, name) = self.dstack.pop_named().ok_or_else(|| invalid_index(0, depth))?;
        self.astack.push_named(value, name);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let (value, name) = self.astack.pop_named().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidAltStackOperation,
                "attempt to pop from an empty alt stack",
            )
        })?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    pub(crate) fn op_drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if self.dstack.len() < n {
            return Err(invalid_index(n - 1, self.dstack.len()));
        }
        for _ in 0..n {
            self.pop()?;
        }
        Ok(())
    }

    /// Duplicate the top `n` items in order.
    pub(crate) fn op_dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let mut items = Vec::with_capacity(n);
        for i in (0..n).rev() {
            items.push(self.peek(i)?);
        }
        for (value, name) in items {
            self.dstack.push_named(value, name);
        }
        Ok(())
    }

    /// x1 x2 x3 x4 -> x1 x2 x3 x4 x1 x2
    pub(crate) fn op_2over(&mut self) -> Result<(), InterpreterError> {
        let first = self.peek(3)?;
        let second = self.peek(2)?;
        self.dstack.push_named(first.0, first.1);
        self.dstack.push_named(second.0, second.1);
        Ok(())
    }

    /// x1 x2 x3 x4 x5 x6 -> x3 x4 x5 x6 x1 x2
    pub(crate) fn op_2rot(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.len() < 6 {
            return Err(invalid_index(5, self.dstack.len()));
        }
        let first = self.remove_at(5)?;
        let second = self.remove_at(4)?;
        self.dstack.push_named(first.0, first.1);
        self.dstack.push_named(second.0, second.1);
        Ok(())
    }

    /// x1 x2 x3 x4 -> x3 x4 x1 x2
    pub(crate) fn op_2swap(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.len() < 4 {
            return Err(invalid_index(3, self.dstack.len()));
        }
        let first = self.remove_at(3)?;
        let second = self.remove_at(2)?;
        self.dstack.push_named(first.0, first.1);
        self.dstack.push_named(second.0, second.1);
        Ok(())
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let (value, name) = self.peek(0)?;
        if as_bool(&value) {
            self.dstack.push_named(value, name);
        }
        Ok(())
    }

    pub(crate) fn op_over(&mut self) -> Result<(), InterpreterError> {
        let (value, name) = self.peek(1)?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        let (value, name) = self.peek(n)?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        let (value, name) = self.remove_at(n)?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    /// x1 x2 x3 -> x2 x3 x1
    pub(crate) fn op_rot(&mut self) -> Result<(), InterpreterError> {
        let (value, name) = self.remove_at(2)?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    pub(crate) fn op_swap(&mut self) -> Result<(), InterpreterError> {
        let (value, name) = self.remove_at(1)?;
        self.dstack.push_named(value, name);
        Ok(())
    }

    /// x1 x2 -> x2 x1 x2
    pub(crate) fn op_tuck(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.len() < 2 {
            return Err(invalid_index(1, self.dstack.len()));
        }
        let top = self.peek(0)?;
        self.insert_below(2, top)
    }

    fn pop_stack_index(&mut self) -> Result<usize, InterpreterError> {
        let n = self.pop_num()?;
        let depth = self.dstack.len();
        n.to_usize().filter(|&i| i < depth).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", n, depth),
            )
        })
    }
}
