//! Splice, bitwise and equality opcodes.

use num_traits::ToPrimitive;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::minimally_encode;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let b = self.pop()?;
        let mut a = self.pop()?;
        if a.len() + b.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "concatenated size {} exceeds max allowed size {}",
                    a.len() + b.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }
        a.extend_from_slice(&b);
        self.push(a);
        Ok(())
    }

    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_num()?;
        let mut data = self.pop()?;
        let at = n.to_usize().filter(|&i| i <= data.len()).ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidSplitRange,
                format!("split position {} is outside 0..={}", n, data.len()),
            )
        })?;
        let right = data.split_off(at);
        self.push(data);
        self.push(right);
        Ok(())
    }

    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let size = self.pop_num()?;
        let size = size.to_usize().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!("num2bin size {} is out of range", size),
            )
        })?;
        if size > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "num2bin size {} exceeds max allowed size {}",
                    size, self.cfg.max_script_element_size
                ),
            ));
        }

        let mut num = minimally_encode(&self.pop()?);
        if num.len() > size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ImpossibleEncoding,
                format!("cannot fit {} byte number into {} bytes", num.len(), size),
            ));
        }
        if num.len() < size {
            let mut sign = 0x00;
            if let Some(last) = num.last_mut() {
                sign = *last & 0x80;
                *last &= 0x7f;
            }
            num.resize(size - 1, 0x00);
            num.push(sign);
        }
        self.push(num);
        Ok(())
    }

    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let num = minimally_encode(&self.pop()?);
        if num.len() > self.cfg.max_script_number_length {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "bin2num result of {} bytes exceeds max number length {}",
                    num.len(),
                    self.cfg.max_script_number_length
                ),
            ));
        }
        self.push(num);
        Ok(())
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let (top, _) = self.peek(0)?;
        self.push_num(&top.len().into());
        Ok(())
    }

    pub(crate) fn op_invert(&mut self) -> Result<(), InterpreterError> {
        let value = self.pop()?;
        self.push(value.iter().map(|b| !b).collect());
        Ok(())
    }

    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let b = self.pop()?;
        let a = self.pop()?;
        if a.len() != b.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidOperandSize,
                format!("operands have different sizes {} and {}", a.len(), b.len()),
            ));
        }
        self.push(a.iter().zip(&b).map(|(x, y)| f(*x, *y)).collect());
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push_bool(a == b);
        Ok(())
    }

    /// OP_LSHIFT / OP_RSHIFT: shift the whole element as a big-endian bit
    /// string, keeping its length.
    pub(crate) fn op_shift(&mut self, left: bool) -> Result<(), InterpreterError> {
        let n = self.pop_num()?;
        let bits = n.to_usize().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidNumberRange,
                format!("shift count {} is out of range", n),
            )
        })?;
        let data = self.pop()?;
        let shifted = if left {
            shift_left(&data, bits)
        } else {
            shift_right(&data, bits)
        };
        self.push(shifted);
        Ok(())
    }
}

fn shift_left(data: &[u8], bits: usize) -> Vec<u8> {
    let len = data.len();
    let byte_shift = bits / 8;
    let bit_shift = (bits % 8) as u32;
    let mut out = vec![0u8; len];
    for (i, slot) in out.iter_mut().enumerate() {
        let Some(src) = i.checked_add(byte_shift).filter(|&s| s < len) else {
            break;
        };
        *slot = data[src] << bit_shift;
        if bit_shift > 0 && src + 1 < len {
            *slot |= data[src + 1] >> (8 - bit_shift);
        }
    }
    out
}

fn shift_right(data: &[u8], bits: usize) -> Vec<u8> {
    let len = data.len();
    let byte_shift = bits / 8;
    let bit_shift = (bits % 8) as u32;
    let mut out = vec![0u8; len];
    for (i, slot) in out.iter_mut().enumerate().skip(byte_shift) {
        let src = i - byte_shift;
        *slot = data[src] >> bit_shift;
        if bit_shift > 0 && src > 0 {
            *slot |= data[src - 1] << (8 - bit_shift);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_left() {
        assert_eq!(shift_left(&[0x01, 0x80], 1), vec![0x03, 0x00]);
        assert_eq!(shift_left(&[0x12, 0x34], 8), vec![0x34, 0x00]);
        assert_eq!(shift_left(&[0xff], 9), vec![0x00]);
    }

    #[test]
    fn test_shift_right() {
        assert_eq!(shift_right(&[0x01, 0x80], 1), vec![0x00, 0xc0]);
        assert_eq!(shift_right(&[0x12, 0x34], 4), vec![0x01, 0x23]);
        assert_eq!(shift_right(&[0xff, 0xff], 16), vec![0x00, 0x00]);
    }
}
