//! Utility types for binary serialization.
//!
//! Provides the compact-size `VarInt`, the growable `ByteSink` writer, the
//! `ByteReader` cursor and hex normalisation used by script and
//! transaction parsing.

use num_bigint::BigUint;

use crate::PrimitivesError;

/// Largest integer a compact-size value may decode to (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// A Bitcoin protocol variable-length integer.
///
/// VarInt is used in transaction data to indicate the number of upcoming fields
/// or the length of an upcoming field. The encoding uses 1, 3, 5, or 9 bytes
/// depending on the magnitude of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the start of a byte slice.
    ///
    /// # Arguments
    /// * `data` - Byte slice starting with a VarInt encoding.
    ///
    /// # Returns
    /// A tuple of `(VarInt, bytes_consumed)`, or `UnexpectedEof` if the
    /// slice ends inside the encoding.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut reader = ByteReader::new(data);
        let value = reader.read_varint()?;
        Ok((value, reader.position()))
    }

    /// Return the wire-format byte length of this VarInt.
    ///
    /// # Returns
    /// 1, 3, 5, or 9 depending on the value.
    pub fn length(&self) -> usize {
        if self.0 < 0xfd {
            1
        } else if self.0 <= 0xffff {
            3
        } else if self.0 <= 0xffff_ffff {
            5
        } else {
            9
        }
    }

    /// Encode the VarInt into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.length()];
        self.put_bytes(&mut buf);
        buf
    }

    /// Write the VarInt into a destination buffer.
    ///
    /// The buffer must be at least `self.length()` bytes long.
    ///
    /// # Returns
    /// The number of bytes written.
    pub fn put_bytes(&self, dst: &mut [u8]) -> usize {
        let v = self.0;
        if v < 0xfd {
            dst[0] = v as u8;
            1
        } else if v <= 0xffff {
            dst[0] = 0xfd;
            dst[1..3].copy_from_slice(&(v as u16).to_le_bytes());
            3
        } else if v <= 0xffff_ffff {
            dst[0] = 0xfe;
            dst[1..5].copy_from_slice(&(v as u32).to_le_bytes());
            5
        } else {
            dst[0] = 0xff;
            dst[1..9].copy_from_slice(&v.to_le_bytes());
            9
        }
    }

    /// Return the underlying u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

/// Encode `n` as a compact-size integer.
///
/// # Arguments
/// * `n` - The value to encode.
///
/// # Returns
/// The 1, 3, 5 or 9 byte encoding.
pub fn varint_buf_num(n: u64) -> Vec<u8> {
    VarInt(n).to_bytes()
}

// ---------------------------------------------------------------------------
// Hex
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes.
///
/// An optional `0x`/`0X` prefix is stripped and odd-length input is
/// left-padded with a zero nibble, so `"0xabc"` decodes to `[0x0a, 0xbc]`.
///
/// # Arguments
/// * `s` - The hex text.
///
/// # Returns
/// The decoded bytes, or `InvalidHex` if any character is not a hex digit.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(PrimitivesError::InvalidHex(format!(
            "invalid character {:?} in {:?}",
            bad, s
        )));
    }
    if digits.len() % 2 == 1 {
        let padded = format!("0{}", digits);
        return Ok(hex::decode(padded)?);
    }
    Ok(hex::decode(digits)?)
}

// ---------------------------------------------------------------------------
// ByteSink
// ---------------------------------------------------------------------------

/// An append-only, growable byte buffer with typed integer writers.
///
/// The backing storage may be larger than the logical length; when a write
/// does not fit, the storage grows to twice the required length. Only the
/// logical prefix is ever returned to callers.
#[derive(Debug, Clone)]
pub struct ByteSink {
    buf: Vec<u8>,
    len: usize,
}

impl ByteSink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        ByteSink { buf: Vec::new(), len: 0 }
    }

    /// Create a new sink with `capacity` bytes of backing storage.
    pub fn with_capacity(capacity: usize) -> Self {
        ByteSink {
            buf: vec![0u8; capacity],
            len: 0,
        }
    }

    /// Create a sink over an existing buffer whose first `len` bytes are
    /// already written.
    ///
    /// # Arguments
    /// * `buf` - Backing storage; bytes past `len` are treated as spare capacity.
    /// * `len` - Logical length of the data already in `buf`.
    ///
    /// # Returns
    /// The sink, or `ValueOutOfRange` if `len` exceeds the buffer size.
    pub fn from_parts(buf: Vec<u8>, len: usize) -> Result<Self, PrimitivesError> {
        if len > buf.len() {
            return Err(PrimitivesError::ValueOutOfRange(format!(
                "length {} exceeds buffer size {}",
                len,
                buf.len()
            )));
        }
        Ok(ByteSink { buf, len })
    }

    fn ensure(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed > self.buf.len() {
            self.buf.resize(needed * 2, 0);
        }
    }

    /// Append raw bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// Append a byte-reversed copy of `bytes`.
    ///
    /// The caller's slice is left untouched.
    pub fn write_reverse(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        for (dst, src) in self.buf[self.len..self.len + bytes.len()]
            .iter_mut()
            .zip(bytes.iter().rev())
        {
            *dst = *src;
        }
        self.len += bytes.len();
    }

    pub fn write_u8(&mut self, val: u8) {
        self.write(&[val]);
    }

    pub fn write_u16_be(&mut self, val: u16) {
        self.write(&val.to_be_bytes());
    }

    pub fn write_u16_le(&mut self, val: u16) {
        self.write(&val.to_le_bytes());
    }

    pub fn write_u32_be(&mut self, val: u32) {
        self.write(&val.to_be_bytes());
    }

    pub fn write_u32_le(&mut self, val: u32) {
        self.write(&val.to_le_bytes());
    }

    pub fn write_i32_le(&mut self, val: i32) {
        self.write(&val.to_le_bytes());
    }

    pub fn write_u64_be(&mut self, val: u64) {
        self.write(&val.to_be_bytes());
    }

    pub fn write_u64_le(&mut self, val: u64) {
        self.write(&val.to_le_bytes());
    }

    /// Append a big integer as 8 big-endian bytes.
    ///
    /// # Returns
    /// `ValueOutOfRange` if the value needs more than 64 bits.
    pub fn write_u64_be_bn(&mut self, val: &BigUint) -> Result<(), PrimitivesError> {
        let v = biguint_to_u64(val)?;
        self.write_u64_be(v);
        Ok(())
    }

    /// Append a big integer as 8 little-endian bytes.
    ///
    /// # Returns
    /// `ValueOutOfRange` if the value needs more than 64 bits.
    pub fn write_u64_le_bn(&mut self, val: &BigUint) -> Result<(), PrimitivesError> {
        let v = biguint_to_u64(val)?;
        self.write_u64_le(v);
        Ok(())
    }

    /// Append a compact-size integer.
    pub fn write_varint(&mut self, varint: VarInt) {
        let mut tmp = [0u8; 9];
        let n = varint.put_bytes(&mut tmp);
        self.write(&tmp[..n]);
    }

    /// Logical length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing storage; always at least `len()`.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copy out exactly the written bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Consume the sink and return the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.len);
        self.buf
    }
}

impl Default for ByteSink {
    fn default() -> Self {
        Self::new()
    }
}

fn biguint_to_u64(val: &BigUint) -> Result<u64, PrimitivesError> {
    let digits = val.to_u64_digits();
    match digits.len() {
        0 => Ok(0),
        1 => Ok(digits[0]),
        _ => Err(PrimitivesError::ValueOutOfRange(format!(
            "{} does not fit in 64 bits",
            val
        ))),
    }
}

// ---------------------------------------------------------------------------
// ByteReader
// ---------------------------------------------------------------------------

/// A cursor-based reader for Bitcoin protocol binary data.
///
/// Wraps a byte slice and maintains a read position, providing methods
/// to read fixed-size integers and VarInt values in little-endian order.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance the position.
    ///
    /// # Arguments
    /// * `n` - Number of bytes to read.
    ///
    /// # Returns
    /// A byte slice of length `n`, or an error if insufficient data remains.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read `n` bytes and return them in reversed order.
    pub fn read_reverse(&mut self, n: usize) -> Result<Vec<u8>, PrimitivesError> {
        let mut bytes = self.read_bytes(n)?.to_vec();
        bytes.reverse();
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, PrimitivesError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a VarInt and advance the position accordingly.
    ///
    /// # Returns
    /// The decoded `VarInt` over the full u64 range, or an error if
    /// insufficient data.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let value = match self.read_u8()? {
            0xff => self.read_u64_le()?,
            0xfe => self.read_u32_le()? as u64,
            0xfd => self.read_u16_le()? as u64,
            b => b as u64,
        };
        Ok(VarInt(value))
    }

    /// Read a VarInt that must fit in the 53-bit safe-integer range.
    ///
    /// # Returns
    /// The value, or `VarIntTooLarge` if it exceeds `MAX_SAFE_INTEGER`.
    pub fn read_varint_num(&mut self) -> Result<u64, PrimitivesError> {
        let value = self.read_varint()?.value();
        if value > MAX_SAFE_INTEGER {
            return Err(PrimitivesError::VarIntTooLarge(value));
        }
        Ok(value)
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_finished(&self) -> bool {
        self.pos >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- VarInt boundaries --

    #[test]
    fn test_varint_boundary_table() {
        let cases: Vec<(u64, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (0xfc, vec![0xfc]),
            (0xfd, vec![0xfd, 0xfd, 0x00]),
            (0xffff, vec![0xfd, 0xff, 0xff]),
            (0x10000, vec![0xfe, 0x00, 0x00, 0x01, 0x00]),
            (0xffff_ffff, vec![0xfe, 0xff, 0xff, 0xff, 0xff]),
            (
                0x1_0000_0000,
                vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
        ];
        for (value, expected) in cases {
            assert_eq!(varint_buf_num(value), expected, "encode {:#x}", value);
            let mut reader = ByteReader::new(&expected);
            assert_eq!(reader.read_varint_num().expect("decode"), value);
            assert!(reader.is_finished());
        }
    }

    #[test]
    fn test_varint_from_bytes_reports_size() {
        let (vi, sz) = VarInt::from_bytes(&[0xfe, 0, 0, 1, 0, 0xaa]).expect("decode");
        assert_eq!(vi.value(), 65536);
        assert_eq!(sz, 5);
    }

    #[test]
    fn test_varint_truncated_is_eof() {
        assert!(matches!(
            VarInt::from_bytes(&[0xfd, 0x01]),
            Err(PrimitivesError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_varint_num_rejects_above_safe_integer() {
        let bytes = varint_buf_num(MAX_SAFE_INTEGER + 1);
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_varint_num(),
            Err(PrimitivesError::VarIntTooLarge(v)) if v == MAX_SAFE_INTEGER + 1
        ));

        let bytes = varint_buf_num(MAX_SAFE_INTEGER);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_varint_num().expect("decode"), MAX_SAFE_INTEGER);
    }

    // -- ByteSink --

    #[test]
    fn test_sink_typed_writers() {
        let mut sink = ByteSink::new();
        sink.write_u8(0x01);
        sink.write_u16_be(0x0203);
        sink.write_u16_le(0x0504);
        sink.write_u32_be(0x06070809);
        sink.write_u32_le(0x0d0c0b0a);
        sink.write_i32_le(-1);
        assert_eq!(
            hex::encode(sink.as_bytes()),
            "0102030405060708090a0b0c0dffffffff"
        );
    }

    #[test]
    fn test_sink_u64_writers() {
        let mut sink = ByteSink::new();
        sink.write_u64_le(1);
        sink.write_u64_be(1);
        assert_eq!(
            hex::encode(sink.to_bytes()),
            "01000000000000000000000000000001"
        );
    }

    #[test]
    fn test_sink_big_integer_writers() {
        let mut sink = ByteSink::new();
        sink.write_u64_le_bn(&BigUint::from(0x0102u32)).expect("fits");
        sink.write_u64_be_bn(&BigUint::from(u64::MAX)).expect("fits");
        assert_eq!(
            hex::encode(sink.as_bytes()),
            "0201000000000000ffffffffffffffff"
        );

        let too_big = BigUint::from(u64::MAX) + 1u32;
        assert!(matches!(
            sink.write_u64_le_bn(&too_big),
            Err(PrimitivesError::ValueOutOfRange(_))
        ));
        assert_eq!(sink.len(), 16);
    }

    #[test]
    fn test_sink_write_reverse_leaves_input() {
        let input = vec![1u8, 2, 3, 4];
        let mut sink = ByteSink::new();
        sink.write_reverse(&input);
        assert_eq!(sink.as_bytes(), &[4, 3, 2, 1]);
        assert_eq!(input, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sink_growth_doubles_and_hides_capacity() {
        let mut sink = ByteSink::with_capacity(4);
        sink.write(&[0xaa; 3]);
        assert_eq!(sink.capacity(), 4);
        sink.write(&[0xbb; 3]);
        assert_eq!(sink.len(), 6);
        assert_eq!(sink.capacity(), 12);
        assert_eq!(sink.to_bytes().len(), 6);
        assert_eq!(sink.into_bytes(), vec![0xaa, 0xaa, 0xaa, 0xbb, 0xbb, 0xbb]);
    }

    #[test]
    fn test_sink_from_parts() {
        let mut sink = ByteSink::from_parts(vec![9, 8, 7, 0, 0], 3).expect("valid");
        sink.write_u8(6);
        assert_eq!(sink.as_bytes(), &[9, 8, 7, 6]);
        assert!(ByteSink::from_parts(vec![0; 2], 3).is_err());
    }

    #[test]
    fn test_sink_write_varint() {
        let mut sink = ByteSink::new();
        sink.write_varint(VarInt(252));
        sink.write_varint(VarInt(253));
        assert_eq!(sink.as_bytes(), &[0xfc, 0xfd, 0xfd, 0x00]);
    }

    // -- ByteReader --

    #[test]
    fn test_reader_sequence() {
        let data = [0x01, 0x02, 0x00, 0xff, 0xff, 0xff, 0xff, 0xaa, 0xbb];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().expect("u8"), 1);
        assert_eq!(reader.read_u16_le().expect("u16"), 2);
        assert_eq!(reader.read_i32_le().expect("i32"), -1);
        assert_eq!(reader.read_reverse(2).expect("rev"), vec![0xbb, 0xaa]);
        assert!(reader.is_finished());
        assert!(matches!(
            reader.read_u8(),
            Err(PrimitivesError::UnexpectedEof)
        ));
    }

    // -- Hex --

    #[test]
    fn test_decode_hex_normalisation() {
        assert_eq!(decode_hex("0xabcd").expect("prefixed"), vec![0xab, 0xcd]);
        assert_eq!(decode_hex("abc").expect("odd"), vec![0x0a, 0xbc]);
        assert_eq!(decode_hex("").expect("empty"), Vec::<u8>::new());
        assert!(matches!(
            decode_hex("zz"),
            Err(PrimitivesError::InvalidHex(_))
        ));
    }
}
