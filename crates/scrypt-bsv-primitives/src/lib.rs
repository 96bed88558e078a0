/// Cryptographic primitives and byte codecs for sCrypt BSV transactions.
///
/// This crate provides the foundational building blocks:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, SHA-1)
/// - secp256k1 private keys, public keys and DER signatures
/// - The `ByteSink` writer, `ByteReader` cursor and compact-size `VarInt`
/// - Hex normalisation shared by script and transaction parsing

pub mod hash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
