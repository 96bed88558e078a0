#![deny(missing_docs)]

//! sCrypt BSV toolkit.
//!
//! Re-exports the primitives, script and transaction crates for
//! single-crate usage.

pub use scrypt_bsv_primitives as primitives;
pub use scrypt_bsv_script as script;
pub use scrypt_bsv_transaction as transaction;
