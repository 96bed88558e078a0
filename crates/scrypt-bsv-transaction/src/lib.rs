/// Transactions for sCrypt contracts on BSV.
///
/// Provides transaction inputs and outputs with their wire codec, the
/// BIP143/FORKID signature hash with a reusable `HashCache`, signature
/// generation with optional low-S preimage grinding, and input
/// verification through the script interpreter.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod signature;
pub mod template;
pub mod verify;

mod error;
pub use error::TransactionError;
pub use input::{InputParams, InputScript, Preimage, TransactionInput};
pub use output::TransactionOutput;
pub use sighash::HashCache;
pub use signature::TransactionSignature;
pub use transaction::Transaction;
pub use verify::{FailedAt, VerifyResult};
