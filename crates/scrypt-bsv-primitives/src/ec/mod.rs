/// Elliptic curve cryptography on secp256k1.
///
/// Provides private keys, public keys and ECDSA signatures used to sign
/// transaction inputs.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
