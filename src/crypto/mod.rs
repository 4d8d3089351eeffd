//! Cryptographic primitives for the vault.
//!
//! Provides key derivation and the text envelope used for the vault file.

pub mod envelope;
pub mod kdf;

pub use envelope::Envelope;
pub use kdf::machine_identity;

/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the nonce (24 bytes for XChaCha20-Poly1305).
pub const NONCE_LEN: usize = 24;
