//! The text envelope written to disk.
//!
//! An envelope is the delimited two-field string
//! `hex(nonce) + ":" + hex(ciphertext)`. The nonce is freshly random for
//! every seal and never reused. The cipher is XChaCha20-Poly1305, so a wrong
//! key fails the authentication tag instead of producing garbage plaintext.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN};
use crate::error::{Result, VaultError};

#[derive(Debug, Clone)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypts `plaintext` under `key` with a fresh random nonce.
    pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Self> {
        let mut nonce = [0u8; NONCE_LEN];
        fill(&mut nonce)
            .map_err(|_| VaultError::Io(std::io::Error::other("OS random generator unavailable")))?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| VaultError::Io(std::io::Error::other("encryption failed")))?;

        Ok(Self { nonce, ciphertext })
    }

    /// Decrypts the envelope, failing if the key is wrong or the ciphertext
    /// was tampered with.
    pub fn open(&self, key: &[u8; KEY_LEN]) -> Result<Zeroizing<Vec<u8>>> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|_| VaultError::wrong_key())?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Serializes the envelope as `hex(nonce):hex(ciphertext)`.
    pub fn encode(&self) -> String {
        format!("{}:{}", hex::encode(self.nonce), hex::encode(&self.ciphertext))
    }

    /// Parses the two-field envelope string.
    pub fn decode(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(':').collect();
        let [nonce_hex, ciphertext_hex] = fields.as_slice() else {
            return Err(VaultError::Decryption(format!(
                "envelope must have exactly 2 fields, found {}",
                fields.len()
            )));
        };

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|_| VaultError::Decryption("envelope nonce is not valid hex".to_string()))?;
        let nonce: [u8; NONCE_LEN] = nonce_bytes.as_slice().try_into().map_err(|_| {
            VaultError::Decryption(format!(
                "envelope nonce must be {NONCE_LEN} bytes, found {}",
                nonce_bytes.len()
            ))
        })?;

        let ciphertext = hex::decode(ciphertext_hex).map_err(|_| {
            VaultError::Decryption("envelope ciphertext is not valid hex".to_string())
        })?;

        Ok(Self { nonce, ciphertext })
    }
}
