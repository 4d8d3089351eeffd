//! Key derivation for the vault.
//!
//! The vault key comes from one of two inputs: a password the user stored in
//! the configuration, or an identity string describing the machine. Each
//! input is hashed together with its own fixed domain string, so a password
//! can never derive the same key as a machine identity.

use sha2::{Digest, Sha256};

use super::KEY_LEN;

const PASSWORD_DOMAIN: &str = "keyhaven/password-key/v1";
const MACHINE_DOMAIN: &str = "keyhaven/machine-key/v1";

/// Derives the vault key from a user-supplied password.
pub fn derive_from_password(password: &str) -> [u8; KEY_LEN] {
    derive(password, PASSWORD_DOMAIN)
}

/// Derives the vault key from the local machine identity.
pub fn derive_from_machine_identity() -> [u8; KEY_LEN] {
    derive(&machine_identity(), MACHINE_DOMAIN)
}

/// Identity string for the current machine: hostname, OS and architecture.
pub fn machine_identity() -> String {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    format!(
        "{host}/{}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn derive(input: &str, domain: &str) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.update(domain.as_bytes());
    hasher.finalize().into()
}
