//! Export documents and import payload parsing.
//!
//! Exports are JSON `{exported_at, total_keys, keys}` documents, optionally
//! sealed in an envelope under a one-off password that has nothing to do
//! with the vault's own active key. Imports accept either that document
//! shape or a single bare record object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{Envelope, kdf};
use crate::error::{Result, VaultError};
use crate::record::{KeyDraft, KeyRecord};

/// Immutable snapshot produced by an export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub total_keys: usize,
    pub keys: Vec<KeyRecord>,
}

impl ExportDocument {
    pub fn new(keys: Vec<KeyRecord>) -> Self {
        Self {
            exported_at: Utc::now(),
            total_keys: keys.len(),
            keys,
        }
    }

    /// Renders the document for writing to a file.
    ///
    /// With a password the JSON is sealed in an envelope; without one it is
    /// written as plain pretty-printed JSON.
    pub fn render(&self, password: Option<&str>) -> Result<String> {
        let json = Zeroizing::new(serde_json::to_vec_pretty(self)?);
        match password {
            Some(password) => {
                let key = kdf::derive_from_password(password);
                Ok(Envelope::seal(&key, &json)?.encode())
            }
            None => Ok(String::from_utf8_lossy(&json).into_owned()),
        }
    }
}

/// One incoming record before the merge assigns fresh ids and timestamps.
///
/// Deserializes from KeyRecord-shaped objects; id, key_type and timestamps
/// on the incoming data are ignored.
#[derive(Deserialize, Debug, Clone)]
pub struct ImportCandidate {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(rename = "key")]
    pub material: String,
}

impl From<ImportCandidate> for KeyDraft {
    fn from(candidate: ImportCandidate) -> Self {
        KeyDraft {
            name: candidate.name,
            tag: candidate.tag,
            material: candidate.material,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Document { keys: Vec<ImportCandidate> },
    Single(ImportCandidate),
}

/// Parses import input into candidates.
///
/// With a password the input must be an envelope, decrypted with the one-off
/// password before parsing. A JSON parse failure after decryption is treated
/// as a wrong-password condition.
pub fn parse_import(text: &str, password: Option<&str>) -> Result<Vec<KeyDraft>> {
    let payload: ImportPayload = match password {
        Some(password) => {
            let key = kdf::derive_from_password(password);
            let plaintext = Envelope::decode(text.trim())?.open(&key)?;
            serde_json::from_slice(&plaintext).map_err(|_| VaultError::wrong_key())?
        }
        None => serde_json::from_str(text).map_err(|e| {
            VaultError::Validation(format!("unrecognized import format: {e}"))
        })?,
    };

    let candidates = match payload {
        ImportPayload::Document { keys } => keys,
        ImportPayload::Single(candidate) => vec![candidate],
    };

    Ok(candidates.into_iter().map(KeyDraft::from).collect())
}
