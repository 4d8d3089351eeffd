//! Key records and the key type classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Algorithm family of a stored key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "DSA")]
    Dsa,
    #[serde(rename = "ECDSA")]
    Ecdsa,
    Ed25519,
    Unknown,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::Rsa => "RSA",
            KeyType::Dsa => "DSA",
            KeyType::Ecdsa => "ECDSA",
            KeyType::Ed25519 => "Ed25519",
            KeyType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

// Checked in this order; first match wins.
const MARKERS: [(&str, KeyType); 4] = [
    ("ssh-rsa", KeyType::Rsa),
    ("ssh-dss", KeyType::Dsa),
    ("ecdsa-sha2", KeyType::Ecdsa),
    ("ssh-ed25519", KeyType::Ed25519),
];

/// Classifies raw key text by substring match against known markers.
///
/// Total function: any input is valid, unrecognized text is `Unknown`.
pub fn classify(material: &str) -> KeyType {
    MARKERS
        .iter()
        .find(|(marker, _)| material.contains(marker))
        .map(|(_, key_type)| *key_type)
        .unwrap_or(KeyType::Unknown)
}

/// One stored credential.
///
/// The raw key text is never validated as a real SSH key, only
/// pattern-matched into a [`KeyType`] when the record is created or imported.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(rename = "key")]
    pub material: String,
    pub key_type: KeyType,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl KeyRecord {
    /// Builds a record from a draft: fresh id, classified key type, and
    /// `created == last_modified == now`.
    pub(crate) fn create(draft: KeyDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            key_type: classify(&draft.material),
            name: draft.name,
            tag: draft.tag,
            material: draft.material,
            created: now,
            last_modified: now,
        }
    }
}

/// Input for a new record, before id, type and timestamps are assigned.
#[derive(Debug, Clone)]
pub struct KeyDraft {
    pub name: String,
    pub tag: Option<String>,
    pub material: String,
}

/// Partial update for an existing record.
///
/// `id` and `created` are immutable and have no counterpart here. The outer
/// `Option` on `tag` distinguishes "leave alone" from "set or clear".
#[derive(Debug, Clone, Default)]
pub struct KeyPatch {
    pub name: Option<String>,
    pub tag: Option<Option<String>>,
    pub material: Option<String>,
}

impl KeyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tag.is_none() && self.material.is_none()
    }
}
