use crate::error::{Result, VaultError};
use crate::record::{KeyDraft, KeyPatch, KeyRecord, classify};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The ordered set of stored key records.
///
/// Order is insertion order; nothing sorts it. Serializes as a bare JSON
/// array, which is exactly the plaintext inside the vault envelope.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(transparent)]
pub struct Collection {
    records: Vec<KeyRecord>,
}

/// Predicate deciding whether an import candidate already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateRule {
    /// A candidate is a duplicate if any existing record has the same
    /// material or the same name. Intentionally loose; either match
    /// suffices.
    #[default]
    NameOrMaterialEquals,
}

impl DuplicateRule {
    fn matches(&self, existing: &KeyRecord, name: &str, material: &str) -> bool {
        match self {
            DuplicateRule::NameOrMaterialEquals => {
                existing.material == material || existing.name == name
            }
        }
    }
}

/// Result of one import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub imported: usize,
    pub duplicates: usize,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: Uuid) -> Option<&KeyRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&KeyRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Appends a new record built from `draft`.
    pub fn add(&mut self, draft: KeyDraft) -> Result<KeyRecord> {
        validate_fields(Some(&draft.name), Some(&draft.material))?;

        let record = KeyRecord::create(draft);
        self.records.push(record.clone());
        Ok(record)
    }

    /// Applies a partial update to the record with `id`.
    ///
    /// Only name, tag and material can change. Editing the material
    /// re-classifies the key type so it never goes stale. The whole patch
    /// is validated before any field is applied; a rejected patch leaves
    /// the record untouched.
    pub fn edit(&mut self, id: Uuid, patch: KeyPatch) -> Result<KeyRecord> {
        validate_fields(patch.name.as_deref(), patch.material.as_deref())?;

        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(VaultError::NotFound(id))?;

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(tag) = patch.tag {
            record.tag = tag;
        }
        if let Some(material) = patch.material {
            record.key_type = classify(&material);
            record.material = material;
        }
        record.last_modified = Utc::now();

        Ok(record.clone())
    }

    pub fn remove(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(VaultError::NotFound(id))?;
        self.records.remove(index);
        Ok(())
    }

    /// Merges import candidates, suppressing duplicates under `rule`.
    ///
    /// Candidates obey the same name/material validation as [`Self::add`];
    /// one invalid candidate rejects the whole batch before anything is
    /// appended. Non-duplicates get fresh ids and timestamps and are
    /// appended in order. Later candidates are also checked against records
    /// appended earlier in the same batch, so importing the same batch
    /// twice counts every key as a duplicate the second time.
    pub fn merge(&mut self, candidates: Vec<KeyDraft>, rule: DuplicateRule) -> Result<ImportOutcome> {
        for candidate in &candidates {
            validate_fields(Some(&candidate.name), Some(&candidate.material))?;
        }

        let mut outcome = ImportOutcome {
            imported: 0,
            duplicates: 0,
        };

        for candidate in candidates {
            let duplicate = self
                .records
                .iter()
                .any(|existing| rule.matches(existing, &candidate.name, &candidate.material));
            if duplicate {
                outcome.duplicates += 1;
                continue;
            }
            self.records.push(KeyRecord::create(candidate));
            outcome.imported += 1;
        }

        Ok(outcome)
    }

    /// Clones the requested records, preserving collection order.
    ///
    /// Fails before cloning anything if any requested id is absent.
    pub fn snapshot(&self, ids: Option<&[Uuid]>) -> Result<Vec<KeyRecord>> {
        match ids {
            None => Ok(self.records.clone()),
            Some(ids) => {
                for id in ids {
                    if self.get(*id).is_none() {
                        return Err(VaultError::NotFound(*id));
                    }
                }
                Ok(self
                    .records
                    .iter()
                    .filter(|r| ids.contains(&r.id))
                    .cloned()
                    .collect())
            }
        }
    }
}

fn validate_fields(name: Option<&str>, material: Option<&str>) -> Result<()> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(VaultError::Validation("key name cannot be empty".to_string()));
    }
    if material.is_some_and(|m| m.trim().is_empty()) {
        return Err(VaultError::Validation(
            "key material cannot be empty".to_string(),
        ));
    }
    Ok(())
}
