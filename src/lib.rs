mod config;
mod crypto;
mod error;
mod record;
mod scan;
mod storage;
mod store;
mod transfer;

pub use crate::config::{Config, default_config_path, default_store_path};
pub use crate::crypto::{kdf, machine_identity};
pub use crate::error::{Result, VaultError};
pub use crate::record::{KeyDraft, KeyPatch, KeyRecord, KeyType, classify};
pub use crate::scan::{ScanHit, scan_default_dirs, scan_dir};
pub use crate::storage::Storage;
pub use crate::store::{Collection, DuplicateRule, ImportOutcome};
pub use crate::transfer::{ExportDocument, parse_import};

use crate::crypto::{Envelope, KEY_LEN};
use std::path::Path;
use tracing::debug;
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

/// The encrypted record store.
///
/// Owns the vault file, the active encryption key and a read-through cache
/// of the decrypted collection. Every mutating operation loads the cached
/// collection, applies the change to a copy and saves; the cache is replaced
/// only after the save succeeded, so a failed operation never leaves memory
/// and disk out of sync.
///
/// The cache is process-local and unsynchronized. Two processes pointed at
/// the same vault file can race, and the last writer wins; there is no
/// cross-process locking.
pub struct Vault {
    storage: Storage,
    key: [u8; KEY_LEN],
    cache: Option<Collection>,
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl Vault {
    /// Opens the vault described by `config`. No I/O happens until the
    /// first load or save.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::new(config.store_path()?);
        Ok(Self::with_storage(storage, config.stored_password()))
    }

    /// Opens a vault on an explicit storage backend.
    ///
    /// The active key is the password-derived key when a password is given,
    /// the machine-identity key otherwise.
    pub fn with_storage(storage: Storage, password: Option<&str>) -> Self {
        Self {
            storage,
            key: active_key(password),
            cache: None,
        }
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Returns the collection, reading and decrypting the vault file on the
    /// first call only. A missing file is an empty vault, not an error.
    ///
    /// Decryption and parse failures surface as [`VaultError::Decryption`];
    /// the caller decides whether to re-prompt or abort. The cache is never
    /// populated from a failed read.
    pub fn load(&mut self) -> Result<&Collection> {
        let collection = match self.cache.take() {
            Some(cached) => cached,
            None => self.read_from_disk()?,
        };
        Ok(self.cache.insert(collection))
    }

    fn read_from_disk(&self) -> Result<Collection> {
        if !self.storage.exists() {
            debug!(path = %self.storage.path().display(), "no vault file, starting empty");
            return Ok(Collection::new());
        }

        let raw = self.storage.load()?;
        let text = String::from_utf8(raw)
            .map_err(|_| VaultError::Decryption("vault file is not envelope text".to_string()))?;
        let plaintext = Envelope::decode(text.trim())?.open(&self.key)?;

        // The cipher authenticates, so a parse failure here means the
        // plaintext shape is wrong, which we still report as a key problem
        // rather than pretending the vault is empty.
        let collection = serde_json::from_slice(&plaintext).map_err(|_| VaultError::wrong_key())?;
        debug!(path = %self.storage.path().display(), "vault loaded");
        Ok(collection)
    }

    /// Serializes, encrypts and atomically writes `collection`, then makes
    /// it the cache. The whole collection is written; there is no partial
    /// or merging save.
    pub fn save(&mut self, collection: Collection) -> Result<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(&collection)?);
        let envelope = Envelope::seal(&self.key, &plaintext)?;
        self.storage.save(envelope.encode().as_bytes())?;
        self.cache = Some(collection);
        Ok(())
    }

    /// Adds a new record and persists the vault.
    pub fn add(&mut self, draft: KeyDraft) -> Result<KeyRecord> {
        let mut next = self.load()?.clone();
        let record = next.add(draft)?;
        self.save(next)?;
        Ok(record)
    }

    /// Applies a partial update to one record and persists the vault.
    pub fn edit(&mut self, id: Uuid, patch: KeyPatch) -> Result<KeyRecord> {
        let mut next = self.load()?.clone();
        let record = next.edit(id, patch)?;
        self.save(next)?;
        Ok(record)
    }

    /// Removes one record and persists the vault.
    pub fn remove(&mut self, id: Uuid) -> Result<()> {
        let mut next = self.load()?.clone();
        next.remove(id)?;
        self.save(next)
    }

    /// Merges import candidates under `rule` and commits the whole batch
    /// with a single save.
    pub fn import(&mut self, candidates: Vec<KeyDraft>, rule: DuplicateRule) -> Result<ImportOutcome> {
        let mut next = self.load()?.clone();
        let outcome = next.merge(candidates, rule)?;
        self.save(next)?;
        Ok(outcome)
    }

    /// Snapshots records into an export document.
    ///
    /// `ids = None` exports everything. The document owns clones; mutating
    /// the vault afterwards does not touch it.
    pub fn export(&mut self, ids: Option<&[Uuid]>) -> Result<ExportDocument> {
        let keys = self.load()?.snapshot(ids)?;
        Ok(ExportDocument::new(keys))
    }

    /// Switches the active key to a new password (or back to the machine
    /// identity) and re-encrypts the vault under it.
    pub fn rekey(&mut self, password: Option<&str>) -> Result<()> {
        let collection = self.load()?.clone();
        self.key.zeroize();
        self.key = active_key(password);
        self.save(collection)
    }
}

fn active_key(password: Option<&str>) -> [u8; KEY_LEN] {
    match password {
        Some(password) => kdf::derive_from_password(password),
        None => kdf::derive_from_machine_identity(),
    }
}
