//! Process-wide configuration: store path override and stored password.
//!
//! The vault never looks this up ambiently; a `Config` is constructed by the
//! caller and passed by reference into [`crate::Vault::open`].

use crate::error::{Result, VaultError};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const STORE_FILE: &str = "keys.enc";
const CONFIG_FILE: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    store_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl Config {
    /// Loads the config file, or defaults if it does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path()?)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read(&path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(default_config_path()?)
    }

    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Path of the encrypted store: the override if set, else the platform
    /// data directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(path.clone()),
            None => default_store_path(),
        }
    }

    pub fn stored_password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_store_path(&mut self, path: Option<PathBuf>) {
        self.store_path = path;
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "keyhaven").ok_or_else(|| {
        VaultError::Validation("could not determine platform directories".to_string())
    })
}

pub fn default_store_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join(STORE_FILE))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}
