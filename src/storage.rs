//! File backend for the encrypted vault.

use crate::error::{Result, VaultError};
use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and writes the vault file.
///
/// Writes are crash-safe: data goes to a randomly named temporary file in
/// the target directory, is fsynced, and then atomically renamed over the
/// vault file. A crash leaves either the old or the new vault, never a
/// partial write.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the whole vault file.
    pub fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Atomically replaces the vault file with `data`.
    ///
    /// Creates missing parent directories. On any failure the temporary
    /// file is removed and the previous vault file is left untouched.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path()?;
        let mut tmp = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;

        let written = tmp
            .write_all(data)
            .and_then(|_| tmp.sync_all())
            .map_err(VaultError::from);
        drop(tmp);

        let replaced = written.and_then(|_| replace_file(&tmp_path, &self.path));
        if let Err(e) = replaced {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Persist the rename itself.
        if let Some(parent) = self.path.parent() {
            File::open(parent)?.sync_all()?;
        }

        debug!(path = %self.path.display(), bytes = data.len(), "vault file written");
        Ok(())
    }

    /// Unique sibling path for the temporary file, `<name>.<randomhex>.tmp`.
    fn tmp_path(&self) -> Result<PathBuf> {
        let mut entropy = [0u8; 8];
        fill(&mut entropy)
            .map_err(|_| VaultError::Io(std::io::Error::other("OS random generator unavailable")))?;

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string());

        Ok(self
            .path
            .with_file_name(format!("{name}.{}.tmp", hex::encode(entropy))))
    }
}

/// Atomic rename; `rename()` is atomic on Unix within one filesystem.
#[cfg(not(target_os = "windows"))]
fn replace_file(tmp_path: &Path, target: &Path) -> Result<()> {
    fs::rename(tmp_path, target)?;
    Ok(())
}

/// Atomic rename through `ReplaceFileW` with write-through, falling back to
/// `rename` when the target does not exist yet (ReplaceFileW requires it).
#[cfg(target_os = "windows")]
fn replace_file(tmp_path: &Path, target: &Path) -> Result<()> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

    if !target.exists() {
        fs::rename(tmp_path, target)?;
        return Ok(());
    }

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    let target_w = wide(target.as_os_str());
    let tmp_w = wide(tmp_path.as_os_str());

    // SAFETY: both strings are null-terminated UTF-16 buffers that outlive
    // the call, and Windows does not retain the pointers after it returns.
    let ok = unsafe {
        ReplaceFileW(
            target_w.as_ptr(),
            tmp_w.as_ptr(),
            std::ptr::null(),
            REPLACEFILE_WRITE_THROUGH,
            std::ptr::null(),
            std::ptr::null(),
        )
    };

    if ok == 0 {
        return Err(VaultError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}
