//! Local storage helper.
//!
//! One JSON blob per string key, written atomically (temp file + rename) so a
//! crash mid-write never leaves a truncated blob behind. A missing blob is
//! not an error; callers fall back to defaults.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

/// Errors from reading or writing a storage blob.
#[derive(Debug)]
pub enum StorageError {
    /// The blob exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The blob could not be parsed, or a value could not be serialized.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The blob could not be written to disk.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read { path, source } => {
                write!(f, "failed to read storage blob {}: {}", path.display(), source)
            }
            StorageError::Json { path, source } => {
                write!(f, "invalid JSON for storage blob {}: {}", path.display(), source)
            }
            StorageError::Write { path, source } => {
                write!(f, "failed to write storage blob {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Read { source, .. } => Some(source),
            StorageError::Json { source, .. } => Some(source),
            StorageError::Write { source, .. } => Some(source),
        }
    }
}

/// Key-value JSON storage rooted in a directory.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Storage rooted in the platform data directory.
    pub fn new() -> Self {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "chatbridge")
            .expect("Failed to determine data directory");
        Self {
            root: proj_dirs.data_dir().to_path_buf(),
        }
    }

    /// Storage rooted at an explicit directory (tests, portable installs).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Read and deserialize the blob under `key`; `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|source| StorageError::Read {
            path: path.clone(),
            source,
        })?;
        let value = serde_json::from_str(&contents)
            .map_err(|source| StorageError::Json { path, source })?;
        Ok(Some(value))
    }

    /// Serialize `value` and write it atomically under `key`.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let path = self.blob_path(key);
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })?;

        let contents = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;

        let write = |path: &Path| -> std::io::Result<()> {
            let mut temp_file = NamedTempFile::new_in(&self.root)?;
            temp_file.write_all(contents.as_bytes())?;
            temp_file.as_file_mut().sync_all()?;
            temp_file.persist(path).map_err(|err| err.error)?;
            Ok(())
        };
        write(&path).map_err(|source| StorageError::Write { path, source })
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
