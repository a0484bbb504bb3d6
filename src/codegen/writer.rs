//! Safe file writing for generated sources and persisted stores.
//!
//! Every write goes to a temp file in the target directory and is then
//! renamed over the destination, so readers never observe a half-written file.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

use super::templates::GENERATED_MARKER;
use crate::error::StoreError;

/// What happened to a target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
    /// Contents were already identical; the file was not touched.
    Unchanged,
    /// The file exists and was not written by this tool; left alone.
    Preserved,
}

impl WriteOutcome {
    pub fn changed(self) -> bool {
        matches!(self, WriteOutcome::Created | WriteOutcome::Updated)
    }
}

/// Writes generated files under a root directory.
#[derive(Debug, Clone)]
pub struct SafeCodeWriter {
    root: PathBuf,
    /// Copy the previous contents to `<file>.bak` before overwriting.
    pub create_backups: bool,
}

impl SafeCodeWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_backups: false,
        }
    }

    pub fn with_backups(mut self, create_backups: bool) -> Self {
        self.create_backups = create_backups;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to `relative` under the root, skipping the write when
    /// the file already holds identical bytes.
    pub fn write(&self, relative: &Path, content: &str) -> Result<WriteOutcome, StoreError> {
        let path = self.resolve(relative)?;

        let existed = path.exists();
        if existed {
            let current = fs::read(&path).map_err(|err| StoreError::io(&path, err))?;
            if compute_bytes_hash(&current) == compute_string_hash(content) {
                tracing::debug!(path = %path.display(), "generated file unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
            if self.create_backups {
                self.create_backup(&path)?;
            }
        }

        atomic_write(&path, content.as_bytes())?;
        tracing::debug!(path = %path.display(), "wrote generated file");
        Ok(if existed {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    /// Write a module index, but only over a file this tool generated itself.
    /// A hand-written `mod.rs` in the target directory is preserved.
    pub fn write_module_index(
        &self,
        relative: &Path,
        content: &str,
    ) -> Result<WriteOutcome, StoreError> {
        let path = self.resolve(relative)?;
        if path.exists() {
            let current = fs::read_to_string(&path).map_err(|err| StoreError::io(&path, err))?;
            if !current.starts_with(GENERATED_MARKER) {
                tracing::warn!(
                    path = %path.display(),
                    "module index was not generated; leaving it untouched"
                );
                return Ok(WriteOutcome::Preserved);
            }
        }
        self.write(relative, content)
    }

    /// Restore the `.bak` copy taken before the last overwrite.
    pub fn rollback(&self, relative: &Path) -> Result<(), StoreError> {
        let path = self.resolve(relative)?;
        let backup = backup_path(&path);
        let contents = fs::read(&backup).map_err(|err| StoreError::io(&backup, err))?;
        atomic_write(&path, &contents)?;
        tracing::info!(path = %path.display(), "rolled back generated file");
        Ok(())
    }

    fn resolve(&self, relative: &Path) -> Result<PathBuf, StoreError> {
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(StoreError::OutsideRoot {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn create_backup(&self, path: &Path) -> Result<(), StoreError> {
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|err| StoreError::io(&backup, err))?;
        tracing::debug!(backup = %backup.display(), "created backup");
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Replace `path` with `contents` via temp file and rename, creating parent
/// directories as needed.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|err| StoreError::io(parent, err))?;
    temp.write_all(contents)
        .and_then(|_| temp.flush())
        .map_err(|err| StoreError::io(path, err))?;
    temp.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;
    Ok(())
}

/// SHA-256 of a string, hex encoded.
pub fn compute_string_hash(content: &str) -> String {
    compute_bytes_hash(content.as_bytes())
}

fn compute_bytes_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
