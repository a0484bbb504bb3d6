//! Registry of every sheet that has been generated, persisted as JSON.
//!
//! Entries are keyed by (sheet id, sheet name), compared case-insensitively.
//! The last generated schema is kept so the next run can report drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::codegen::source_file_name;
use crate::codegen::writer::atomic_write;
use crate::error::StoreError;
use crate::schema::{SheetMode, SheetSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRegistryEntry {
    pub sheet_id: String,
    pub sheet_name: String,
    pub mode: SheetMode,
    pub record_name: String,
    pub container_name: String,
    pub record_full_name: String,
    pub container_full_name: String,
    pub record_namespace: String,
    pub container_namespace: String,
    pub script_output_path: PathBuf,
    pub container_script_output_path: PathBuf,
    pub asset_path: String,
    pub last_synced: DateTime<Utc>,
    #[serde(default)]
    pub last_field_names: Vec<String>,
    #[serde(default)]
    pub last_field_types: Vec<String>,
}

impl AssetRegistryEntry {
    pub fn matches(&self, sheet_id: &str, sheet_name: &str) -> bool {
        self.sheet_id.eq_ignore_ascii_case(sheet_id) && self.sheet_name.eq_ignore_ascii_case(sheet_name)
    }

    /// Record and container source files, relative to the project root.
    pub fn generated_files(&self) -> [PathBuf; 2] {
        [
            self.script_output_path.join(source_file_name(&self.record_name)),
            self.container_script_output_path
                .join(source_file_name(&self.container_name)),
        ]
    }

    pub fn generated_types(&self) -> [&str; 2] {
        [&self.record_full_name, &self.container_full_name]
    }

    pub fn last_schema(&self) -> SheetSchema {
        SheetSchema {
            field_names: self.last_field_names.clone(),
            field_types: self.last_field_types.clone(),
        }
    }
}

/// Fields that appeared or disappeared between two generations of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `(name, previous type, current type)`
    pub retyped: Vec<(String, String, String)>,
}

impl SchemaDiff {
    pub fn between(previous: &SheetSchema, current: &SheetSchema) -> Self {
        let pairs = |schema: &SheetSchema| -> Vec<(String, String)> {
            schema
                .field_names
                .iter()
                .zip(&schema.field_types)
                .filter(|(name, _)| !name.trim().is_empty())
                .map(|(name, ty)| (name.trim().to_string(), ty.trim().to_string()))
                .collect()
        };
        let before = pairs(previous);
        let after = pairs(current);

        let mut diff = SchemaDiff::default();
        for (name, ty) in &after {
            match before.iter().find(|(old, _)| old == name) {
                None => diff.added.push(name.clone()),
                Some((_, old_ty)) if !old_ty.eq_ignore_ascii_case(ty) => {
                    diff.retyped.push((name.clone(), old_ty.clone(), ty.clone()));
                }
                Some(_) => {}
            }
        }
        for (name, _) in &before {
            if !after.iter().any(|(new, _)| new == name) {
                diff.removed.push(name.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.retyped.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    entries: Vec<AssetRegistryEntry>,
}

/// JSON file backed registry. Every mutation is saved immediately.
#[derive(Debug)]
pub struct AssetRegistry {
    path: PathBuf,
    entries: Vec<AssetRegistryEntry>,
}

impl AssetRegistry {
    /// Load the registry at `path`; a missing or empty file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => {
                let file: RegistryFile =
                    serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    })?;
                file.entries
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(StoreError::io(&path, err)),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[AssetRegistryEntry] {
        &self.entries
    }

    pub fn find(&self, sheet_id: &str, sheet_name: &str) -> Option<&AssetRegistryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(sheet_id, sheet_name))
    }

    /// Insert or replace the entry for the same sheet. Returns the entry it
    /// replaced.
    pub fn upsert(&mut self, entry: AssetRegistryEntry) -> Result<Option<AssetRegistryEntry>, StoreError> {
        let previous = match self
            .entries
            .iter_mut()
            .find(|existing| existing.matches(&entry.sheet_id, &entry.sheet_name))
        {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        };
        self.save()?;
        Ok(previous)
    }

    pub fn remove(&mut self, sheet_id: &str, sheet_name: &str) -> Result<bool, StoreError> {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !entry.matches(sheet_id, sheet_name));
        let removed = self.entries.len() != before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        let file = RegistryFile {
            entries: self.entries.clone(),
        };
        let text = serde_json::to_string_pretty(&file)?;
        atomic_write(&self.path, text.as_bytes())
    }
}
