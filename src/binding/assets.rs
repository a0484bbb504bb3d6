//! Persisted assets: bound container data with a stable identity.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::codegen::writer::atomic_write;
use crate::error::StoreError;

/// File extension of assets written by [`FsAssetStore`].
pub const ASSET_EXTENSION: &str = "asset";

/// One materialized container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// Identity that survives every update of the asset's data.
    pub guid: Uuid,
    pub type_name: String,
    /// Location relative to the store root, `/` separated.
    pub path: String,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

/// Host storage for materialized assets.
pub trait AssetStore {
    fn load(&self, path: &str) -> Result<Option<StoredAsset>, StoreError>;

    /// Persist a new asset at `path` with a fresh identity.
    fn create(&mut self, path: &str, type_name: &str, data: Value) -> Result<StoredAsset, StoreError>;

    /// Replace `destination`'s data in place; its identity is kept.
    fn copy_into(&mut self, data: Value, destination: &mut StoredAsset) -> Result<(), StoreError>;

    /// Rebuild whatever index the host keeps over its assets.
    fn refresh(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct AssetIndexEntry {
    guid: Uuid,
    type_name: String,
}

/// Assets stored as pretty JSON files below a root directory, plus a JSON
/// index mapping each asset path to its identity.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
    index_path: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let index_path = root.join(".sheetforge").join("asset_index.json");
        Self { root, index_path }
    }

    pub fn with_index_path(mut self, index_path: impl Into<PathBuf>) -> Self {
        self.index_path = index_path.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
        if escapes || path.trim().is_empty() {
            return Err(StoreError::OutsideRoot {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn write(&self, asset: &StoredAsset) -> Result<(), StoreError> {
        let path = self.resolve(&asset.path)?;
        let text = serde_json::to_string_pretty(asset)?;
        atomic_write(&path, text.as_bytes())
    }
}

impl AssetStore for FsAssetStore {
    fn load(&self, path: &str) -> Result<Option<StoredAsset>, StoreError> {
        let full = self.resolve(path)?;
        let text = match fs::read_to_string(&full) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(&full, err)),
        };
        let mut asset: StoredAsset =
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                path: full.clone(),
                source,
            })?;
        asset.path = path.to_string();
        Ok(Some(asset))
    }

    fn create(&mut self, path: &str, type_name: &str, data: Value) -> Result<StoredAsset, StoreError> {
        let asset = StoredAsset {
            guid: Uuid::new_v4(),
            type_name: type_name.to_string(),
            path: path.to_string(),
            updated_at: Utc::now(),
            data,
        };
        self.write(&asset)?;
        tracing::info!(path, guid = %asset.guid, "created asset");
        Ok(asset)
    }

    fn copy_into(&mut self, data: Value, destination: &mut StoredAsset) -> Result<(), StoreError> {
        destination.data = data;
        destination.updated_at = Utc::now();
        self.write(destination)?;
        tracing::info!(path = %destination.path, guid = %destination.guid, "updated asset");
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), StoreError> {
        let mut index: IndexMap<String, AssetIndexEntry> = IndexMap::new();
        let walker = WalkDir::new(&self.root).sort_by_file_name().into_iter();
        for entry in walker.filter_map(Result::ok) {
            let is_asset = entry.file_type().is_file()
                && entry.path().extension().and_then(|ext| ext.to_str()) == Some(ASSET_EXTENSION);
            if !is_asset {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            match self.load(&key) {
                Ok(Some(asset)) => {
                    index.insert(
                        key,
                        AssetIndexEntry {
                            guid: asset.guid,
                            type_name: asset.type_name,
                        },
                    );
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(path = %key, error = %err, "skipping unreadable asset"),
            }
        }

        let text = serde_json::to_string_pretty(&index)?;
        atomic_write(&self.index_path, text.as_bytes())?;
        tracing::debug!(assets = index.len(), "refreshed asset index");
        Ok(())
    }
}

/// In-memory asset store for hosts that persist assets themselves, and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: IndexMap<String, StoredAsset>,
    refreshes: usize,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&StoredAsset> {
        self.assets.get(path)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, path: &str) -> Result<Option<StoredAsset>, StoreError> {
        Ok(self.assets.get(path).cloned())
    }

    fn create(&mut self, path: &str, type_name: &str, data: Value) -> Result<StoredAsset, StoreError> {
        let asset = StoredAsset {
            guid: Uuid::new_v4(),
            type_name: type_name.to_string(),
            path: path.to_string(),
            updated_at: Utc::now(),
            data,
        };
        self.assets.insert(path.to_string(), asset.clone());
        Ok(asset)
    }

    fn copy_into(&mut self, data: Value, destination: &mut StoredAsset) -> Result<(), StoreError> {
        destination.data = data;
        destination.updated_at = Utc::now();
        self.assets
            .insert(destination.path.clone(), destination.clone());
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), StoreError> {
        self.refreshes += 1;
        Ok(())
    }
}
