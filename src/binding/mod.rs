//! Binding generated JSON payloads into compiled container types.
//!
//! The binder never inspects types structurally. Containers are registered
//! through their capability trait ([`crate::runtime::TableContainer`] or
//! [`crate::runtime::ConstContainer`]) and resolved by fully qualified name.

pub mod assets;
pub mod binder;
pub mod types;

pub use assets::{AssetStore, FsAssetStore, MemoryAssetStore, StoredAsset};
pub use binder::{AssetBinder, BindOutcome};
pub use types::{ContainerEntry, RegisteredType, SheetMetadata, TypeEnvironment, TypeRegistry};
