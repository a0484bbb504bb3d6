//! The compiled-type environment as seen by the binder.
//!
//! Host programs register their generated types here once they compile. The
//! registry captures each container's capability in a closure, so binding
//! never looks members up by name.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::BindError;
use crate::runtime::{ConstContainer, SheetRecord, TableContainer};
use crate::schema::SheetMode;

/// Sheet bookkeeping assigned to every bound container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMetadata {
    pub sheet_id: String,
    pub sheet_name: String,
}

type BuildFn = Box<dyn Fn(&Value, &SheetMetadata) -> Result<Value, BindError>>;

/// A registered container and how to populate it.
pub struct ContainerEntry {
    type_name: &'static str,
    record_type: &'static str,
    mode: SheetMode,
    build: BuildFn,
}

impl ContainerEntry {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn record_type(&self) -> &'static str {
        self.record_type
    }

    pub fn mode(&self) -> SheetMode {
        self.mode
    }

    /// Deserialize `document` into the record type, assign it and the
    /// metadata to a default container, and return the container serialized.
    /// A `null` document leaves the container's data at its default.
    pub fn build(&self, document: &Value, metadata: &SheetMetadata) -> Result<Value, BindError> {
        (self.build)(document, metadata)
    }
}

impl std::fmt::Debug for ContainerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerEntry")
            .field("type_name", &self.type_name)
            .field("record_type", &self.record_type)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum RegisteredType {
    Record { type_name: &'static str },
    Container(ContainerEntry),
}

/// Lookup of compiled types by fully qualified name.
pub trait TypeEnvironment {
    /// False while types are being rebuilt; binding must wait.
    fn is_stable(&self) -> bool;

    fn resolve(&self, full_name: &str) -> Option<&RegisteredType>;
}

/// In-process [`TypeEnvironment`] populated by explicit registration.
#[derive(Debug)]
pub struct TypeRegistry {
    types: IndexMap<String, RegisteredType>,
    stable: bool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            types: IndexMap::new(),
            stable: true,
        }
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stable(&mut self, stable: bool) {
        self.stable = stable;
    }

    pub fn register_record<R: SheetRecord>(&mut self) -> &mut Self {
        self.insert(
            R::TYPE_NAME,
            RegisteredType::Record {
                type_name: R::TYPE_NAME,
            },
        );
        self
    }

    /// Register a Table container and its record type.
    pub fn register_table<C: TableContainer>(&mut self) -> &mut Self {
        self.register_record::<C::Record>();
        let build: BuildFn = Box::new(|document: &Value, metadata: &SheetMetadata| {
            let values = if document.is_null() {
                Vec::new()
            } else {
                Vec::<C::Record>::deserialize(document).map_err(|source| BindError::Payload {
                    type_name: C::TYPE_NAME.to_string(),
                    source,
                })?
            };
            let mut container = C::default();
            container.set_values(values);
            container.set_metadata(&metadata.sheet_id, &metadata.sheet_name);
            serialize_container(C::TYPE_NAME, &container)
        });
        self.insert_container(C::TYPE_NAME, <C::Record as SheetRecord>::TYPE_NAME, SheetMode::Table, build)
    }

    /// Register a Const container and its record type.
    pub fn register_const<C: ConstContainer>(&mut self) -> &mut Self {
        self.register_record::<C::Record>();
        let build: BuildFn = Box::new(|document: &Value, metadata: &SheetMetadata| {
            let value = if document.is_null() {
                C::Record::default()
            } else {
                C::Record::deserialize(document).map_err(|source| BindError::Payload {
                    type_name: C::TYPE_NAME.to_string(),
                    source,
                })?
            };
            let mut container = C::default();
            container.set_single_value(value);
            container.set_metadata(&metadata.sheet_id, &metadata.sheet_name);
            serialize_container(C::TYPE_NAME, &container)
        });
        self.insert_container(C::TYPE_NAME, <C::Record as SheetRecord>::TYPE_NAME, SheetMode::Const, build)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn insert_container(
        &mut self,
        type_name: &'static str,
        record_type: &'static str,
        mode: SheetMode,
        build: BuildFn,
    ) -> &mut Self {
        self.insert(
            type_name,
            RegisteredType::Container(ContainerEntry {
                type_name,
                record_type,
                mode,
                build,
            }),
        );
        self
    }

    fn insert(&mut self, type_name: &str, entry: RegisteredType) {
        if let Some(previous) = self.types.insert(type_name.to_string(), entry) {
            if !matches!(previous, RegisteredType::Record { .. }) {
                tracing::warn!(type_name, "replaced an existing container registration");
            }
        }
    }
}

impl TypeEnvironment for TypeRegistry {
    fn is_stable(&self) -> bool {
        self.stable
    }

    fn resolve(&self, full_name: &str) -> Option<&RegisteredType> {
        self.types.get(full_name)
    }
}

fn serialize_container<C: serde::Serialize>(
    type_name: &str,
    container: &C,
) -> Result<Value, BindError> {
    serde_json::to_value(container).map_err(|source| BindError::Payload {
        type_name: type_name.to_string(),
        source,
    })
}
