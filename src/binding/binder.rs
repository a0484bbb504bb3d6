use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use uuid::Uuid;

use super::assets::AssetStore;
use super::types::{RegisteredType, SheetMetadata, TypeEnvironment};
use crate::error::BindError;
use crate::jobs::GenerationJob;

/// Result of a successful bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub asset_path: String,
    pub guid: Uuid,
    /// True when the asset did not exist before this bind.
    pub created: bool,
}

/// Materializes jobs into persisted assets using the compiled-type environment.
pub struct AssetBinder<'a> {
    environment: &'a dyn TypeEnvironment,
    assets: &'a mut dyn AssetStore,
}

impl<'a> AssetBinder<'a> {
    pub fn new(environment: &'a dyn TypeEnvironment, assets: &'a mut dyn AssetStore) -> Self {
        Self {
            environment,
            assets,
        }
    }

    /// Bind one job. Every failure, including a panic inside registered
    /// code, comes back as a [`BindError`].
    pub fn bind(&mut self, job: &GenerationJob) -> Result<BindOutcome, BindError> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.bind_inner(job))) {
            Ok(result) => result,
            Err(payload) => Err(BindError::Panicked {
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    fn bind_inner(&mut self, job: &GenerationJob) -> Result<BindOutcome, BindError> {
        if self.environment.resolve(job.record_type()).is_none() {
            return Err(BindError::RecordTypeNotFound {
                type_name: job.record_type().to_string(),
            });
        }
        let entry = match self.environment.resolve(job.container_type()) {
            None => {
                return Err(BindError::ContainerTypeNotFound {
                    type_name: job.container_type().to_string(),
                });
            }
            Some(RegisteredType::Record { type_name }) => {
                return Err(BindError::NotAContainer {
                    type_name: type_name.to_string(),
                });
            }
            Some(RegisteredType::Container(entry)) => entry,
        };

        if entry.mode() != job.mode() {
            return Err(BindError::ModeMismatch {
                type_name: entry.type_name().to_string(),
                expected: job.mode(),
                actual: entry.mode(),
            });
        }
        if entry.record_type() != job.record_type() {
            return Err(BindError::RecordMismatch {
                container: entry.type_name().to_string(),
                expected: job.record_type().to_string(),
                actual: entry.record_type().to_string(),
            });
        }

        let document: Value =
            serde_json::from_str(job.payload()).map_err(|source| BindError::Payload {
                type_name: job.record_type().to_string(),
                source,
            })?;
        let metadata = SheetMetadata {
            sheet_id: job.sheet_id().to_string(),
            sheet_name: job.sheet_name().to_string(),
        };
        let data = entry.build(&document, &metadata)?;

        let outcome = match self.assets.load(job.asset_path())? {
            Some(mut existing) => {
                self.assets.copy_into(data, &mut existing)?;
                BindOutcome {
                    asset_path: existing.path,
                    guid: existing.guid,
                    created: false,
                }
            }
            None => {
                let asset = self
                    .assets
                    .create(job.asset_path(), entry.type_name(), data)?;
                BindOutcome {
                    asset_path: asset.path,
                    guid: asset.guid,
                    created: true,
                }
            }
        };
        self.assets.refresh()?;
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
