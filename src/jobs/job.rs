use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::SheetMode;

/// Identity of a job: when it was enqueued and which container it targets.
///
/// The store bumps timestamps so they strictly increase, which makes the
/// identity unique and gives a total enqueue order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId {
    pub enqueued_at: DateTime<Utc>,
    pub container_type: String,
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.container_type,
            self.enqueued_at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
        )
    }
}

/// Everything the pipeline knows when it decides to materialize a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub sheet_id: String,
    pub sheet_name: String,
    /// Fully qualified record type, e.g. `data::Monster`.
    pub record_type: String,
    /// Fully qualified container type, e.g. `data::Monsters`.
    pub container_type: String,
    /// Asset location relative to the asset store root.
    pub asset_path: String,
    pub payload: String,
    pub mode: SheetMode,
}

/// A persisted request to bind a JSON payload into a compiled container.
///
/// Jobs are immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    enqueued_at: DateTime<Utc>,
    sheet_id: String,
    sheet_name: String,
    record_type: String,
    container_type: String,
    asset_path: String,
    payload: String,
    mode: SheetMode,
}

impl GenerationJob {
    pub fn new(request: JobRequest, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            enqueued_at,
            sheet_id: request.sheet_id,
            sheet_name: request.sheet_name,
            record_type: request.record_type,
            container_type: request.container_type,
            asset_path: request.asset_path,
            payload: request.payload,
            mode: request.mode,
        }
    }

    pub fn id(&self) -> JobId {
        JobId {
            enqueued_at: self.enqueued_at,
            container_type: self.container_type.clone(),
        }
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn container_type(&self) -> &str {
        &self.container_type
    }

    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn mode(&self) -> SheetMode {
        self.mode
    }
}
