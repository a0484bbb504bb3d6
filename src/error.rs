//! Error taxonomy for the generation pipeline and the job queue.
//!
//! The layers fail differently on purpose:
//! - structural problems in a sheet (bad field names, colliding members) are
//!   [`SchemaError`]s and stop generation before any job is enqueued
//! - messy cell data never produces an error; it degrades to zero values
//! - binding problems are per-job [`BindError`]s reported by the drain pass
//! - persistence problems surface as [`StoreError`]s

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::schema::SheetMode;

// =============================================================================
// SCHEMA ERRORS
// =============================================================================

/// Why a header cell could not be turned into an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidNameReason {
    /// The cell was empty or contained only whitespace
    Empty,
    /// The cell contained a character other than ASCII letters, digits, `_` or whitespace
    IllegalCharacter(char),
    /// The cell contained only separators
    NoIdentifierCharacters,
}

impl fmt::Display for InvalidNameReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidNameReason::Empty => write!(f, "name is empty"),
            InvalidNameReason::IllegalCharacter(ch) => {
                write!(f, "character {ch:?} is not allowed")
            }
            InvalidNameReason::NoIdentifierCharacters => {
                write!(f, "name contains no letters or digits")
            }
        }
    }
}

/// Structural errors in a sheet schema. These are fatal for generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid field name '{name}': {reason}")]
    InvalidFieldName {
        name: String,
        reason: InvalidNameReason,
    },

    #[error("invalid type name '{name}' derived from sheet: {reason}")]
    InvalidTypeName {
        name: String,
        reason: InvalidNameReason,
    },

    #[error("fields '{first}' and '{second}' both map to member '{member}'")]
    DuplicateMember {
        member: String,
        first: String,
        second: String,
    },

    #[error("invalid namespace '{namespace}': segment '{segment}' is not a module identifier")]
    InvalidNamespace { namespace: String, segment: String },

    #[error("'{generated}' from sheet '{sheet}' collides with '{existing}' generated from sheet '{other_sheet}'")]
    GeneratedNameCollision {
        generated: String,
        existing: String,
        sheet: String,
        other_sheet: String,
    },
}

// =============================================================================
// SOURCE ERRORS
// =============================================================================

/// Failures while fetching the raw cell grid. Messages are surfaced verbatim.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("not authorized to read sheet '{sheet}': {message}")]
    Unauthorized { sheet: String, message: String },

    #[error("sheet '{sheet}' not found in '{spreadsheet}'")]
    NotFound { spreadsheet: String, sheet: String },

    #[error("invalid range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("failed to read workbook {path:?}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Response(String),
}

// =============================================================================
// STORE ERRORS
// =============================================================================

/// Failures of the file-backed stores (jobs, registry, assets).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store contents: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("path {path:?} escapes the project root")]
    OutsideRoot { path: PathBuf },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// BIND ERRORS
// =============================================================================

/// Per-job binding failure. Reported by the drain pass, never propagated.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("record type '{type_name}' not found in the compiled environment")]
    RecordTypeNotFound { type_name: String },

    #[error("container type '{type_name}' not found in the compiled environment")]
    ContainerTypeNotFound { type_name: String },

    #[error("'{type_name}' is registered but is not a sheet container")]
    NotAContainer { type_name: String },

    #[error("container '{type_name}' holds {actual} data but the job carries {expected} data")]
    ModeMismatch {
        type_name: String,
        expected: SheetMode,
        actual: SheetMode,
    },

    #[error("container '{container}' stores '{actual}' records, job expects '{expected}'")]
    RecordMismatch {
        container: String,
        expected: String,
        actual: String,
    },

    #[error("payload does not match '{type_name}': {source}")]
    Payload {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("asset store failure: {0}")]
    Store(#[from] StoreError),

    #[error("binding panicked: {message}")]
    Panicked { message: String },
}

// =============================================================================
// GENERATION ERRORS
// =============================================================================

/// Errors reported synchronously to whoever requested a generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("sheet '{sheet}' has no fields to generate")]
    EmptySchema { sheet: String },

    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
