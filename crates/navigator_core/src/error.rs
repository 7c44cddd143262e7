use std::path::PathBuf;

use shared::domain::{ContextId, RecordId};
use thiserror::Error;

use crate::ordering::PriorityChange;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("summary fetch for context {context_id} returned status {status}")]
    Status { context_id: ContextId, status: String },
    #[error("summary fetch for context {context_id} failed: {source}")]
    Transport {
        context_id: ContextId,
        source: anyhow::Error,
    },
    #[error("malformed summary exchange: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("priority update of record {record_id} to {priority} returned status {status}")]
    Status {
        record_id: RecordId,
        priority: i64,
        status: String,
    },
    #[error("priority update of record {record_id} to {priority} failed: {source}")]
    Transport {
        record_id: RecordId,
        priority: i64,
        source: anyhow::Error,
    },
    #[error("malformed priority exchange for record {record_id}: {source}")]
    Decode {
        record_id: RecordId,
        source: serde_json::Error,
    },
}

impl PersistError {
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Status { record_id, .. }
            | Self::Transport { record_id, .. }
            | Self::Decode { record_id, .. } => *record_id,
        }
    }
}

/// A reorder that did not persist every planned change.
///
/// `persisted` lists the writes that did land; they are already applied to the
/// local collection and the collection has been resorted around them.
#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("reorder stopped after {} persisted change(s): {failure}", persisted.len())]
    Aborted {
        failure: PersistError,
        persisted: Vec<PriorityChange>,
    },
    #[error("reorder persisted {} change(s) but {} failed", persisted.len(), failures.len())]
    Partial {
        failures: Vec<PersistError>,
        persisted: Vec<PriorityChange>,
    },
}

impl ReorderError {
    pub fn persisted(&self) -> &[PriorityChange] {
        match self {
            Self::Aborted { persisted, .. } | Self::Partial { persisted, .. } => persisted,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
