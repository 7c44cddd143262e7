use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{ContextId, RecordId},
    error::ApiError,
};

pub const STATUS_OK: &str = "OK";

/// Lightweight projection of a full record, enough to list and order it.
///
/// Fields the engine does not interpret travel in `attributes` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "staffid")]
    pub id: RecordId,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, alias = "occupation")]
    pub category: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(id: i64, priority: i64, category: impl Into<String>, valid: bool) -> Self {
        Self {
            id: RecordId(id),
            priority,
            category: category.into(),
            valid,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

pub fn summary_operation(domain: &str) -> String {
    format!("{domain}_summary")
}

pub fn priority_operation(domain: &str) -> String {
    format!("{domain}_priority")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(rename = "contextId", alias = "context_id")]
    pub context_id: ContextId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub status: String,
    #[serde(default)]
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRequest {
    #[serde(alias = "staffid")]
    pub id: RecordId,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            status: error.code.as_status().to_string(),
            error: Some(error),
        }
    }
}
