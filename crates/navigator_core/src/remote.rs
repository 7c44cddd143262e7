use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        priority_operation, summary_operation, PriorityRequest, StatusResponse, SummaryRequest,
        SummaryResponse, STATUS_OK,
    },
};
use storage::Storage;
use tracing::warn;

use crate::RemoteStore;

#[derive(Clone)]
pub struct StorageRemoteStore {
    storage: Storage,
    summary_operation: String,
    priority_operation: String,
}

impl StorageRemoteStore {
    pub fn new(storage: Storage, domain: &str) -> Self {
        Self {
            storage,
            summary_operation: summary_operation(domain),
            priority_operation: priority_operation(domain),
        }
    }

    pub async fn connect(database_url: &str, domain: &str) -> Result<Self> {
        let storage = Storage::new(database_url)
            .await
            .with_context(|| format!("failed to open record storage at '{database_url}'"))?;
        Ok(Self::new(storage, domain))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    async fn summary(&self, request: SummaryRequest) -> Result<Value> {
        match self.storage.list_summary(request.context_id).await {
            Ok(records) => Ok(serde_json::to_value(SummaryResponse {
                status: STATUS_OK.to_string(),
                records,
            })?),
            Err(err) => {
                warn!(context_id = request.context_id.0, error = %err, "summary query failed");
                failed(ErrorCode::Internal, err.to_string())
            }
        }
    }

    async fn priority(&self, request: PriorityRequest) -> Result<Value> {
        if !request.id.is_persisted() {
            return failed(
                ErrorCode::Validation,
                format!("record id {} cannot carry a priority", request.id),
            );
        }
        match self.storage.update_priority(request.id, request.priority).await {
            Ok(true) => Ok(serde_json::to_value(StatusResponse::ok())?),
            Ok(false) => failed(ErrorCode::NotFound, format!("record {} not found", request.id)),
            Err(err) => {
                warn!(record_id = request.id.0, error = %err, "priority update failed");
                failed(ErrorCode::Internal, err.to_string())
            }
        }
    }
}

fn failed(code: ErrorCode, message: impl Into<String>) -> Result<Value> {
    Ok(serde_json::to_value(StatusResponse::failed(ApiError::new(
        code, message,
    )))?)
}

fn decode<T: DeserializeOwned>(payload: Value) -> std::result::Result<T, String> {
    serde_json::from_value(payload).map_err(|e| e.to_string())
}

#[async_trait]
impl RemoteStore for StorageRemoteStore {
    async fn call(&self, operation: &str, payload: Value) -> Result<Value> {
        if operation == self.summary_operation {
            match decode::<SummaryRequest>(payload) {
                Ok(request) => self.summary(request).await,
                Err(message) => failed(ErrorCode::Validation, message),
            }
        } else if operation == self.priority_operation {
            match decode::<PriorityRequest>(payload) {
                Ok(request) => self.priority(request).await,
                Err(message) => failed(ErrorCode::Validation, message),
            }
        } else {
            failed(
                ErrorCode::UnknownOperation,
                format!("unsupported operation {operation}"),
            )
        }
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
