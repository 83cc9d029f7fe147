// src/ingest/types.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ingest::query::QueryFilters;
use crate::tender::SourceSystem;

/// First page of an upstream query. Records stay raw JSON so a single bad
/// record cannot fail the whole page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticePage {
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
    #[serde(default)]
    pub total_elements: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("server responded with status {0}")]
    ServerError(u16),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkError(_) => "network_error",
            FetchError::ServerError(_) => "server_error",
            FetchError::Timeout(_) => "timeout",
        }
    }
}

#[async_trait::async_trait]
pub trait NoticeSource: Send + Sync {
    /// One bounded query; errors are returned, never raised.
    async fn fetch_notices(&self, filters: &QueryFilters) -> Result<NoticePage, FetchError>;
    fn name(&self) -> &'static str;
    fn source_system(&self) -> SourceSystem;
}
