// src/ingest/providers/fixture.rs
//! Replays a fixed page through the `NoticeSource` contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::query::QueryFilters;
use crate::ingest::types::{FetchError, NoticePage, NoticeSource};
use crate::tender::SourceSystem;

#[derive(Debug, Clone)]
pub struct FixtureSource {
    page: Result<NoticePage, FetchError>,
    system: SourceSystem,
}

impl FixtureSource {
    /// Parse a `{content, totalElements}` document up front. A body that does
    /// not decode is replayed as a `NetworkError` on every fetch, the same
    /// way the live client reports an undecodable response.
    pub fn from_json_str(body: &str, system: SourceSystem) -> Self {
        let page = serde_json::from_str::<NoticePage>(body)
            .map_err(|e| FetchError::NetworkError(format!("decoding fixture page: {e}")));
        Self { page, system }
    }

    pub fn from_records(records: Vec<Value>, system: SourceSystem) -> Self {
        let page = NoticePage {
            total_elements: records.len() as u64,
            content: records,
        };
        Self {
            page: Ok(page),
            system,
        }
    }

    /// A source that always fails with `err`.
    pub fn failing(err: FetchError, system: SourceSystem) -> Self {
        Self {
            page: Err(err),
            system,
        }
    }
}

#[async_trait]
impl NoticeSource for FixtureSource {
    async fn fetch_notices(&self, _filters: &QueryFilters) -> Result<NoticePage, FetchError> {
        self.page.clone()
    }

    fn name(&self) -> &'static str {
        "fixture"
    }

    fn source_system(&self) -> SourceSystem {
        self.system
    }
}
