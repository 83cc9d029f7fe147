// src/ingest/providers/kimdis.rs
//! Live tender API client (KIMDIS open-data style).
//!
//! One `POST {base}/notice?page=0` per search, JSON body built from
//! `QueryFilters`, bounded by the client-wide timeout. Only the first page is
//! requested.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use std::time::Duration;

use crate::ingest::query::QueryFilters;
use crate::ingest::types::{FetchError, NoticePage, NoticeSource};
use crate::tender::SourceSystem;

pub const DEFAULT_API_BASE: &str = "https://cerpp.eprocurement.gov.gr/khmdhs-opendata";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloadable attachment of a notice, addressed by its `adam` reference.
pub fn attachment_url(base: &str, adam: &str) -> String {
    format!("{}/notice/attachment/{}", base.trim_end_matches('/'), adam)
}

pub struct KimdisClient {
    base: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl KimdisClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tender-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building tender api http client")?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn notice_url(&self) -> String {
        format!("{}/notice", self.base)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if let Some(status) = e.status() {
            FetchError::ServerError(status.as_u16())
        } else {
            FetchError::NetworkError(e.to_string())
        }
    }
}

#[async_trait]
impl NoticeSource for KimdisClient {
    async fn fetch_notices(&self, filters: &QueryFilters) -> Result<NoticePage, FetchError> {
        let body = filters.to_request_body();
        tracing::debug!(target: "ingest", url = %self.notice_url(), body = %body, "tender api query");

        let resp = self
            .client
            .post(self.notice_url())
            .query(&[("page", 0)])
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        resp.json::<NoticePage>()
            .await
            .map_err(|e| self.map_transport_error(e))
    }

    fn name(&self) -> &'static str {
        "kimdis"
    }

    fn source_system(&self) -> SourceSystem {
        SourceSystem::Procurement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_url_trims_trailing_slash() {
        assert_eq!(
            attachment_url("https://api.example/", "25PROC0001"),
            "https://api.example/notice/attachment/25PROC0001"
        );
    }

    #[test]
    fn notice_url_is_under_base() {
        let c = KimdisClient::new("http://127.0.0.1:9/api/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(c.notice_url(), "http://127.0.0.1:9/api/notice");
    }
}
