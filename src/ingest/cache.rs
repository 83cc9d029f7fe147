// src/ingest/cache.rs
//! Page cache keyed by the exact outbound query.
//!
//! Key = SHA-256 over the provider name and the canonical request body, so
//! two searches that would send byte-identical bodies share an entry. Each
//! entry remembers when it was fetched; reads check the TTL explicitly and
//! drop stale entries, and every insert prunes whatever has expired.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::ingest::query::QueryFilters;
use crate::ingest::types::NoticePage;

/// Default freshness window: one hour.
pub const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub page: NoticePage,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPage>>,
}

impl QueryCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(DEFAULT_TTL_SECS as i64)),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn key_for(source: &str, filters: &QueryFilters) -> String {
        let body = filters.to_request_body().to_string();
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// Fresh means `now - fetched_at < ttl`. Stale entries are evicted on read.
    pub fn get_fresh(
        &self,
        source: &str,
        filters: &QueryFilters,
        now: DateTime<Utc>,
    ) -> Option<NoticePage> {
        let key = Self::key_for(source, filters);
        let mut entries = self.entries.lock().expect("query cache mutex poisoned");
        match entries.get(&key) {
            Some(hit) if now - hit.fetched_at < self.ttl => Some(hit.page.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(
        &self,
        source: &str,
        filters: &QueryFilters,
        page: NoticePage,
        fetched_at: DateTime<Utc>,
    ) {
        if self.ttl <= Duration::zero() {
            return;
        }
        let key = Self::key_for(source, filters);
        let mut entries = self.entries.lock().expect("query cache mutex poisoned");
        entries.retain(|_, e| fetched_at - e.fetched_at < self.ttl);
        entries.insert(key, CachedPage { page, fetched_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("query cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("query cache mutex poisoned").clear();
    }
}
