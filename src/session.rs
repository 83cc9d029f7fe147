// src/session.rs
//! Current tender collection, replaced wholesale per search or regeneration.
//!
//! Overlapping searches resolve last-write-wins: every search takes a ticket
//! from a monotonically increasing generation, and only the holder of the
//! newest ticket may install its result. Older results are dropped.

use chrono::{DateTime, Utc};
use metrics::gauge;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::ingest::normalize::RecordError;
use crate::ingest::IngestReport;
use crate::tender::{SourceSystem, Tender};

/// Where the installed collection came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    Live { source: &'static str },
    Mock { seed: u64 },
    Empty,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub origin: Origin,
    pub system: SourceSystem,
    pub tenders: Vec<Tender>,
    pub errors: Vec<RecordError>,
    pub total_elements: u64,
    pub cached: bool,
    pub refreshed_at: DateTime<Utc>,
    /// Set when the last search failed and this collection is older than it.
    pub stale: bool,
    pub status: Option<String>,
}

impl Snapshot {
    pub fn from_report(report: IngestReport, origin: Origin, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            origin,
            system: report.system,
            tenders: report.batch.tenders,
            errors: report.batch.errors,
            total_elements: report.total_elements,
            cached: report.cached,
            refreshed_at,
            stale: false,
            status: None,
        }
    }

    pub fn empty(system: SourceSystem, status: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            origin: Origin::Empty,
            system,
            tenders: Vec::new(),
            errors: Vec::new(),
            total_elements: 0,
            cached: false,
            refreshed_at: at,
            stale: false,
            status: Some(status.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct Session {
    generation: AtomicU64,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a search; any ticket handed out earlier becomes outdated.
    pub fn begin_search(&self) -> SearchTicket {
        SearchTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Install `snapshot` if no newer search has begun. Returns whether it
    /// was installed.
    pub fn complete_search(&self, ticket: SearchTicket, snapshot: Snapshot) -> bool {
        let mut slot = self.current.write().expect("session lock poisoned");
        if !self.is_current(ticket) {
            tracing::debug!(
                target: "api",
                ticket = ticket.0,
                "discarding result of superseded search"
            );
            return false;
        }
        gauge!("session_last_refresh_ts").set(snapshot.refreshed_at.timestamp() as f64);
        *slot = Some(Arc::new(snapshot));
        true
    }

    /// The search behind `ticket` failed. Keep the previous collection but
    /// flag it stale, or install an empty one when there is nothing to keep.
    pub fn fail_search(
        &self,
        ticket: SearchTicket,
        system: SourceSystem,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> bool {
        let message = message.into();
        let mut slot = self.current.write().expect("session lock poisoned");
        if !self.is_current(ticket) {
            return false;
        }
        let next = match slot.as_deref() {
            Some(prev) if !prev.tenders.is_empty() => Snapshot {
                stale: true,
                status: Some(message),
                ..prev.clone()
            },
            _ => Snapshot::empty(system, message, at),
        };
        *slot = Some(Arc::new(next));
        true
    }

    /// Regeneration supersedes any search still in flight.
    pub fn install_mock(&self, snapshot: Snapshot) {
        let ticket = self.begin_search();
        self.complete_search(ticket, snapshot);
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.read().expect("session lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(total: u64) -> Snapshot {
        Snapshot {
            total_elements: total,
            ..Snapshot::empty(SourceSystem::Procurement, "x", Utc::now())
        }
    }

    #[test]
    fn older_ticket_cannot_overwrite_newer() {
        let s = Session::new();
        let first = s.begin_search();
        let second = s.begin_search();
        assert!(s.complete_search(second, snap(2)));
        assert!(!s.complete_search(first, snap(1)));
        assert_eq!(s.current().unwrap().total_elements, 2);
    }

    #[test]
    fn failure_without_data_installs_empty_with_status() {
        let s = Session::new();
        let t = s.begin_search();
        assert!(s.fail_search(t, SourceSystem::Procurement, "timeout", Utc::now()));
        let cur = s.current().unwrap();
        assert!(cur.tenders.is_empty());
        assert_eq!(cur.status.as_deref(), Some("timeout"));
        assert_eq!(cur.origin, Origin::Empty);
    }
}
