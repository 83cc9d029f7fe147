// tests/session_last_write_wins.rs
//
// Overlapping searches: whichever began last owns the collection, no matter
// which finishes first.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use tender_monitor::config::AppConfig;
use tender_monitor::ingest::lookup::OrganizationLookup;
use tender_monitor::ingest::query::QueryFilters;
use tender_monitor::session::{Origin, Session, Snapshot};
use tender_monitor::{AppState, FetchError, NoticePage, NoticeSource, SourceSystem};

/// Answers after a delay taken from the query title (milliseconds), with one
/// record whose id is the title.
struct DelayedSource;

#[async_trait]
impl NoticeSource for DelayedSource {
    async fn fetch_notices(&self, filters: &QueryFilters) -> Result<NoticePage, FetchError> {
        let title = filters.title.clone().unwrap_or_default();
        let ms: u64 = title.parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(NoticePage {
            content: vec![json!({
                "referenceNumber": title,
                "title": "t",
                "submissionDate": "2025-01-01",
                "finalDate": "2099-01-01",
                "totalCostWithoutVAT": 1
            })],
            total_elements: 1,
        })
    }

    fn name(&self) -> &'static str {
        "delayed"
    }

    fn source_system(&self) -> SourceSystem {
        SourceSystem::Procurement
    }
}

#[tokio::test]
async fn slower_older_search_is_discarded() {
    let config = AppConfig {
        cache_ttl_secs: 0,
        ..AppConfig::default()
    };
    let state = AppState::new(config, Arc::new(DelayedSource), OrganizationLookup::default());

    let slow = {
        let s = state.clone();
        tokio::spawn(async move { s.search(&QueryFilters::default().with_title("300")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = state.search(&QueryFilters::default().with_title("10")).await;
    let slow = slow.await.unwrap();

    assert!(fast.installed);
    assert!(!slow.installed);

    let cur = state.session.current().unwrap();
    assert_eq!(cur.tenders[0].id(), "10");
    assert_eq!(cur.origin, Origin::Live { source: "delayed" });
}

#[test]
fn failed_search_keeps_previous_collection_marked_stale() {
    let session = Session::new();
    let t = session.begin_search();
    let mut snap = Snapshot::empty(SourceSystem::Procurement, "seed", Utc::now());
    snap.origin = Origin::Mock { seed: 1 };
    snap.status = None;
    snap.tenders = tender_monitor::ingest::normalize::Normalizers::new(
        "https://api.example",
        tender_monitor::ingest::normalize::DisclosureNormalizer::budgets(),
    )
    .normalize_batch(
        &[json!({"ada": "X", "title": "x", "publish_date": "2025-01-01",
                 "deadline": "2099-01-01", "budget": 5})],
        SourceSystem::Disclosure,
    )
    .tenders;
    assert!(session.complete_search(t, snap));

    let t2 = session.begin_search();
    assert!(session.fail_search(t2, SourceSystem::Procurement, "search failed: timeout", Utc::now()));

    let cur = session.current().unwrap();
    assert!(cur.stale);
    assert_eq!(cur.tenders.len(), 1);
    assert_eq!(cur.origin, Origin::Mock { seed: 1 });
    assert_eq!(cur.status.as_deref(), Some("search failed: timeout"));
}

#[test]
fn regeneration_supersedes_inflight_search() {
    let session = Session::new();
    let t = session.begin_search();
    session.install_mock(Snapshot::empty(SourceSystem::Disclosure, "mock", Utc::now()));
    assert!(!session.complete_search(
        t,
        Snapshot::empty(SourceSystem::Procurement, "late", Utc::now())
    ));
    assert_eq!(
        session.current().unwrap().status.as_deref(),
        Some("mock")
    );
}
