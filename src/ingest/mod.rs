// src/ingest/mod.rs
pub mod cache;
pub mod lookup;
pub mod normalize;
pub mod providers;
pub mod query;
pub mod types;

use crate::ingest::cache::QueryCache;
use crate::ingest::normalize::{NormalizedBatch, Normalizers};
use crate::ingest::query::QueryFilters;
use crate::ingest::types::{FetchError, NoticePage, NoticeSource};
use crate::tender::SourceSystem;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_fetch_total", "Upstream page fetches attempted.");
        describe_counter!(
            "ingest_fetch_errors_total",
            "Upstream fetches that ended in a FetchError."
        );
        describe_counter!(
            "normalize_accepted_total",
            "Raw records turned into tenders."
        );
        describe_counter!(
            "normalize_rejected_total",
            "Raw records rejected by a normalizer, by error kind."
        );
        describe_counter!("query_cache_hits_total", "Searches served from the query cache.");
        describe_counter!(
            "query_cache_misses_total",
            "Searches that had to hit the upstream."
        );
        describe_histogram!("ingest_parse_ms", "Normalization time per page in milliseconds.");
        describe_gauge!(
            "session_last_refresh_ts",
            "Unix ts when the session collection was last replaced."
        );
    });
}

/// Normalize text: decode entities, strip tags, fold quotes and whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 1000 chars
    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }

    out
}

/// Result of one search: what came back and what survived normalization.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub source: &'static str,
    pub system: SourceSystem,
    pub total_elements: u64,
    pub cached: bool,
    pub batch: NormalizedBatch,
}

/// Fetch the first page, consulting the cache first when one is given.
/// Returns the page and whether it was served from cache.
pub async fn fetch_page(
    source: &dyn NoticeSource,
    cache: Option<&QueryCache>,
    filters: &QueryFilters,
) -> Result<(NoticePage, bool), FetchError> {
    ensure_metrics_described();
    let now = chrono::Utc::now();

    if let Some(c) = cache {
        if let Some(page) = c.get_fresh(source.name(), filters, now) {
            counter!("query_cache_hits_total").increment(1);
            return Ok((page, true));
        }
        counter!("query_cache_misses_total").increment(1);
    }

    counter!("ingest_fetch_total", "source" => source.name()).increment(1);
    match source.fetch_notices(filters).await {
        Ok(page) => {
            if let Some(c) = cache {
                c.insert(source.name(), filters, page.clone(), now);
            }
            Ok((page, false))
        }
        Err(e) => {
            tracing::warn!(
                target: "ingest",
                error = %e,
                kind = e.kind(),
                provider = source.name(),
                "provider fetch failed"
            );
            counter!("ingest_fetch_errors_total", "kind" => e.kind()).increment(1);
            Err(e)
        }
    }
}

/// Run one search: fetch (through the cache), then normalize the page.
pub async fn run_once(
    source: &dyn NoticeSource,
    normalizers: &Normalizers,
    cache: Option<&QueryCache>,
    filters: &QueryFilters,
) -> Result<IngestReport, FetchError> {
    let (page, cached) = fetch_page(source, cache, filters).await?;

    let t0 = std::time::Instant::now();
    let system = source.source_system();
    let batch = normalizers.normalize_page(&page, system);
    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    tracing::info!(
        target: "ingest",
        provider = source.name(),
        total = page.total_elements,
        accepted = batch.accepted(),
        rejected = batch.rejected(),
        cached,
        "search completed"
    );

    Ok(IngestReport {
        source: source.name(),
        system,
        total_elements: page.total_elements,
        cached,
        batch,
    })
}
