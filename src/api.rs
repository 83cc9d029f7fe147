// src/api.rs
//! JSON surface over the current tender collection.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::export;
use crate::filter::{self, FilterSet};
use crate::ingest::{
    self,
    cache::QueryCache,
    lookup::{OrganizationEntry, OrganizationLookup},
    normalize::{DisclosureNormalizer, Normalizers, RecordError},
    providers::MockDisclosureSource,
    query::QueryFilters,
    types::{FetchError, NoticeSource},
    IngestReport,
};
use crate::session::{Origin, Session, Snapshot};
use crate::sort::{self, Direction, SortKey};
use crate::summary::{self, GroupRow, HistogramBin, Summary, TimelineRow};
use crate::tender::{Category, CategoryDomain, SourceSystem, Status, Tender};
use crate::urgency::Urgency;

const MAX_GENERATE_COUNT: usize = 10_000;
const HISTOGRAM_BINS: usize = 20;
const TOP_ORGANIZATIONS: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub live: Arc<dyn NoticeSource>,
    pub normalizers: Arc<Normalizers>,
    pub cache: Arc<QueryCache>,
    pub lookup: Arc<OrganizationLookup>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, live: Arc<dyn NoticeSource>, lookup: OrganizationLookup) -> Self {
        let disclosure =
            DisclosureNormalizer::budgets().with_decision_base(config.disclosure_base.clone());
        Self {
            session: Arc::new(Session::new()),
            live,
            normalizers: Arc::new(Normalizers::new(config.api_base.clone(), disclosure)),
            cache: Arc::new(QueryCache::new(config.cache_ttl())),
            lookup: Arc::new(lookup),
            config: Arc::new(config),
        }
    }

    /// One live search through the cache. Failures keep (or blank) the
    /// collection and are reported in the body.
    pub async fn search(&self, filters: &QueryFilters) -> RefreshResponse {
        let ticket = self.session.begin_search();
        let source = self.live.as_ref();
        let outcome =
            ingest::run_once(source, &self.normalizers, Some(self.cache.as_ref()), filters).await;
        let now = Utc::now();

        match outcome {
            Ok(report) => {
                let mut resp = RefreshResponse::from_report(&report);
                let snapshot =
                    Snapshot::from_report(report, Origin::Live { source: source.name() }, now);
                resp.installed = self.session.complete_search(ticket, snapshot);
                resp
            }
            Err(e) => {
                let message = format!("search failed: {e}");
                let installed =
                    self.session
                        .fail_search(ticket, source.source_system(), message.clone(), now);
                RefreshResponse::failed(source.name(), &e, message, installed)
            }
        }
    }

    /// Replace the collection with a freshly generated mock batch.
    pub async fn regenerate(&self, days: u32, count: usize, seed: u64) -> RefreshResponse {
        let mock = MockDisclosureSource::new(days, count.min(MAX_GENERATE_COUNT), seed);
        match ingest::run_once(&mock, &self.normalizers, None, &QueryFilters::default()).await {
            Ok(report) => {
                let mut resp = RefreshResponse::from_report(&report);
                self.session.install_mock(Snapshot::from_report(
                    report,
                    Origin::Mock { seed },
                    Utc::now(),
                ));
                resp.installed = true;
                resp
            }
            Err(e) => {
                let message = format!("mock generation failed: {e}");
                RefreshResponse::failed(mock.name(), &e, message, false)
            }
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        self.session.current().unwrap_or_else(|| {
            Arc::new(Snapshot::empty(
                SourceSystem::Disclosure,
                "no data yet: run a search or generate a batch",
                Utc::now(),
            ))
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/search", post(search))
        .route("/generate", post(generate))
        .route("/tenders", get(tenders))
        .route("/summary", get(summary_view))
        .route("/alerts", get(alerts))
        .route("/export.csv", get(export_csv))
        .route("/organizations/lookup", get(lookup_organization))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown sort key '{0}'")]
    BadSort(String),
    #[error("unknown sort direction '{0}'")]
    BadDirection(String),
    #[error("unknown urgency tier '{0}'")]
    BadUrgency(String),
    #[error("unknown category domain '{0}'")]
    BadCategoryDomain(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(target: "api", error = %self, "rejected view parameters");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

// ---------- request/response shapes ----------

#[derive(Debug, Serialize)]
pub struct RecordErrorView {
    pub index: usize,
    pub id: Option<String>,
    pub kind: &'static str,
    pub field: Option<&'static str>,
    pub message: String,
}

impl From<&RecordError> for RecordErrorView {
    fn from(e: &RecordError) -> Self {
        Self {
            index: e.index,
            id: e.id.clone(),
            kind: e.error.kind(),
            field: e.error.field(),
            message: e.error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FetchErrorView {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub source: &'static str,
    pub total_elements: u64,
    pub accepted: usize,
    pub rejected: Vec<RecordErrorView>,
    pub cached: bool,
    /// False when a newer search won the race.
    pub installed: bool,
    pub error: Option<FetchErrorView>,
    pub status: Option<String>,
}

impl RefreshResponse {
    fn from_report(report: &IngestReport) -> Self {
        Self {
            source: report.source,
            total_elements: report.total_elements,
            accepted: report.batch.accepted(),
            rejected: report.batch.errors.iter().map(Into::into).collect(),
            cached: report.cached,
            installed: false,
            error: None,
            status: None,
        }
    }

    fn failed(source: &'static str, e: &FetchError, status: String, installed: bool) -> Self {
        Self {
            source,
            total_elements: 0,
            accepted: 0,
            rejected: Vec::new(),
            cached: false,
            installed,
            error: Some(FetchErrorView {
                kind: e.kind(),
                message: e.to_string(),
            }),
            status: Some(status),
        }
    }
}

/// Tender plus the fields derived against `now`.
#[derive(Debug, Serialize)]
pub struct TenderView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub category: &'a str,
    pub category_domain: &'static str,
    pub organization: &'a str,
    pub published_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub amount: f64,
    pub unit: &'static str,
    pub source: &'static str,
    pub link: &'a str,
    pub days_remaining: i64,
    pub status: &'static str,
    pub urgency: &'static str,
}

impl<'a> TenderView<'a> {
    pub fn new(t: &'a Tender, now: DateTime<Utc>) -> Self {
        Self {
            id: t.id(),
            title: t.title(),
            category: t.category().label(),
            category_domain: t.category().domain().as_str(),
            organization: t.organization(),
            published_at: t.published_at(),
            deadline: t.deadline(),
            amount: t.amount(),
            unit: t.unit().as_str(),
            source: t.source_system().as_str(),
            link: t.detail_link(),
            days_remaining: t.days_remaining(now),
            status: t.status(now).as_str(),
            urgency: t.urgency(now).as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CollectionMeta<'a> {
    origin: &'a Origin,
    refreshed_at: DateTime<Utc>,
    stale: bool,
    status: Option<&'a str>,
}

impl<'a> CollectionMeta<'a> {
    fn of(s: &'a Snapshot) -> Self {
        Self {
            origin: &s.origin,
            refreshed_at: s.refreshed_at,
            stale: s.stale,
            status: s.status.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TendersResponse<'a> {
    #[serde(flatten)]
    meta: CollectionMeta<'a>,
    count: usize,
    tenders: Vec<TenderView<'a>>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse<'a> {
    #[serde(flatten)]
    meta: CollectionMeta<'a>,
    summary: Summary,
    top_organizations: Vec<GroupRow>,
    category_counts: Vec<GroupRow>,
    amount_histogram: Vec<HistogramBin>,
    timeline: Vec<TimelineRow>,
}

/// Filter and sort parameters shared by the read-only views.
#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    pub category: Option<String>,
    pub category_domain: Option<String>,
    pub organization: Option<String>,
    pub status: Option<String>,
    pub days_min: Option<i64>,
    pub days_max: Option<i64>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    /// Comma-separated tiers, e.g. `urgent,warning`.
    pub urgency: Option<String>,
    pub title: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ViewParams {
    /// Category labels without an explicit domain are read in the domain of
    /// the collection's source.
    pub fn filters(&self, system: SourceSystem) -> Result<FilterSet, ApiError> {
        let mut fs = FilterSet::new();

        if let Some(label) = non_blank(&self.category) {
            let domain = match non_blank(&self.category_domain) {
                Some(d) => CategoryDomain::parse(d)
                    .ok_or_else(|| ApiError::BadCategoryDomain(d.to_string()))?,
                None => CategoryDomain::for_system(system),
            };
            fs = fs.with_category(Category::new(domain, label));
        }
        if let Some(org) = non_blank(&self.organization) {
            fs = fs.with_organization(org);
        }
        if let Some(status) = non_blank(&self.status).and_then(Status::parse) {
            fs = fs.with_status(status);
        }
        if self.days_min.is_some() || self.days_max.is_some() {
            fs = fs.with_days_remaining(
                self.days_min.unwrap_or(i64::MIN),
                self.days_max.unwrap_or(i64::MAX),
            );
        }
        if self.amount_min.is_some() || self.amount_max.is_some() {
            fs = fs.with_amount(
                self.amount_min.unwrap_or(f64::NEG_INFINITY),
                self.amount_max.unwrap_or(f64::INFINITY),
            );
        }
        if let Some(raw) = non_blank(&self.urgency) {
            let tiers = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Urgency::parse(s).ok_or_else(|| ApiError::BadUrgency(s.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            fs = fs.with_urgency(tiers);
        }
        if let Some(needle) = non_blank(&self.title) {
            fs = fs.with_title(needle);
        }
        Ok(fs)
    }

    /// Deadline when no key is given; the key's default direction when no
    /// direction is given.
    pub fn ordering(&self) -> Result<(SortKey, Direction), ApiError> {
        let key = match non_blank(&self.sort) {
            Some(s) => SortKey::parse(s).ok_or_else(|| ApiError::BadSort(s.to_string()))?,
            None => SortKey::Deadline,
        };
        let direction = match non_blank(&self.direction) {
            Some(d) => Direction::parse(d).ok_or_else(|| ApiError::BadDirection(d.to_string()))?,
            None => key.default_direction(),
        };
        Ok((key, direction))
    }
}

// ---------- handlers ----------

async fn search(
    State(state): State<AppState>,
    Json(filters): Json<QueryFilters>,
) -> Json<RefreshResponse> {
    Json(state.search(&filters).await)
}

#[derive(Debug, Deserialize)]
struct GenerateParams {
    days: Option<u32>,
    count: Option<usize>,
    seed: Option<u64>,
}

async fn generate(
    State(state): State<AppState>,
    Query(q): Query<GenerateParams>,
) -> Json<RefreshResponse> {
    let mock = &state.config.mock;
    let resp = state
        .regenerate(
            q.days.filter(|d| *d > 0).unwrap_or(mock.days),
            q.count.unwrap_or(mock.count),
            q.seed.unwrap_or(mock.seed),
        )
        .await;
    tracing::info!(target: "api", accepted = resp.accepted, "mock batch regenerated");
    Json(resp)
}

async fn tenders(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let snap = state.snapshot();
    let now = Utc::now();
    let filters = params.filters(snap.system)?;
    let (key, direction) = params.ordering()?;

    let rows = sort::sort(filter::apply(&snap.tenders, &filters, now), key, direction);
    let body = TendersResponse {
        meta: CollectionMeta::of(&snap),
        count: rows.len(),
        tenders: rows.into_iter().map(|t| TenderView::new(t, now)).collect(),
    };
    Ok(Json(body).into_response())
}

async fn summary_view(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let snap = state.snapshot();
    let now = Utc::now();
    let filters = params.filters(snap.system)?;
    let rows = filter::apply(&snap.tenders, &filters, now);

    let summary = summary::summarize(rows.iter().copied(), now);
    let body = SummaryResponse {
        meta: CollectionMeta::of(&snap),
        top_organizations: summary.by_organization.top_n_by_count(TOP_ORGANIZATIONS),
        category_counts: summary.by_category.top_n_by_count(summary.by_category.len()),
        amount_histogram: summary::amount_histogram(rows.iter().copied(), HISTOGRAM_BINS),
        timeline: summary::deadline_timeline(rows.iter().copied(), now),
        summary,
    };
    Ok(Json(body).into_response())
}

async fn alerts(State(state): State<AppState>) -> Response {
    let snap = state.snapshot();
    let now = Utc::now();
    let rows = sort::sort(
        filter::apply(&snap.tenders, &FilterSet::urgent_alerts(), now),
        SortKey::Deadline,
        Direction::Ascending,
    );
    let body = TendersResponse {
        meta: CollectionMeta::of(&snap),
        count: rows.len(),
        tenders: rows.into_iter().map(|t| TenderView::new(t, now)).collect(),
    };
    Json(body).into_response()
}

async fn export_csv(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Response, ApiError> {
    let snap = state.snapshot();
    let now = Utc::now();
    let filters = params.filters(snap.system)?;
    let (key, direction) = params.ordering()?;

    let rows = sort::sort(filter::apply(&snap.tenders, &filters, now), key, direction);
    let csv = export::to_csv(rows, now);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tenders.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct LookupParams {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Serialize)]
struct LookupResponse<'a> {
    name: String,
    found: bool,
    entry: Option<&'a OrganizationEntry>,
    /// Tenders in the current collection issued by this organization.
    tenders: usize,
}

async fn lookup_organization(
    State(state): State<AppState>,
    Query(q): Query<LookupParams>,
) -> Response {
    let entry = state.lookup.find(&q.name);
    let snap = state.snapshot();
    let matched = entry.map(|e| e.name.as_str()).unwrap_or(q.name.trim());
    let tenders = snap
        .tenders
        .iter()
        .filter(|t| t.organization() == matched)
        .count();

    let body = LookupResponse {
        name: q.name.trim().to_string(),
        found: entry.is_some(),
        entry,
        tenders,
    };
    Json(body).into_response()
}
