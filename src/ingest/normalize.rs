// src/ingest/normalize.rs
//! Raw record -> canonical `Tender`.
//!
//! The two upstreams use different field names, nesting, date formats and
//! amount encodings. Each gets its own raw struct and its own `Normalizer`
//! implementation; nothing past this module looks at raw JSON.
//!
//! Batch normalization is partial-failure tolerant: rejected records are
//! reported (index, id if known, error) and the rest of the batch goes on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use metrics::counter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::ingest::normalize_text;
use crate::ingest::providers::kimdis;
use crate::ingest::types::NoticePage;
use crate::tender::{AmountUnit, Category, SourceSystem, Tender, TenderDraft};

pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";
pub const UNKNOWN_ORGANIZATION: &str = "Unknown";
pub const DIAVGEIA_DECISION_BASE: &str = "https://diavgeia.gov.gr/decision/view";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unparseable date in `{field}`: {value:?}")]
    BadDate { field: &'static str, value: String },
    #[error("invalid amount in `{field}`: {value:?}")]
    BadAmount { field: &'static str, value: String },
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("duplicate id `{0}` in batch")]
    DuplicateId(String),
}

impl NormalizationError {
    pub fn kind(&self) -> &'static str {
        match self {
            NormalizationError::MissingField(_) => "missing_field",
            NormalizationError::BadDate { .. } => "bad_date",
            NormalizationError::BadAmount { .. } => "bad_amount",
            NormalizationError::Malformed(_) => "malformed",
            NormalizationError::DuplicateId(_) => "duplicate_id",
        }
    }

    /// Offending field, when the error is about one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            NormalizationError::MissingField(f) => Some(f),
            NormalizationError::BadDate { field, .. } => Some(field),
            NormalizationError::BadAmount { field, .. } => Some(field),
            NormalizationError::Malformed(_) => None,
            NormalizationError::DuplicateId(_) => Some("id"),
        }
    }
}

/// A string label or a `{key, value}` pair, as the tender API nests lookups.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Labelled {
    Text(String),
    Keyed {
        #[serde(default)]
        key: Option<Value>,
        value: String,
    },
}

impl Labelled {
    pub fn label(&self) -> &str {
        match self {
            Labelled::Text(s) => s,
            Labelled::Keyed { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProcurementNotice {
    #[serde(default, alias = "adam")]
    pub reference_number: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub contract_type: Option<Labelled>,
    #[serde(default)]
    pub organization: Option<Labelled>,
    #[serde(default)]
    pub submission_date: Option<Value>,
    #[serde(default, alias = "deadline")]
    pub final_date: Option<Value>,
    #[serde(default, rename = "totalCostWithoutVAT", alias = "totalCost")]
    pub total_cost: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDisclosureRecord {
    #[serde(default)]
    pub ada: Option<Value>,
    #[serde(default, alias = "subject")]
    pub title: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub organization: Option<Labelled>,
    #[serde(default)]
    pub publish_date: Option<Value>,
    #[serde(default)]
    pub deadline: Option<Value>,
    #[serde(default)]
    pub budget: Option<Value>,
    #[serde(default)]
    pub positions: Option<Value>,
    #[serde(default)]
    pub link: Option<String>,
}

pub trait Normalizer {
    type Raw: DeserializeOwned;

    fn source_system(&self) -> SourceSystem;

    fn normalize(&self, raw: &Self::Raw) -> Result<Tender, NormalizationError>;

    /// Best-effort id for error reports, even when the record is rejected.
    fn raw_id(raw: &Self::Raw) -> Option<String>;

    fn normalize_value(&self, value: &Value) -> Result<Tender, NormalizationError> {
        let raw = Self::Raw::deserialize(value)
            .map_err(|e| NormalizationError::Malformed(e.to_string()))?;
        self.normalize(&raw)
    }
}

#[derive(Debug, Clone)]
pub struct ProcurementNormalizer {
    api_base: String,
}

impl ProcurementNormalizer {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
        }
    }
}

impl Normalizer for ProcurementNormalizer {
    type Raw = RawProcurementNotice;

    fn source_system(&self) -> SourceSystem {
        SourceSystem::Procurement
    }

    fn raw_id(raw: &Self::Raw) -> Option<String> {
        raw.reference_number.as_ref().and_then(id_from_value)
    }

    fn normalize(&self, raw: &Self::Raw) -> Result<Tender, NormalizationError> {
        let id = Self::raw_id(raw).ok_or(NormalizationError::MissingField("referenceNumber"))?;
        let title = required_text(raw.title.as_deref(), "title")?;
        let published_at = required_date(raw.submission_date.as_ref(), "submissionDate")?;
        let deadline = required_date(raw.final_date.as_ref(), "finalDate")?;
        let amount = required_amount(raw.total_cost.as_ref(), "totalCostWithoutVAT")?;

        let category = label_or(raw.contract_type.as_ref(), UNSPECIFIED_CATEGORY);
        let organization = label_or(raw.organization.as_ref(), UNKNOWN_ORGANIZATION);
        let detail_link = kimdis::attachment_url(&self.api_base, &id);

        TenderDraft {
            id,
            title,
            category: Category::ContractType(category),
            organization,
            published_at,
            deadline,
            amount,
            unit: AmountUnit::Euro,
            source_system: SourceSystem::Procurement,
            detail_link,
        }
        .build()
    }
}

#[derive(Debug, Clone)]
pub struct DisclosureNormalizer {
    unit: AmountUnit,
    decision_base: String,
}

impl DisclosureNormalizer {
    /// Budgets in euro (recurring-contract decisions).
    pub fn budgets() -> Self {
        Self {
            unit: AmountUnit::Euro,
            decision_base: DIAVGEIA_DECISION_BASE.to_string(),
        }
    }

    /// Position counts (staffing announcements).
    pub fn positions() -> Self {
        Self {
            unit: AmountUnit::Positions,
            decision_base: DIAVGEIA_DECISION_BASE.to_string(),
        }
    }

    pub fn with_decision_base(mut self, base: impl Into<String>) -> Self {
        self.decision_base = base.into();
        self
    }

    pub fn unit(&self) -> AmountUnit {
        self.unit
    }
}

impl Normalizer for DisclosureNormalizer {
    type Raw = RawDisclosureRecord;

    fn source_system(&self) -> SourceSystem {
        SourceSystem::Disclosure
    }

    fn raw_id(raw: &Self::Raw) -> Option<String> {
        raw.ada.as_ref().and_then(id_from_value)
    }

    fn normalize(&self, raw: &Self::Raw) -> Result<Tender, NormalizationError> {
        let id = Self::raw_id(raw).ok_or(NormalizationError::MissingField("ada"))?;
        let title = required_text(raw.title.as_deref(), "title")?;
        let published_at = required_date(raw.publish_date.as_ref(), "publish_date")?;
        let deadline = required_date(raw.deadline.as_ref(), "deadline")?;
        let amount = match self.unit {
            AmountUnit::Euro => required_amount(raw.budget.as_ref(), "budget")?,
            AmountUnit::Positions => required_amount(raw.positions.as_ref(), "positions")?,
        };

        let category = raw
            .service
            .as_deref()
            .map(normalize_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNSPECIFIED_CATEGORY.to_string());
        let organization = label_or(raw.organization.as_ref(), UNKNOWN_ORGANIZATION);
        let detail_link = raw
            .link
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/{}", self.decision_base.trim_end_matches('/'), id));

        TenderDraft {
            id,
            title,
            category: Category::Service(category),
            organization,
            published_at,
            deadline,
            amount,
            unit: self.unit,
            source_system: SourceSystem::Disclosure,
            detail_link,
        }
        .build()
    }
}

/// One normalizer per source system; `normalize(raw, system)` dispatches.
#[derive(Debug, Clone)]
pub struct Normalizers {
    pub procurement: ProcurementNormalizer,
    pub disclosure: DisclosureNormalizer,
}

impl Normalizers {
    pub fn new(api_base: impl Into<String>, disclosure: DisclosureNormalizer) -> Self {
        Self {
            procurement: ProcurementNormalizer::new(api_base),
            disclosure,
        }
    }

    pub fn normalize(
        &self,
        raw: &Value,
        system: SourceSystem,
    ) -> Result<Tender, NormalizationError> {
        match system {
            SourceSystem::Procurement => self.procurement.normalize_value(raw),
            SourceSystem::Disclosure => self.disclosure.normalize_value(raw),
        }
    }

    pub fn normalize_batch(&self, records: &[Value], system: SourceSystem) -> NormalizedBatch {
        match system {
            SourceSystem::Procurement => normalize_batch(&self.procurement, records),
            SourceSystem::Disclosure => normalize_batch(&self.disclosure, records),
        }
    }

    pub fn normalize_page(&self, page: &NoticePage, system: SourceSystem) -> NormalizedBatch {
        self.normalize_batch(&page.content, system)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordError {
    /// Position of the record in the raw batch.
    pub index: usize,
    pub id: Option<String>,
    pub error: NormalizationError,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub tenders: Vec<Tender>,
    pub errors: Vec<RecordError>,
}

impl NormalizedBatch {
    pub fn accepted(&self) -> usize {
        self.tenders.len()
    }

    pub fn rejected(&self) -> usize {
        self.errors.len()
    }
}

pub fn normalize_batch<N: Normalizer>(normalizer: &N, records: &[Value]) -> NormalizedBatch {
    let source = normalizer.source_system();
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut batch = NormalizedBatch {
        tenders: Vec::with_capacity(records.len()),
        errors: Vec::new(),
    };

    for (index, value) in records.iter().enumerate() {
        let outcome = normalizer.normalize_value(value).and_then(|t| {
            if seen.insert(t.id().to_string()) {
                Ok(t)
            } else {
                Err(NormalizationError::DuplicateId(t.id().to_string()))
            }
        });

        match outcome {
            Ok(t) => batch.tenders.push(t),
            Err(error) => {
                let id = N::Raw::deserialize(value).ok().and_then(|r| N::raw_id(&r));
                tracing::warn!(
                    target: "ingest",
                    source = source.as_str(),
                    index,
                    id = ?id,
                    kind = error.kind(),
                    error = %error,
                    "record rejected"
                );
                counter!("normalize_rejected_total", "kind" => error.kind()).increment(1);
                batch.errors.push(RecordError { index, id, error });
            }
        }
    }

    counter!("normalize_accepted_total").increment(batch.tenders.len() as u64);
    batch
}

fn id_from_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_text(s: Option<&str>, field: &'static str) -> Result<String, NormalizationError> {
    s.map(normalize_text)
        .filter(|t| !t.is_empty())
        .ok_or(NormalizationError::MissingField(field))
}

fn label_or(l: Option<&Labelled>, fallback: &str) -> String {
    l.map(|l| normalize_text(l.label()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn is_absent(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn required_date(
    v: Option<&Value>,
    field: &'static str,
) -> Result<DateTime<Utc>, NormalizationError> {
    if is_absent(v) {
        return Err(NormalizationError::MissingField(field));
    }
    let v = v.ok_or(NormalizationError::MissingField(field))?;
    parse_timestamp(v).ok_or_else(|| NormalizationError::BadDate {
        field,
        value: display_value(v),
    })
}

fn required_amount(v: Option<&Value>, field: &'static str) -> Result<f64, NormalizationError> {
    if is_absent(v) {
        return Err(NormalizationError::MissingField(field));
    }
    let v = v.ok_or(NormalizationError::MissingField(field))?;
    parse_amount(v)
        .filter(|a| a.is_finite() && *a >= 0.0)
        .ok_or_else(|| NormalizationError::BadAmount {
            field,
            value: display_value(v),
        })
}

fn display_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Accepts RFC 3339, naive ISO datetimes (read as UTC), date-only strings
/// (midnight UTC) and epoch milliseconds as a JSON number.
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for f in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(ndt.and_utc());
        }
    }
    for f in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, f) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
        }
    }
    None
}

/// JSON numbers, or strings like `50000`, `50000.50`, `50.000,50`, `€ 1,200`.
pub fn parse_amount(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

pub fn parse_amount_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('€')
        .trim_end_matches('€')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');
    let canonical = match (last_dot, last_comma) {
        // Both present: the later one is the decimal separator.
        (Some(d), Some(c)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(c)) => {
            let decimals = cleaned.len() - c - 1;
            if cleaned.matches(',').count() == 1 && decimals <= 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(d), None) => {
            let decimals = cleaned.len() - d - 1;
            if cleaned.matches('.').count() > 1 || decimals == 3 {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };
    canonical.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_in_every_supported_shape() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        for s in [
            "2025-03-01",
            "01/03/2025",
            "2025-03-01T00:00:00",
            "2025-03-01 00:00:00",
            "2025-03-01T00:00:00Z",
            "2025-03-01T02:00:00+02:00",
            "2025-03-01T00:00:00.000",
        ] {
            assert_eq!(parse_timestamp_str(s), Some(expected), "format {s}");
        }
        assert_eq!(parse_timestamp(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse_timestamp_str("31/02/2025"), None);
        assert_eq!(parse_timestamp_str("next week"), None);
    }

    #[test]
    fn amounts_with_local_grouping() {
        assert_eq!(parse_amount_str("50000"), Some(50_000.0));
        assert_eq!(parse_amount_str("50.000,50"), Some(50_000.5));
        assert_eq!(parse_amount_str("50,000.50"), Some(50_000.5));
        assert_eq!(parse_amount_str("€ 1.200"), Some(1_200.0));
        assert_eq!(parse_amount_str("12,5"), Some(12.5));
        assert_eq!(parse_amount_str("12.5"), Some(12.5));
        assert_eq!(parse_amount_str("abc"), None);
        assert_eq!(parse_amount(&json!(true)), None);
    }

    #[test]
    fn labelled_accepts_text_or_keyed() {
        let a: Labelled = serde_json::from_value(json!("Υπηρεσίες")).unwrap();
        let b: Labelled = serde_json::from_value(json!({"key": 2, "value": "Υπηρεσίες"})).unwrap();
        assert_eq!(a.label(), b.label());
    }

    #[test]
    fn error_kinds_and_fields() {
        let e = NormalizationError::BadDate {
            field: "deadline",
            value: "x".into(),
        };
        assert_eq!(e.kind(), "bad_date");
        assert_eq!(e.field(), Some("deadline"));
        assert_eq!(NormalizationError::Malformed("x".into()).field(), None);
    }
}
