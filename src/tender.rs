//! # Tender
//! Canonical notice record produced by the normalizers and consumed by every
//! later stage (filter, sort, summary, export).
//!
//! A `Tender` is immutable once built: fields are private and only exposed
//! through accessors. Derived values (`days_remaining`, `status`, urgency) are
//! computed against an explicit `now` so the whole pipeline stays pure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ingest::normalize::NormalizationError;
use crate::urgency::{self, Urgency};

const SECONDS_PER_DAY: i64 = 86_400;

/// Which upstream produced the record. The two have disjoint raw field sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    /// Live tender API (KIMDIS-style notices).
    Procurement,
    /// Transparency/disclosure feed (Diavgeia-style decisions, staffing announcements).
    Disclosure,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::Procurement => "procurement",
            SourceSystem::Disclosure => "disclosure",
        }
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of the `amount` slot. Fixed per normalizer, so one batch never mixes units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountUnit {
    Euro,
    Positions,
}

impl AmountUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmountUnit::Euro => "EUR",
            AmountUnit::Positions => "positions",
        }
    }
}

/// Category domains are kept apart: a tender-API contract type is never
/// considered equal to a disclosure-feed service label, even with the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryDomain {
    ContractType,
    Service,
}

impl CategoryDomain {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contract_type" | "contract-type" | "contracttype" => Some(Self::ContractType),
            "service" => Some(Self::Service),
            _ => None,
        }
    }

    /// Domain a source's categories live in.
    pub fn for_system(system: SourceSystem) -> Self {
        match system {
            SourceSystem::Procurement => CategoryDomain::ContractType,
            SourceSystem::Disclosure => CategoryDomain::Service,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryDomain::ContractType => "contract_type",
            CategoryDomain::Service => "service",
        }
    }
}

/// Category label tagged with its domain. Equality is exact on both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "domain", content = "label", rename_all = "snake_case")]
pub enum Category {
    ContractType(String),
    Service(String),
}

impl Category {
    pub fn new(domain: CategoryDomain, label: impl Into<String>) -> Self {
        match domain {
            CategoryDomain::ContractType => Category::ContractType(label.into()),
            CategoryDomain::Service => Category::Service(label.into()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::ContractType(l) | Category::Service(l) => l,
        }
    }

    pub fn domain(&self) -> CategoryDomain {
        match self {
            Category::ContractType(_) => CategoryDomain::ContractType,
            Category::Service(_) => CategoryDomain::Service,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Expired,
}

impl Status {
    /// Accepts the dashboard's spellings; "all" and unknown values mean no status filter.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Some(Status::Active),
            "expired" | "closed" => Some(Status::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Expired => "expired",
        }
    }
}

/// Unvalidated field set. `build()` enforces the record invariants.
#[derive(Debug, Clone)]
pub struct TenderDraft {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub organization: String,
    pub published_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub amount: f64,
    pub unit: AmountUnit,
    pub source_system: SourceSystem,
    pub detail_link: String,
}

impl TenderDraft {
    pub fn build(self) -> Result<Tender, NormalizationError> {
        if self.id.trim().is_empty() {
            return Err(NormalizationError::MissingField("id"));
        }
        if self.title.trim().is_empty() {
            return Err(NormalizationError::MissingField("title"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(NormalizationError::BadAmount {
                field: "amount",
                value: self.amount.to_string(),
            });
        }
        Ok(Tender {
            id: self.id,
            title: self.title,
            category: self.category,
            organization: self.organization,
            published_at: self.published_at,
            deadline: self.deadline,
            amount: self.amount,
            unit: self.unit,
            source_system: self.source_system,
            detail_link: self.detail_link,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tender {
    id: String,
    title: String,
    category: Category,
    organization: String,
    published_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
    amount: f64,
    unit: AmountUnit,
    source_system: SourceSystem,
    detail_link: String,
}

impl Tender {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> AmountUnit {
        self.unit
    }

    pub fn source_system(&self) -> SourceSystem {
        self.source_system
    }

    pub fn detail_link(&self) -> &str {
        &self.detail_link
    }

    /// Whole days until the deadline, floored (one second late is -1).
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_seconds().div_euclid(SECONDS_PER_DAY)
    }

    pub fn status(&self, now: DateTime<Utc>) -> Status {
        if self.deadline > now {
            Status::Active
        } else {
            Status::Expired
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == Status::Active
    }

    pub fn urgency(&self, now: DateTime<Utc>) -> Urgency {
        urgency::classify_deadline(self.deadline, now)
    }
}
