//! # Filter Engine
//! A `FilterSet` is a plain conjunction of independent predicates. Each
//! predicate looks at one field, so the order in which they are evaluated
//! never changes the result, and `apply` keeps the input order of whatever
//! passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tender::{Category, Status, Tender};
use crate::urgency::{Urgency, URGENT_WINDOW_DAYS};

/// Inclusive range. `lo > hi` is the empty range: it matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    pub lo: T,
    pub hi: T,
}

impl<T: PartialOrd + Copy> Range<T> {
    pub fn new(lo: T, hi: T) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, v: T) -> bool {
        self.lo <= v && v <= self.hi
    }

    pub fn is_empty(&self) -> bool {
        !(self.lo <= self.hi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Category(Category),
    Organization(String),
    Status(Status),
    DaysRemaining(Range<i64>),
    Amount(Range<f64>),
    Urgency(BTreeSet<Urgency>),
    /// Case-insensitive substring match on the title.
    TitleContains(String),
}

impl Predicate {
    pub fn matches(&self, t: &Tender, now: DateTime<Utc>) -> bool {
        match self {
            Predicate::Category(c) => t.category() == c,
            Predicate::Organization(o) => t.organization() == o,
            Predicate::Status(s) => t.status(now) == *s,
            Predicate::DaysRemaining(r) => r.contains(t.days_remaining(now)),
            Predicate::Amount(r) => r.contains(t.amount()),
            Predicate::Urgency(set) => set.contains(&t.urgency(now)),
            Predicate::TitleContains(needle) => t
                .title()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_predicates(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn push(&mut self, p: Predicate) {
        self.predicates.push(p);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn with_category(mut self, c: Category) -> Self {
        self.push(Predicate::Category(c));
        self
    }

    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.push(Predicate::Organization(org.into()));
        self
    }

    pub fn with_status(mut self, s: Status) -> Self {
        self.push(Predicate::Status(s));
        self
    }

    pub fn with_days_remaining(mut self, lo: i64, hi: i64) -> Self {
        self.push(Predicate::DaysRemaining(Range::new(lo, hi)));
        self
    }

    pub fn with_amount(mut self, lo: f64, hi: f64) -> Self {
        self.push(Predicate::Amount(Range::new(lo, hi)));
        self
    }

    pub fn with_urgency<I: IntoIterator<Item = Urgency>>(mut self, tiers: I) -> Self {
        self.push(Predicate::Urgency(tiers.into_iter().collect()));
        self
    }

    pub fn with_title(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if !needle.trim().is_empty() {
            self.push(Predicate::TitleContains(needle.trim().to_string()));
        }
        self
    }

    /// Urgent-alerts view: still open, at most `URGENT_WINDOW_DAYS` whole days left.
    pub fn urgent_alerts() -> Self {
        Self::new()
            .with_status(Status::Active)
            .with_days_remaining(0, URGENT_WINDOW_DAYS)
    }

    pub fn matches(&self, t: &Tender, now: DateTime<Utc>) -> bool {
        self.predicates.iter().all(|p| p.matches(t, now))
    }
}

/// Stable filter: survivors keep their relative input order.
pub fn apply<'a, I>(tenders: I, filters: &FilterSet, now: DateTime<Utc>) -> Vec<&'a Tender>
where
    I: IntoIterator<Item = &'a Tender>,
{
    tenders
        .into_iter()
        .filter(|t| filters.matches(t, now))
        .collect()
}
