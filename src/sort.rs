//! Sort Engine: one key, explicit direction, stable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::tender::Tender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Deadline,
    Amount,
    PublishedAt,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deadline" => Some(SortKey::Deadline),
            "amount" | "budget" => Some(SortKey::Amount),
            "published_at" | "published" | "publish_date" => Some(SortKey::PublishedAt),
            _ => None,
        }
    }

    /// Dashboard defaults: soonest deadline first, largest amount first,
    /// newest publication first. The engine itself never applies these;
    /// call sites pass them explicitly.
    pub fn default_direction(self) -> Direction {
        match self {
            SortKey::Deadline => Direction::Ascending,
            SortKey::Amount => Direction::Descending,
            SortKey::PublishedAt => Direction::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Direction::Ascending),
            "desc" | "descending" => Some(Direction::Descending),
            _ => None,
        }
    }
}

fn compare(a: &Tender, b: &Tender, key: SortKey) -> Ordering {
    match key {
        SortKey::Deadline => a.deadline().cmp(&b.deadline()),
        SortKey::Amount => a.amount().total_cmp(&b.amount()),
        SortKey::PublishedAt => a.published_at().cmp(&b.published_at()),
    }
}

/// Returns a new ordering; equal keys keep their incoming relative order in
/// both directions, so sorting twice by the same key is a no-op.
pub fn sort<'a, I>(tenders: I, key: SortKey, direction: Direction) -> Vec<&'a Tender>
where
    I: IntoIterator<Item = &'a Tender>,
{
    let mut out: Vec<&'a Tender> = tenders.into_iter().collect();
    out.sort_by(|a, b| {
        let ord = compare(a, b, key);
        match direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    });
    out
}
