//! Urgency tiers derived from time-to-deadline.
//!
//! Tiers: `Expired` (deadline <= now), `Urgent` (<= 7 days left), `Warning`
//! (<= 14 days left), `Normal` otherwise. Boundaries belong to the lower tier.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tender::Tender;

pub const URGENT_WINDOW_DAYS: i64 = 7;
pub const WARNING_WINDOW_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Expired,
    Urgent,
    Warning,
    Normal,
}

impl Urgency {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expired" => Some(Urgency::Expired),
            "urgent" => Some(Urgency::Urgent),
            "warning" => Some(Urgency::Warning),
            "normal" => Some(Urgency::Normal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Expired => "expired",
            Urgency::Urgent => "urgent",
            Urgency::Warning => "warning",
            Urgency::Normal => "normal",
        }
    }
}

pub fn classify(tender: &Tender, now: DateTime<Utc>) -> Urgency {
    classify_deadline(tender.deadline(), now)
}

pub fn classify_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    if deadline <= now {
        return Urgency::Expired;
    }
    let left = deadline - now;
    if left <= Duration::days(URGENT_WINDOW_DAYS) {
        Urgency::Urgent
    } else if left <= Duration::days(WARNING_WINDOW_DAYS) {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}
