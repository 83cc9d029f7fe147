//! # Aggregator
//! Counts, sums and group-bys over a (filtered) tender collection, plus the
//! chart-ready projections used by the dashboard: top-N tables, an amount
//! histogram and the deadline timeline of open notices.
//!
//! Everything here reads `&Tender` and returns a fresh snapshot; nothing is
//! cached or updated incrementally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::tender::Tender;
use crate::urgency::URGENT_WINDOW_DAYS;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub label: String,
    pub count: usize,
    pub sum: f64,
}

/// Label -> running (count, sum), iterated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupTable {
    rows: Vec<GroupRow>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, amount: f64) {
        let idx = match self.index.get(label) {
            Some(&i) => i,
            None => {
                self.rows.push(GroupRow {
                    label: label.to_string(),
                    count: 0,
                    sum: 0.0,
                });
                self.index.insert(label.to_string(), self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        let row = &mut self.rows[idx];
        row.count += 1;
        row.sum += amount;
    }

    pub fn get(&self, label: &str) -> Option<&GroupRow> {
        self.index.get(label).map(|&i| &self.rows[i])
    }

    pub fn rows(&self) -> &[GroupRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_count(&self) -> usize {
        self.rows.iter().map(|r| r.count).sum()
    }

    /// Ranked by count, descending; ties keep first-seen order.
    pub fn top_n_by_count(&self, n: usize) -> Vec<GroupRow> {
        let mut ranked = self.rows.clone();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(n);
        ranked
    }

    /// Ranked by summed amount, descending; ties keep first-seen order.
    pub fn top_n_by_sum(&self, n: usize) -> Vec<GroupRow> {
        let mut ranked = self.rows.clone();
        ranked.sort_by(|a, b| b.sum.total_cmp(&a.sum));
        ranked.truncate(n);
        ranked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub active_count: usize,
    pub urgent_count: usize,
    pub total_amount: f64,
    pub by_category: GroupTable,
    pub by_organization: GroupTable,
}

pub fn summarize<'a, I>(tenders: I, now: DateTime<Utc>) -> Summary
where
    I: IntoIterator<Item = &'a Tender>,
{
    let mut summary = Summary {
        count: 0,
        active_count: 0,
        urgent_count: 0,
        total_amount: 0.0,
        by_category: GroupTable::new(),
        by_organization: GroupTable::new(),
    };

    for t in tenders {
        summary.count += 1;
        summary.total_amount += t.amount();
        if t.is_active(now) {
            summary.active_count += 1;
            if (0..=URGENT_WINDOW_DAYS).contains(&t.days_remaining(now)) {
                summary.urgent_count += 1;
            }
        }
        summary.by_category.add(t.category().label(), t.amount());
        summary.by_organization.add(t.organization(), t.amount());
    }

    summary
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width buckets over `[min, max]` of the amounts. The last bucket is
/// closed on the right so the maximum lands in it.
pub fn amount_histogram<'a, I>(tenders: I, bins: usize) -> Vec<HistogramBin>
where
    I: IntoIterator<Item = &'a Tender>,
{
    let amounts: Vec<f64> = tenders.into_iter().map(|t| t.amount()).collect();
    if amounts.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
    let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            lo: min,
            hi: max,
            count: amounts.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lo: min + width * i as f64,
            hi: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for a in amounts {
        let idx = (((a - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub id: String,
    pub deadline: DateTime<Utc>,
    pub category: String,
    pub organization: String,
    pub amount: f64,
    pub days_remaining: i64,
}

/// Open notices ordered by deadline, soonest first.
pub fn deadline_timeline<'a, I>(tenders: I, now: DateTime<Utc>) -> Vec<TimelineRow>
where
    I: IntoIterator<Item = &'a Tender>,
{
    let open: Vec<&Tender> = tenders.into_iter().filter(|t| t.is_active(now)).collect();
    crate::sort::sort(
        open,
        crate::sort::SortKey::Deadline,
        crate::sort::Direction::Ascending,
    )
    .into_iter()
    .map(|t| TimelineRow {
        id: t.id().to_string(),
        deadline: t.deadline(),
        category: t.category().label().to_string(),
        organization: t.organization().to_string(),
        amount: t.amount(),
        days_remaining: t.days_remaining(now),
    })
    .collect()
}
