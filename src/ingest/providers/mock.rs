// src/ingest/providers/mock.rs
//! Deterministic stand-in for the disclosure feed.
//!
//! Produces recurring-service contract decisions in the disclosure record
//! shape (`ada`, `service`, `publish_date`, `budget`, ...), seeded so the same
//! seed and clock always give the same batch.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::ingest::normalize::DIAVGEIA_DECISION_BASE;
use crate::ingest::query::QueryFilters;
use crate::ingest::types::{FetchError, NoticePage, NoticeSource};
use crate::tender::SourceSystem;

pub const SERVICES: [&str; 18] = [
    "Καθαρισμός χώρων",
    "Φύλαξη (Security)",
    "Τεχνική Συντήρηση",
    "Συντήρηση Υποδομών (Η/Μ)",
    "Προμήθεια Αναλωσίμων",
    "Υπηρεσίες Logistics",
    "Συντήρηση Η/Υ & Λογισμικού",
    "Απολύμανση/Μυοκτονία",
    "Τηλεπικοινωνίες/Internet",
    "Μεταφορά Προσωπικού",
    "Λογιστικές Υπηρεσίες",
    "Ασφάλιση",
    "Εκπαίδευση Προσωπικού",
    "Νομικές Υπηρεσίες",
    "Πυρασφάλεια",
    "Εσωτερικός Έλεγχος",
    "Υπεύθυνος Προστασίας Δεδομένων (DPO)",
    "Ιατρός Εργασίας/Τεχνικός Ασφαλείας",
];

pub const ORGANIZATIONS: [&str; 12] = [
    "Υπουργείο Υγείας",
    "Δήμος Αθηναίων",
    "Περιφέρεια Αττικής",
    "ΕΛΣΤΑΤ",
    "ΕΦΚΑ",
    "Γενικό Νοσοκομείο Αθηνών",
    "ΔΕΗ Α.Ε.",
    "ΕΥΔΑΠ",
    "Πανεπιστήμιο Αθηνών",
    "Δήμος Θεσσαλονίκης",
    "Υπουργείο Παιδείας",
    "ΟΑΕΔ",
];

const ADA_ALPHABET: &str = "ΑΒΓΔΕΖΗΘΙΚΛΜΝΞΟΠΡΣΤΥΦΧΨΩ0123456789";

pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_COUNT: usize = 100;

/// Budget range (inclusive, euro) by service family.
fn budget_range(service: &str) -> (u32, u32) {
    if service.contains("Καθαρισμός") || service.contains("Φύλαξη") {
        (50_000, 500_000)
    } else if service.contains("Συντήρηση") {
        (30_000, 300_000)
    } else if service.contains("Λογιστικές") || service.contains("Νομικές") {
        (10_000, 100_000)
    } else {
        (15_000, 200_000)
    }
}

fn pick(chars: &[char], rng: &mut StdRng, n: usize) -> String {
    (0..n)
        .map(|_| *chars.choose(&mut *rng).unwrap_or(&'0'))
        .collect()
}

/// ADA-shaped decision id, e.g. `ΨΚ4Β46ΜΤΛΡ-ΑΒΓ`.
fn ada(rng: &mut StdRng) -> String {
    let chars: Vec<char> = ADA_ALPHABET.chars().collect();
    let head = pick(&chars, rng, 10);
    let tail = pick(&chars, rng, 3);
    format!("{head}-{tail}")
}

#[derive(Debug, Clone)]
pub struct MockDisclosureSource {
    days: u32,
    count: usize,
    seed: u64,
    now: Option<DateTime<Utc>>,
}

impl Default for MockDisclosureSource {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS, DEFAULT_COUNT, 0)
    }
}

impl MockDisclosureSource {
    pub fn new(days: u32, count: usize, seed: u64) -> Self {
        Self {
            days,
            count,
            seed,
            now: None,
        }
    }

    /// Pin the generator clock (tests); otherwise `Utc::now()` is used.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(&self) -> Vec<Value> {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(self.count);

        for _ in 0..self.count {
            let service = *SERVICES.choose(&mut rng).unwrap_or(&SERVICES[0]);
            let org = *ORGANIZATIONS.choose(&mut rng).unwrap_or(&ORGANIZATIONS[0]);

            let days_ago = rng.random_range(0..=self.days as i64);
            let published = now - Duration::days(days_ago);
            let deadline = published + Duration::days(rng.random_range(20..=60));

            let (lo, hi) = budget_range(service);
            let budget = rng.random_range(lo..=hi);
            let id = ada(&mut rng);

            out.push(json!({
                "ada": id,
                "title": format!("Ανοικτός Διαγωνισμός για {service} - {org}"),
                "service": service,
                "organization": org,
                "publish_date": published.format("%Y-%m-%d").to_string(),
                "deadline": deadline.format("%Y-%m-%d").to_string(),
                "budget": budget,
                "link": format!("{DIAVGEIA_DECISION_BASE}/{id}"),
            }));
        }
        out
    }
}

#[async_trait]
impl NoticeSource for MockDisclosureSource {
    async fn fetch_notices(&self, filters: &QueryFilters) -> Result<NoticePage, FetchError> {
        let mut content = self.generate();
        if let Some(needle) = filters.normalized().title {
            let needle = needle.to_lowercase();
            content.retain(|r| {
                r.get("title")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
            });
        }
        Ok(NoticePage {
            total_elements: content.len() as u64,
            content,
        })
    }

    fn name(&self) -> &'static str {
        "mock-disclosure"
    }

    fn source_system(&self) -> SourceSystem {
        SourceSystem::Disclosure
    }
}
