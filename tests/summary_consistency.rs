// tests/summary_consistency.rs
//
// Aggregator: group counts add up to the total, group sums add up to the
// total amount, and urgent_count agrees with the alerts filter (open notices
// with 0..=7 whole days left).

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use tender_monitor::filter::apply;
use tender_monitor::summary::{amount_histogram, deadline_timeline, summarize};
use tender_monitor::tender::TenderDraft;
use tender_monitor::{AmountUnit, Category, FilterSet, SourceSystem, Tender, Urgency};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

fn due(id: &str, deadline: DateTime<Utc>) -> Tender {
    TenderDraft {
        id: id.into(),
        title: id.into(),
        category: Category::Service("Ασφάλιση".into()),
        organization: "ΕΦΚΑ".into(),
        published_at: now() - Duration::days(20),
        deadline,
        amount: 1_000.0,
        unit: AmountUnit::Euro,
        source_system: SourceSystem::Disclosure,
        detail_link: String::new(),
    }
    .build()
    .unwrap()
}

fn batch(seed: u64, n: usize) -> Vec<Tender> {
    let mut rng = StdRng::seed_from_u64(seed);
    let cats = ["Καθαρισμός χώρων", "Φύλαξη (Security)", "Ασφάλιση", "Πυρασφάλεια"];
    let orgs = ["ΕΦΚΑ", "ΕΥΔΑΠ", "ΔΕΗ Α.Ε.", "ΟΑΕΔ", "ΕΛΣΤΑΤ"];
    (0..n)
        .map(|i| {
            TenderDraft {
                id: format!("R{i}"),
                title: format!("r{i}"),
                category: Category::Service(cats.choose(&mut rng).unwrap().to_string()),
                organization: orgs.choose(&mut rng).unwrap().to_string(),
                published_at: now() - Duration::days(20),
                deadline: now() + Duration::minutes(rng.random_range(-60 * 24 * 10..60 * 24 * 30)),
                amount: rng.random_range(10_000..500_000) as f64,
                unit: AmountUnit::Euro,
                source_system: SourceSystem::Disclosure,
                detail_link: String::new(),
            }
            .build()
            .unwrap()
        })
        .collect()
}

#[test]
fn groups_partition_the_collection() {
    for seed in 0..10 {
        let tenders = batch(seed, 250);
        let s = summarize(&tenders, now());

        assert_eq!(s.count, tenders.len());
        assert_eq!(s.by_category.total_count(), s.count);
        assert_eq!(s.by_organization.total_count(), s.count);

        let cat_sum: f64 = s.by_category.rows().iter().map(|r| r.sum).sum();
        let org_sum: f64 = s.by_organization.rows().iter().map(|r| r.sum).sum();
        assert!((cat_sum - s.total_amount).abs() < 1e-6);
        assert!((org_sum - s.total_amount).abs() < 1e-6);

        assert!(s.urgent_count <= s.active_count);
        assert!(s.active_count <= s.count);
    }
}

#[test]
fn urgent_count_matches_alerts_view() {
    let tenders = batch(99, 400);
    let s = summarize(&tenders, now());
    let alerts = apply(&tenders, &FilterSet::urgent_alerts(), now());
    assert_eq!(s.urgent_count, alerts.len());

    let expected = tenders
        .iter()
        .filter(|t| t.is_active(now()) && (0..=7).contains(&t.days_remaining(now())))
        .count();
    assert_eq!(s.urgent_count, expected);
}

#[test]
fn urgent_window_counts_whole_days_left() {
    // 7d12h left floors to 7 days: urgent for counting, Warning for styling.
    let late_seventh = due("L", now() + Duration::days(7) + Duration::hours(12));
    assert_eq!(late_seventh.days_remaining(now()), 7);
    assert_eq!(late_seventh.urgency(now()), Urgency::Warning);

    let tenders = vec![
        due("T", now() + Duration::hours(2)),
        late_seventh,
        due("E", now() + Duration::days(8)),
        due("X", now() - Duration::hours(1)),
    ];
    let s = summarize(&tenders, now());
    assert_eq!(s.active_count, 3);
    assert_eq!(s.urgent_count, 2);

    let ids: Vec<&str> = apply(&tenders, &FilterSet::urgent_alerts(), now())
        .iter()
        .map(|t| t.id())
        .collect();
    assert_eq!(ids, vec!["T", "L"]);
}

#[test]
fn top_n_ranks_and_truncates() {
    let tenders = batch(4, 300);
    let s = summarize(&tenders, now());
    let top = s.by_organization.top_n_by_count(3);
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
    let by_sum = s.by_category.top_n_by_sum(10);
    assert_eq!(by_sum.len(), s.by_category.len());
    assert!(by_sum.windows(2).all(|w| w[0].sum >= w[1].sum));
}

#[test]
fn histogram_counts_every_amount() {
    let tenders = batch(8, 120);
    let bins = amount_histogram(&tenders, 20);
    assert_eq!(bins.len(), 20);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), tenders.len());
    assert!(amount_histogram(std::iter::empty::<&Tender>(), 20).is_empty());
}

#[test]
fn timeline_lists_open_notices_soonest_first() {
    let tenders = batch(12, 120);
    let rows = deadline_timeline(&tenders, now());
    let active = tenders.iter().filter(|t| t.is_active(now())).count();
    assert_eq!(rows.len(), active);
    assert!(rows.windows(2).all(|w| w[0].deadline <= w[1].deadline));
    assert!(rows.iter().all(|r| r.days_remaining >= 0));
}

#[test]
fn empty_collection_summarizes_to_zero() {
    let s = summarize(std::iter::empty::<&Tender>(), now());
    assert_eq!(s.count, 0);
    assert_eq!(s.total_amount, 0.0);
    assert!(s.by_category.is_empty());
}
