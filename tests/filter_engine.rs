// tests/filter_engine.rs
//
// Filter Engine properties over seeded random collections: commutativity,
// monotonicity (adding a predicate never grows the result), order
// preservation and empty-range handling.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use tender_monitor::filter::{apply, FilterSet, Predicate};
use tender_monitor::tender::TenderDraft;
use tender_monitor::{AmountUnit, Category, SourceSystem, Status, Tender, Urgency};

const CATEGORIES: [&str; 3] = ["Cleaning", "Security", "Maintenance"];
const ORGS: [&str; 3] = ["ΕΦΚΑ", "ΕΥΔΑΠ", "ΟΑΕΔ"];

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
}

fn random_tenders(seed: u64, n: usize) -> Vec<Tender> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let deadline = now() + Duration::hours(rng.random_range(-24 * 30..24 * 40));
            TenderDraft {
                id: format!("T{i}"),
                title: format!("Notice {i}"),
                category: Category::Service(CATEGORIES.choose(&mut rng).unwrap().to_string()),
                organization: ORGS.choose(&mut rng).unwrap().to_string(),
                published_at: deadline - Duration::days(30),
                deadline,
                amount: rng.random_range(0..200_000) as f64,
                unit: AmountUnit::Euro,
                source_system: SourceSystem::Disclosure,
                detail_link: String::new(),
            }
            .build()
            .unwrap()
        })
        .collect()
}

fn predicates() -> Vec<Predicate> {
    FilterSet::new()
        .with_category(Category::Service("Cleaning".into()))
        .with_status(Status::Active)
        .with_days_remaining(0, 20)
        .with_amount(10_000.0, 150_000.0)
        .with_organization("ΕΦΚΑ")
        .with_urgency([Urgency::Urgent, Urgency::Warning])
        .predicates()
        .to_vec()
}

fn ids(v: &[&Tender]) -> Vec<String> {
    v.iter().map(|t| t.id().to_string()).collect()
}

#[test]
fn predicate_order_does_not_matter() {
    for seed in 0..20 {
        let tenders = random_tenders(seed, 150);
        let mut preds = predicates();
        let forward = apply(&tenders, &FilterSet::from_predicates(preds.clone()), now());
        preds.reverse();
        let backward = apply(&tenders, &FilterSet::from_predicates(preds.clone()), now());
        assert_eq!(ids(&forward), ids(&backward), "seed {seed}");

        let mut rng = StdRng::seed_from_u64(seed);
        let mut shuffled = preds;
        rand::seq::SliceRandom::shuffle(shuffled.as_mut_slice(), &mut rng);
        let any = apply(&tenders, &FilterSet::from_predicates(shuffled), now());
        assert_eq!(ids(&forward), ids(&any), "seed {seed}");
    }
}

#[test]
fn adding_a_predicate_never_grows_the_result() {
    for seed in 0..20 {
        let tenders = random_tenders(seed, 150);
        let mut fs = FilterSet::new();
        let mut prev = apply(&tenders, &fs, now()).len();
        assert_eq!(prev, tenders.len());
        for p in predicates() {
            fs.push(p);
            let cur = apply(&tenders, &fs, now()).len();
            assert!(cur <= prev, "seed {seed}: {cur} > {prev}");
            prev = cur;
        }
    }
}

#[test]
fn filtering_twice_is_filtering_once() {
    let tenders = random_tenders(7, 200);
    let fs = FilterSet::from_predicates(predicates());
    let once = apply(&tenders, &fs, now());
    let twice = apply(once.iter().copied(), &fs, now());
    assert_eq!(ids(&once), ids(&twice));
}

#[test]
fn survivors_keep_input_order() {
    let tenders = random_tenders(11, 200);
    let fs = FilterSet::new().with_status(Status::Active);
    let out = apply(&tenders, &fs, now());
    let positions: Vec<usize> = out
        .iter()
        .map(|t| tenders.iter().position(|x| x.id() == t.id()).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn inverted_ranges_match_nothing() {
    let tenders = random_tenders(3, 100);
    assert!(apply(&tenders, &FilterSet::new().with_days_remaining(10, -10), now()).is_empty());
    assert!(apply(&tenders, &FilterSet::new().with_amount(5.0, 1.0), now()).is_empty());
}

#[test]
fn negative_day_ranges_select_expired() {
    let tenders = random_tenders(5, 200);
    let out = apply(&tenders, &FilterSet::new().with_days_remaining(-30, -1), now());
    assert!(!out.is_empty());
    assert!(out.iter().all(|t| t.status(now()) == Status::Expired));
}

#[test]
fn empty_input_gives_empty_output() {
    let none: Vec<Tender> = Vec::new();
    let fs = FilterSet::from_predicates(predicates());
    assert!(apply(&none, &fs, now()).is_empty());
    assert!(apply(&none, &FilterSet::new(), now()).is_empty());
}

#[test]
fn title_match_is_case_insensitive() {
    let tenders = random_tenders(1, 20);
    let out = apply(&tenders, &FilterSet::new().with_title("NOTICE 1"), now());
    let got = ids(&out);
    assert!(got.contains(&"T1".to_string()));
    assert!(got.contains(&"T10".to_string()));
    assert!(!got.contains(&"T2".to_string()));
}
