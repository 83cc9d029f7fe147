// tests/urgency_boundaries.rs
use chrono::{DateTime, Duration, TimeZone, Utc};

use tender_monitor::urgency::classify_deadline;
use tender_monitor::tender::TenderDraft;
use tender_monitor::{classify, AmountUnit, Category, SourceSystem, Status, Urgency};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 9, 30, 0).unwrap()
}

#[test]
fn tier_boundaries_belong_to_the_lower_tier() {
    let n = now();
    let cases = [
        (n - Duration::days(30), Urgency::Expired),
        (n - Duration::seconds(1), Urgency::Expired),
        (n, Urgency::Expired),
        (n + Duration::seconds(1), Urgency::Urgent),
        (n + Duration::days(7), Urgency::Urgent),
        (n + Duration::days(7) + Duration::seconds(1), Urgency::Warning),
        (n + Duration::days(14), Urgency::Warning),
        (n + Duration::days(14) + Duration::seconds(1), Urgency::Normal),
        (n + Duration::days(365), Urgency::Normal),
    ];
    for (deadline, expected) in cases {
        assert_eq!(classify_deadline(deadline, n), expected, "{deadline}");
    }
}

#[test]
fn derived_fields_agree_with_classifier() {
    let n = now();
    let make = |deadline| {
        TenderDraft {
            id: "X".into(),
            title: "X".into(),
            category: Category::Service("s".into()),
            organization: "o".into(),
            published_at: n - Duration::days(1),
            deadline,
            amount: 0.0,
            unit: AmountUnit::Euro,
            source_system: SourceSystem::Disclosure,
            detail_link: String::new(),
        }
        .build()
        .unwrap()
    };

    let at_now = make(n);
    assert_eq!(at_now.status(n), Status::Expired);
    assert_eq!(at_now.days_remaining(n), 0);
    assert_eq!(classify(&at_now, n), Urgency::Expired);

    let just_past = make(n - Duration::seconds(1));
    assert_eq!(just_past.days_remaining(n), -1);

    let seven = make(n + Duration::days(7));
    assert_eq!(seven.days_remaining(n), 7);
    assert_eq!(seven.status(n), Status::Active);
    assert_eq!(seven.urgency(n), Urgency::Urgent);

    let half_day = make(n + Duration::hours(12));
    assert_eq!(half_day.days_remaining(n), 0);
    assert_eq!(half_day.urgency(n), Urgency::Urgent);
}
