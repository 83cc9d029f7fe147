// tests/export_csv.rs
use chrono::{DateTime, Duration, TimeZone, Utc};

use tender_monitor::export::{to_csv, BOM, COLUMNS};
use tender_monitor::sort::sort;
use tender_monitor::tender::TenderDraft;
use tender_monitor::{AmountUnit, Category, Direction, SortKey, SourceSystem, Tender};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
}

fn tender(id: &str, title: &str, days: i64, amount: f64) -> Tender {
    TenderDraft {
        id: id.into(),
        title: title.into(),
        category: Category::Service("Καθαρισμός χώρων".into()),
        organization: "ΔΕΗ Α.Ε.".into(),
        published_at: now() - Duration::days(10),
        deadline: now() + Duration::days(days),
        amount,
        unit: AmountUnit::Euro,
        source_system: SourceSystem::Disclosure,
        detail_link: format!("https://diavgeia.gov.gr/decision/view/{id}"),
    }
    .build()
    .unwrap()
}

#[test]
fn header_rows_and_quoting() {
    let tenders = vec![
        tender("A1", "Καθαρισμός, κτιρίων \"Α\"", 3, 50_000.0),
        tender("B2", "Απλός τίτλος", -2, 1_234.5),
    ];
    let csv = to_csv(&tenders, now());

    assert!(csv.starts_with(BOM));
    let body = csv.trim_start_matches(BOM);
    let lines: Vec<&str> = body.split("\r\n").collect();
    assert_eq!(lines.len(), 4, "header + 2 rows + trailing empty");
    assert_eq!(lines[0], COLUMNS.join(","));
    assert_eq!(lines[3], "");

    assert_eq!(
        lines[1],
        "A1,\"Καθαρισμός, κτιρίων \"\"Α\"\"\",Καθαρισμός χώρων,ΔΕΗ Α.Ε.,2025-04-21,2025-05-04,3,active,urgent,50000,EUR,disclosure,https://diavgeia.gov.gr/decision/view/A1"
    );
    assert!(lines[2].starts_with("B2,Απλός τίτλος,"));
    assert!(lines[2].contains(",-2,expired,expired,1234.50,EUR,"));
}

#[test]
fn export_follows_the_given_order() {
    let tenders = vec![
        tender("late", "x", 20, 1.0),
        tender("soon", "y", 2, 2.0),
    ];
    let csv = to_csv(sort(&tenders, SortKey::Deadline, Direction::Ascending), now());
    let body = csv.trim_start_matches(BOM);
    let ids: Vec<&str> = body
        .split("\r\n")
        .skip(1)
        .filter(|l| !l.is_empty())
        .map(|l| l.split(',').next().unwrap())
        .collect();
    assert_eq!(ids, vec!["soon", "late"]);
}
