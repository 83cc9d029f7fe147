//! CSV export of the display projection.
//!
//! Output is UTF-8 with a leading BOM so spreadsheet tools pick the right
//! encoding for Greek text, CRLF line endings and RFC 4180 quoting.

use chrono::{DateTime, Utc};
use std::borrow::Cow;

use crate::tender::Tender;

pub const BOM: char = '\u{FEFF}';

pub const COLUMNS: [&str; 13] = [
    "id",
    "title",
    "category",
    "organization",
    "published_at",
    "deadline",
    "days_remaining",
    "status",
    "urgency",
    "amount",
    "unit",
    "source",
    "link",
];

fn escape_field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn format_amount(a: f64) -> String {
    if a.fract() == 0.0 {
        format!("{a:.0}")
    } else {
        format!("{a:.2}")
    }
}

fn push_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let line = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

pub fn to_csv<'a, I>(tenders: I, now: DateTime<Utc>) -> String
where
    I: IntoIterator<Item = &'a Tender>,
{
    let mut out = String::new();
    out.push(BOM);
    push_row(&mut out, &COLUMNS);

    for t in tenders {
        let row = [
            t.id().to_string(),
            t.title().to_string(),
            t.category().label().to_string(),
            t.organization().to_string(),
            t.published_at().format("%Y-%m-%d").to_string(),
            t.deadline().format("%Y-%m-%d").to_string(),
            t.days_remaining(now).to_string(),
            t.status(now).as_str().to_string(),
            t.urgency(now).as_str().to_string(),
            format_amount(t.amount()),
            t.unit().as_str().to_string(),
            t.source_system().as_str().to_string(),
            t.detail_link().to_string(),
        ];
        push_row(&mut out, &row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_and_commas() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn amounts_drop_trailing_zero_cents() {
        assert_eq!(format_amount(50_000.0), "50000");
        assert_eq!(format_amount(12.5), "12.50");
    }

    #[test]
    fn empty_export_is_bom_plus_header() {
        let csv = to_csv(std::iter::empty::<&Tender>(), Utc::now());
        assert!(csv.starts_with(BOM));
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.ends_with("link\r\n"));
    }
}
