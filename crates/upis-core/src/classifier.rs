//! Transaction classifier: message text -> optional transaction record.
//!
//! Rules:
//! - amount: first `Rs` (optionally `.`), optional ASCII whitespace, ASCII
//!   digits with an optional two-digit fraction
//! - kind: "credited" without "debited" is a credit, otherwise "debited" is a
//!   debit, anything else is unsupported phrasing

use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;

use crate::domain::{TransactionKind, TransactionRecord};

static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();

fn amount_re() -> &'static Regex {
    AMOUNT_RE.get_or_init(|| {
        Regex::new(r"Rs\.?[ \t\n\x0B\x0C\r]*([0-9]+(\.[0-9]{2})?)").expect("valid regex")
    })
}

/// Classify `text`, stamping the record with the local wall clock.
pub fn classify(text: &str) -> Option<TransactionRecord> {
    classify_at(text, Local::now().naive_local())
}

/// Deterministic core of [`classify`].
pub fn classify_at(text: &str, now: NaiveDateTime) -> Option<TransactionRecord> {
    let amount = extract_amount(text)?;
    let kind = resolve_kind(text)?;
    Some(TransactionRecord {
        amount,
        kind,
        timestamp: now,
    })
}

fn extract_amount(text: &str) -> Option<f64> {
    let caps = amount_re().captures(text)?;
    let amount = caps.get(1)?.as_str().parse::<f64>().ok()?;
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

// A message naming both words never reaches the credit branch.
fn resolve_kind(text: &str) -> Option<TransactionKind> {
    let credited = text.contains("credited");
    let debited = text.contains("debited");
    if credited && !debited {
        Some(TransactionKind::Credit)
    } else if debited {
        Some(TransactionKind::Debit)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn kind_and_amount(text: &str) -> Option<(TransactionKind, f64)> {
        classify_at(text, now()).map(|r| (r.kind, r.amount))
    }

    #[test]
    fn credited_message_is_credit() {
        assert_eq!(
            kind_and_amount("Your a/c is credited with Rs 123.45 by UPI"),
            Some((TransactionKind::Credit, 123.45))
        );
        assert_eq!(
            kind_and_amount("Rs.500.00 credited to your account"),
            Some((TransactionKind::Credit, 500.0))
        );
    }

    #[test]
    fn debited_message_is_debit() {
        assert_eq!(
            kind_and_amount("You have debited Rs. 75 for bill payment"),
            Some((TransactionKind::Debit, 75.0))
        );
    }

    #[test]
    fn both_words_resolve_to_debit() {
        assert_eq!(
            kind_and_amount("Rs 10.00 debited from A/c 1; Rs 10.00 credited to A/c 2"),
            Some((TransactionKind::Debit, 10.0))
        );
    }

    #[test]
    fn missing_amount_is_rejected() {
        assert_eq!(kind_and_amount("Your account was credited"), None);
        assert_eq!(kind_and_amount("INR 250 debited"), None);
        assert_eq!(kind_and_amount(""), None);
    }

    #[test]
    fn unsupported_phrasing_is_rejected() {
        assert_eq!(kind_and_amount("Rs 250 received from a friend"), None);
        // Word matching is case-sensitive.
        assert_eq!(kind_and_amount("Rs 250 CREDITED"), None);
    }

    #[test]
    fn zero_amount_is_rejected() {
        assert_eq!(kind_and_amount("Rs 0 credited"), None);
        assert_eq!(kind_and_amount("Rs.0.00 debited"), None);
    }

    #[test]
    fn first_amount_wins_and_partial_fraction_is_ignored() {
        assert_eq!(
            kind_and_amount("Rs 40 credited, balance Rs 900.00"),
            Some((TransactionKind::Credit, 40.0))
        );
        // Single fractional digit does not form a fraction; the integer part remains.
        assert_eq!(
            kind_and_amount("Rs 12.5 debited"),
            Some((TransactionKind::Debit, 12.0))
        );
    }

    #[test]
    fn only_ascii_digits_and_spaces_form_an_amount() {
        let cases: [(&str, Option<f64>); 5] = [
            ("Rs \u{96B}\u{966}\u{966} credited, ref Rs 100", Some(100.0)),
            ("Rs 5\u{966} credited", Some(5.0)),
            ("Rs\u{a0}500 credited", None),
            ("Rs\t250 credited", Some(250.0)),
            ("Rs\r\n42.00 credited", Some(42.0)),
        ];
        for (text, want) in cases {
            assert_eq!(
                classify_at(text, now()).map(|r| r.amount),
                want,
                "{text:?}"
            );
        }
    }

    #[test]
    fn overflowing_amount_is_rejected() {
        let text = format!("Rs {} credited", "9".repeat(400));
        assert_eq!(kind_and_amount(&text), None);
    }

    #[test]
    fn record_carries_classification_time() {
        let r = classify_at("Rs 1.00 credited", now()).unwrap();
        assert_eq!(r.formatted_timestamp(), "2024-01-15 10:30:00");
    }
}
