use chrono::{NaiveDate, NaiveDateTime};

use super::coerce::{display_text, parse_timestamp};
use crate::model::PaymentRecord;

/// Search term plus an inclusive `imported_at` date range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub term: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty() && self.start.is_none() && self.end.is_none()
    }

    fn start_bound(&self) -> Option<NaiveDateTime> {
        self.start.and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn end_bound(&self) -> Option<NaiveDateTime> {
        self.end.and_then(|d| d.and_hms_opt(23, 59, 59))
    }
}

/// Parses an optional `YYYY-MM-DD` bound; blank input means "no bound".
pub fn parse_date_bound(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

fn search_text(record: &PaymentRecord) -> String {
    format!(
        "{} {} {}",
        display_text(&record.careem_captain_id),
        display_text(&record.name),
        display_text(&record.person_code)
    )
    .to_lowercase()
}

fn matches_term(record: &PaymentRecord, term: &str) -> bool {
    term.is_empty() || search_text(record).contains(term)
}

fn within_range(
    record: &PaymentRecord,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> bool {
    if start.is_none() && end.is_none() {
        return true;
    }
    let Some(imported) = parse_timestamp(&record.imported_at) else {
        return false;
    };
    if let Some(start) = start {
        if imported < start {
            return false;
        }
    }
    if let Some(end) = end {
        if imported > end {
            return false;
        }
    }
    true
}

/// Keeps the records that match both the search term and the date range,
/// in their original order. Never fails: odd values just don't match.
pub fn apply_filter(raw: &[PaymentRecord], criteria: &FilterCriteria) -> Vec<PaymentRecord> {
    let term = criteria.term.trim().to_lowercase();
    let start = criteria.start_bound();
    let end = criteria.end_bound();
    raw.iter()
        .filter(|r| matches_term(r, &term) && within_range(r, start, end))
        .cloned()
        .collect()
}
