use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Numeric view of a loosely typed cell. Anything that is not a finite number
/// or a numeric string counts as zero.
pub fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return 0.0;
            }
            s.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Reads the calendar date out of a timestamp cell and pins it to midnight.
///
/// Only strings are accepted. The date is whatever precedes the first `T` or
/// space, so `2024-03-05T10:22:00Z` and `2024-03-05 10:22:00` both land on
/// 2024-03-05 00:00:00 regardless of the time or zone that follows.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?;
    let date_part = raw.split(|c: char| c == 'T' || c == ' ').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `YYYY-MM-DD` for anything [`parse_timestamp`] understands, empty otherwise.
pub fn format_date(value: &Value) -> String {
    parse_timestamp(value)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn to_number_defaults_to_zero() {
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_number(&json!("")), 0.0);
        assert_eq!(to_number(&json!("abc")), 0.0);
        assert_eq!(to_number(&json!("NaN")), 0.0);
        assert_eq!(to_number(&json!("inf")), 0.0);
        assert_eq!(to_number(&json!(true)), 0.0);
        assert_eq!(to_number(&json!([1])), 0.0);
    }

    #[test]
    fn to_number_reads_numbers_and_numeric_strings() {
        assert_eq!(to_number(&json!("12.5")), 12.5);
        assert_eq!(to_number(&json!(" 7 ")), 7.0);
        assert_eq!(to_number(&json!(3)), 3.0);
        assert_eq!(to_number(&json!(-1.25)), -1.25);
    }

    #[test]
    fn format_date_accepts_iso_and_plain_dates() {
        assert_eq!(format_date(&json!("2024-03-05T10:22:00Z")), "2024-03-05");
        assert_eq!(format_date(&json!("2024-03-05")), "2024-03-05");
        assert_eq!(format_date(&json!("2024-03-05 10:22:00")), "2024-03-05");
    }

    #[test]
    fn format_date_blank_for_unparsable() {
        assert_eq!(format_date(&Value::Null), "");
        assert_eq!(format_date(&json!("")), "");
        assert_eq!(format_date(&json!("not-a-date")), "");
        assert_eq!(format_date(&json!(1709600000)), "");
    }

    #[test]
    fn display_text_drops_trailing_zero_fraction() {
        assert_eq!(display_text(&json!(100.0)), "100");
        assert_eq!(display_text(&json!(12.5)), "12.5");
        assert_eq!(display_text(&json!(42)), "42");
        assert_eq!(display_text(&Value::Null), "");
        assert_eq!(display_text(&json!("A,B")), "A,B");
    }
}
