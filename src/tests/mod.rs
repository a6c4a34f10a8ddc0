
use serde_json::json;

use crate::dashboard::{Dashboard, Panel, ADMINS_ONLY};
use crate::engine::{apply_filter, compute_grand_totals, format_date, to_number, FilterCriteria};
use crate::model::{NumericField, PaymentRecord, Role};
use crate::output::{export_payments, ExportError, ExportFormat, PdfFonts, NO_DATA_MESSAGE};
use crate::session::Session;

use fake::FakeGateway;

fn sample_rows() -> Vec<PaymentRecord> {
    serde_json::from_value(json!([
        {"sno": 1, "careem_captain_id": "CPT-100", "name": "Ali Raza", "person_code": "P1",
         "imported_at": "2024-01-01T09:00:00", "net_salary": 1200, "total_working_hours": "160.5"},
        {"sno": 2, "careem_captain_id": "CPT-200", "name": "Sara Malik", "person_code": "P2",
         "imported_at": "2024-02-15 12:30:00", "net_salary": "980.25", "total_working_hours": 140},
        {"sno": 3, "careem_captain_id": "CPT-300", "name": "Omar Ali", "person_code": null,
         "imported_at": "2024-03-20", "net_salary": null, "total_working_hours": "n/a"},
        {"sno": 4, "careem_captain_id": 400, "name": "Hina", "person_code": "P4",
         "imported_at": "garbage", "net_salary": 15.75}
    ]))
    .unwrap()
}

fn criteria_grid() -> Vec<FilterCriteria> {
    let date = |y, m, d| chrono::NaiveDate::from_ymd_opt(y, m, d);
    vec![
        FilterCriteria {
            term: "ali".to_string(),
            ..Default::default()
        },
        FilterCriteria {
            term: "  CPT-2 ".to_string(),
            ..Default::default()
        },
        FilterCriteria {
            start: date(2024, 2, 1),
            ..Default::default()
        },
        FilterCriteria {
            end: date(2024, 2, 15),
            ..Default::default()
        },
        FilterCriteria {
            term: "p".to_string(),
            start: date(2024, 1, 1),
            end: date(2024, 3, 20),
        },
        FilterCriteria {
            term: "nobody".to_string(),
            ..Default::default()
        },
    ]
}

#[test]
fn empty_criteria_is_identity() {
    let rows = sample_rows();
    assert_eq!(apply_filter(&rows, &FilterCriteria::default()), rows);
}

#[test]
fn filter_only_keeps_existing_rows_in_order() {
    let rows = sample_rows();
    for criteria in criteria_grid() {
        let filtered = apply_filter(&rows, &criteria);
        let mut cursor = rows.iter();
        for kept in &filtered {
            assert!(
                cursor.any(|r| r == kept),
                "row not in source order for {criteria:?}"
            );
        }
    }
}

#[test]
fn filter_is_idempotent() {
    let rows = sample_rows();
    for criteria in criteria_grid() {
        let once = apply_filter(&rows, &criteria);
        assert_eq!(apply_filter(&once, &criteria), once, "{criteria:?}");
    }
}

#[test]
fn totals_ignore_row_order() {
    let rows = sample_rows();
    let mut reversed = rows.clone();
    reversed.reverse();
    let mut rotated = rows.clone();
    rotated.rotate_left(2);

    let base = compute_grand_totals(&rows);
    for other in [compute_grand_totals(&reversed), compute_grand_totals(&rotated)] {
        for field in NumericField::ALL {
            assert!((base.get(field) - other.get(field)).abs() < 1e-9, "{field:?}");
        }
    }
    assert!((base.get(NumericField::NetSalary) - 2196.0).abs() < 1e-9);
    assert!((base.get(NumericField::TotalWorkingHours) - 300.5).abs() < 1e-9);
}

#[test]
fn date_and_number_coercion() {
    assert_eq!(format_date(&json!("2024-03-05T10:22:00Z")), "2024-03-05");
    assert_eq!(format_date(&json!("2024-03-05")), "2024-03-05");
    assert_eq!(format_date(&json!(null)), "");
    assert_eq!(format_date(&json!("")), "");
    assert_eq!(format_date(&json!("not-a-date")), "");

    assert_eq!(to_number(&json!(null)), 0.0);
    assert_eq!(to_number(&json!("")), 0.0);
    assert_eq!(to_number(&json!("12.5")), 12.5);
    assert_eq!(to_number(&json!("abc")), 0.0);
}

#[test]
fn start_date_keeps_later_rows_in_order() {
    let rows: Vec<PaymentRecord> = serde_json::from_value(json!([
        {"careem_captain_id": "A", "imported_at": "2024-01-01"},
        {"careem_captain_id": "B", "imported_at": "2024-02-15"},
        {"careem_captain_id": "C", "imported_at": "2024-03-20"}
    ]))
    .unwrap();
    let criteria = FilterCriteria {
        start: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
        ..Default::default()
    };
    let filtered = apply_filter(&rows, &criteria);
    assert_eq!(filtered, rows[1..].to_vec());
}

#[test]
fn csv_keeps_comma_inside_one_cell() {
    let rows: Vec<PaymentRecord> = serde_json::from_value(json!([
        {"careem_captain_id": "C1", "name": "A,B", "net_salary": 100}
    ]))
    .unwrap();
    let bytes = export_payments(&rows, ExportFormat::Csv, &PdfFonts::default()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(r#""A,B""#));
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let record = reader.records().next().unwrap().unwrap();
    assert_eq!(&record[6], "A,B");
    assert_eq!(&record[18], "100");
}

#[test]
fn empty_export_is_rejected_for_both_formats() {
    for format in [ExportFormat::Csv, ExportFormat::Pdf] {
        let err = export_payments(&[], format, &PdfFonts::default()).unwrap_err();
        assert!(matches!(err, ExportError::NoData));
        assert_eq!(err.to_string(), NO_DATA_MESSAGE);
    }
}

#[tokio::test]
async fn non_admin_stays_on_current_panel() {
    let session = Session {
        access_token: "tok".to_string(),
        role: Role::User,
        ..Default::default()
    };
    let mut dash = Dashboard::new(FakeGateway::with_rows(sample_rows()), session);
    assert!(dash.navigate(Panel::Accounts).await);
    assert!(!dash.navigate(Panel::AdminPanel).await);
    assert_eq!(dash.panel(), Panel::Accounts);
    let notices = dash.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, ADMINS_ONLY);
}

#[test]
fn filtered_totals_follow_the_visible_rows() {
    let rows = sample_rows();
    let criteria = FilterCriteria {
        term: "ali".to_string(),
        ..Default::default()
    };
    let filtered = apply_filter(&rows, &criteria);
    // "Sara Malik" matches through "malik"
    assert_eq!(filtered.len(), 3);
    let totals = compute_grand_totals(&filtered);
    assert!((totals.get(NumericField::NetSalary) - 2180.25).abs() < 1e-9);
}
