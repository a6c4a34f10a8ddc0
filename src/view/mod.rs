//! Data → view-model projections for every table the dashboard shows.
//!
//! Nothing here knows how a table is drawn; see [`terminal`] for the adapter
//! that turns a [`TableView`] into text.

pub mod terminal;

use crate::engine::{self, GrandTotals};
use crate::model::{DashboardStats, LogRecord, PaymentColumn, PaymentRecord, Profile, UserRecord};

pub const EMPTY_PLACEHOLDER: &str = "No records found";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableView {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub footer: Option<Vec<String>>,
    /// Single message shown in place of rows (empty set or failed load).
    pub placeholder: Option<String>,
}

impl TableView {
    fn new(title: &str, headers: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            headers,
            ..Default::default()
        }
    }

    fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            self.placeholder = Some(EMPTY_PLACEHOLDER.to_string());
        }
        self.rows = rows;
        self
    }

    /// Same columns, no rows, one line explaining what went wrong.
    pub fn failed(mut self, message: &str) -> Self {
        self.rows.clear();
        self.footer = None;
        self.placeholder = Some(message.to_string());
        self
    }
}

fn payment_headers() -> Vec<String> {
    PaymentColumn::ALL
        .iter()
        .map(|c| c.label().to_string())
        .collect()
}

pub fn payment_cell(record: &PaymentRecord, column: PaymentColumn, position: usize) -> String {
    let value = record.value(column);
    match column {
        PaymentColumn::Sno if value.is_null() => (position + 1).to_string(),
        PaymentColumn::JoinDate => engine::format_date(value),
        _ => engine::display_text(value),
    }
}

fn totals_row(totals: &GrandTotals) -> Vec<String> {
    PaymentColumn::ALL
        .iter()
        .map(|column| match column {
            PaymentColumn::Sno => "Total".to_string(),
            PaymentColumn::Numeric(field) => format!("{:.2}", totals.get(*field)),
            _ => String::new(),
        })
        .collect()
}

/// Payments table; `totals` adds the grand-total summary row.
pub fn payments_table(rows: &[PaymentRecord], totals: Option<&GrandTotals>) -> TableView {
    let body = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            PaymentColumn::ALL
                .iter()
                .map(|c| payment_cell(r, *c, i))
                .collect()
        })
        .collect();
    let mut view = TableView::new("Rider Payments", payment_headers()).with_rows(body);
    if !rows.is_empty() {
        view.footer = totals.map(totals_row);
    }
    view
}

pub fn payments_shell() -> TableView {
    TableView::new("Rider Payments", payment_headers())
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn short_timestamp(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(|s| s.replace('T', " "))
        .map(|s| s.split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

pub fn users_shell() -> TableView {
    TableView::new(
        "User Accounts",
        ["ID", "Username", "Role", "Created"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

pub fn users_table(users: &[UserRecord]) -> TableView {
    let rows = users
        .iter()
        .map(|u| {
            vec![
                u.id.map(|id| id.to_string()).unwrap_or_default(),
                u.username.clone(),
                u.role.clone(),
                short_timestamp(&u.created_at),
            ]
        })
        .collect();
    users_shell().with_rows(rows)
}

pub fn logs_shell() -> TableView {
    TableView::new(
        "Audit Log",
        ["ID", "User", "Action", "Timestamp"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    )
}

pub fn logs_table(logs: &[LogRecord]) -> TableView {
    let rows = logs
        .iter()
        .map(|l| {
            vec![
                l.id.map(|id| id.to_string()).unwrap_or_default(),
                opt(&l.username),
                opt(&l.action),
                short_timestamp(&l.timestamp),
            ]
        })
        .collect();
    logs_shell().with_rows(rows)
}

/// Label/value pairs for the stat cards at the top of the dashboard.
pub fn stats_cards(stats: &DashboardStats) -> Vec<(String, String)> {
    let mut cards = Vec::new();
    if let Some(riders) = stats.total_riders {
        cards.push(("Total Riders".to_string(), riders.to_string()));
    }
    cards.push((
        "Total Hours".to_string(),
        format!("{:.2}", engine::to_number(&stats.total_hours)),
    ));
    cards.push((
        "Average Hours".to_string(),
        format!("{:.2}", engine::to_number(&stats.avg_hours)),
    ));
    cards
}

pub fn profile_lines(profile: &Profile) -> Vec<(String, String)> {
    vec![
        (
            "ID".to_string(),
            profile.id.map(|id| id.to_string()).unwrap_or_default(),
        ),
        ("Username".to_string(), profile.username.clone()),
        ("Role".to_string(), profile.role.clone()),
        ("Member since".to_string(), short_timestamp(&profile.created_at)),
    ]
}
