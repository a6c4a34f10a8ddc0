use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::TableView;
use crate::dashboard::{Notice, NoticeLevel};

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, w: usize) -> String {
    let fill = w.saturating_sub(width(s));
    format!("{s}{}", " ".repeat(fill))
}

fn column_widths(view: &TableView) -> Vec<usize> {
    let mut widths: Vec<usize> = view.headers.iter().map(|h| width(h)).collect();
    let rows = view.rows.iter().chain(view.footer.iter());
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(width(cell));
            }
        }
    }
    widths
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, w)| pad(cells.get(i).map(String::as_str).unwrap_or(""), *w))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn render_table(view: &TableView) -> String {
    let widths = column_widths(view);
    let mut out = String::new();

    out.push_str(&format!(":: {} ::", view.title).bold().to_string());
    out.push('\n');
    out.push_str(&render_row(&view.headers, &widths).bold().to_string());
    out.push('\n');
    let rule_len = widths.iter().sum::<usize>() + widths.len().saturating_sub(1) * 3;
    out.push_str(&"-".repeat(rule_len));
    out.push('\n');

    if let Some(message) = view.placeholder.as_deref() {
        out.push_str(&message.dimmed().to_string());
        out.push('\n');
        return out;
    }

    for row in &view.rows {
        out.push_str(&render_row(row, &widths));
        out.push('\n');
    }
    if let Some(footer) = view.footer.as_ref() {
        out.push_str(&"-".repeat(rule_len));
        out.push('\n');
        out.push_str(&render_row(footer, &widths).bold().to_string());
        out.push('\n');
    }
    out
}

/// Two-column key/value block used for stats and the profile card.
pub fn render_pairs(title: &str, pairs: &[(String, String)]) -> String {
    let label_width = pairs.iter().map(|(k, _)| width(k)).max().unwrap_or(0);
    let mut out = format!(":: {title} ::").bold().to_string();
    out.push('\n');
    for (label, value) in pairs {
        out.push_str(&format!(":: {} : {}\n", pad(label, label_width), value));
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "[info]".cyan(),
        NoticeLevel::Success => "[ok]".green(),
        NoticeLevel::Warning => "[warn]".yellow(),
        NoticeLevel::Error => "[error]".red().bold(),
    };
    format!(":: {tag} {}", notice.message)
}

/// Stderr spinner shown while a request is in flight. Hidden when `enabled`
/// is false so piped output stays clean.
pub fn spinner(message: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::with_template(":: {spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
