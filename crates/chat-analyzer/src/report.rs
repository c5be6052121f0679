//! Plain-text report tables for the terminal.
//!
//! Each view renders one [`TextTable`] with a header row, one row per group
//! and, where it makes sense, a totals row. Column widths are measured in
//! terminal cells so names containing emoji or accents stay aligned.

use std::path::Path;

use chat_core::calendar::Weekday;
use chat_core::formatting::{format_count, format_number, format_optional_duration};
use chat_data::metrics::{ChatMetrics, DailyCount, MetricGroup};
use chat_runtime::batch::BatchReport;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

// ── TextTable ─────────────────────────────────────────────────────────────────

/// A column-aligned plain-text table.
///
/// The first `label_columns` columns are left-aligned, the rest are numeric
/// and right-aligned.
#[derive(Debug, Clone)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    footer: Option<Vec<String>>,
    label_columns: usize,
}

impl TextTable {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>, label_columns: usize) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            footer: None,
            label_columns,
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Totals row, separated from the body by a rule.
    pub fn set_footer(&mut self, row: Vec<String>) {
        self.footer = Some(row);
    }

    pub fn render(&self) -> String {
        let widths = self.column_widths();
        let rule: String = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");

        let mut out = String::new();
        out.push_str(&self.render_row(&self.headers, &widths));
        out.push_str(&rule);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_row(row, &widths));
        }
        if let Some(footer) = &self.footer {
            out.push_str(&rule);
            out.push('\n');
            out.push_str(&self.render_row(footer, &widths));
        }
        out
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in self.rows.iter().chain(self.footer.iter()) {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.width());
                } else {
                    widths.push(cell.width());
                }
            }
        }
        widths
    }

    fn render_row(&self, row: &[String], widths: &[usize]) -> String {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = " ".repeat(w.saturating_sub(cell.width()));
                if i < self.label_columns {
                    format!("{cell}{pad}")
                } else {
                    format!("{pad}{cell}")
                }
            })
            .collect();
        let mut line = cells.join("  ").trim_end().to_string();
        line.push('\n');
        line
    }
}

// ── Metric columns ────────────────────────────────────────────────────────────

const METRIC_HEADERS: [&str; 7] = [
    "Blocks",
    "Symbols",
    "Avg symbols",
    "Emojis",
    "Avg reply",
    "Avg since last",
    "Follow-ups",
];

fn metric_cells(m: &ChatMetrics) -> Vec<String> {
    vec![
        format_count(m.total_messages),
        format_count(m.total_symbols),
        format_number(m.avg_symbols_per_message, 1),
        format_count(m.total_emojis),
        format_optional_duration(m.avg_time_to_reply),
        format_optional_duration(m.avg_time_since_their_last),
        format_count(m.n_follow_up_messages),
    ]
}

fn metrics_table<K>(
    key_headers: &[&str],
    groups: &[MetricGroup<K>],
    key_cells: impl Fn(&K) -> Vec<String>,
    totals: Option<&ChatMetrics>,
) -> TextTable {
    let headers = key_headers.iter().chain(METRIC_HEADERS.iter()).copied();
    let mut table = TextTable::new(headers, key_headers.len());

    for group in groups {
        let mut row = key_cells(&group.key);
        row.extend(metric_cells(&group.metrics));
        table.push_row(row);
    }

    if let Some(totals) = totals {
        let mut row = vec!["Total".to_string()];
        row.extend(std::iter::repeat(String::new()).take(key_headers.len() - 1));
        row.extend(metric_cells(totals));
        table.set_footer(row);
    }
    table
}

// ── Views ─────────────────────────────────────────────────────────────────────

/// Metrics per `(sender, receiver)` pair with a totals row.
pub fn sender_report(groups: &[MetricGroup<(String, String)>], totals: &ChatMetrics) -> String {
    metrics_table(
        &["Sender", "Receiver"],
        groups,
        |(sender, receiver)| vec![sender.clone(), receiver.clone()],
        Some(totals),
    )
    .render()
}

/// Metrics per `(hour, sender)`.
pub fn hourly_report(groups: &[MetricGroup<(u32, String)>]) -> String {
    metrics_table(
        &["Hour", "Sender"],
        groups,
        |(hour, sender)| vec![format!("{hour:02}:00"), sender.clone()],
        None,
    )
    .render()
}

/// Metrics per `(weekday, sender)`, Monday first.
pub fn weekday_report(groups: &[MetricGroup<(Weekday, String)>]) -> String {
    metrics_table(
        &["Weekday", "Sender"],
        groups,
        |(weekday, sender)| vec![weekday.to_string(), sender.clone()],
        None,
    )
    .render()
}

/// Block counts per day alongside that day's symbol, emoji and reply stats.
///
/// `counts` and `by_date` are both keyed by date ascending; a date present in
/// only one of them is rendered with the other side blank.
pub fn daily_report(counts: &[DailyCount], by_date: &[MetricGroup<NaiveDate>]) -> String {
    let mut table = TextTable::new(["Date", "Blocks", "Symbols", "Emojis", "Avg reply"], 1);

    for count in counts {
        let metrics = by_date
            .iter()
            .find(|g| g.key == count.date)
            .map(|g| &g.metrics);
        table.push_row(vec![
            count.date.format("%Y-%m-%d").to_string(),
            format_count(count.n_messages),
            metrics.map(|m| format_count(m.total_symbols)).unwrap_or_default(),
            metrics.map(|m| format_count(m.total_emojis)).unwrap_or_default(),
            metrics
                .map(|m| format_optional_duration(m.avg_time_to_reply))
                .unwrap_or_default(),
        ]);
    }

    let total: usize = counts.iter().map(|c| c.n_messages).sum();
    table.set_footer(vec![
        format!("{} days", format_count(counts.len())),
        format_count(total),
    ]);
    table.render()
}

/// Summary printed after an aggregation run.
pub fn batch_summary(report: &BatchReport, snapshot: &Path) -> String {
    let mut out = format!(
        "Processed {} transcript(s), {} block(s) written to {}\n",
        format_count(report.processed.len()),
        format_count(report.records.len()),
        snapshot.display()
    );
    if !report.failures.is_empty() {
        out.push_str(&format!(
            "Skipped {} transcript(s):\n",
            format_count(report.failures.len())
        ));
        for failure in &report.failures {
            out.push_str(&format!("  {}: {}\n", failure.path.display(), failure.error));
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
