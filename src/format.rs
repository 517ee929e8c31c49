//! Markdown rendering of record collections
//!
//! Output is deterministic for a given input: rows appear in the order they
//! are given and every cell is padded so columns line up in plain text.

use crate::record::RawRecord;
use chrono::DateTime;

pub const NOT_AVAILABLE: &str = "N/A";

/// How a column renders its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Text,
    /// Compact dollar amount (`$1.2M`)
    Usd,
    /// Compact amount without a currency sign (`1.2M`)
    Compact,
    /// Full-precision dollar price (`$1,234.560000`)
    Price,
    Percent,
    Number,
    /// Unix seconds or an RFC 3339 string, as `YYYY-MM-DD`
    Date,
    /// Unix seconds as `YYYY-MM-DD HH:MM:SS UTC`
    Timestamp,
    /// String or string array, comma separated, at most this many items
    Labels(usize),
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub field: &'static str,
    pub kind: CellKind,
}

impl Column {
    pub const fn new(header: &'static str, field: &'static str, kind: CellKind) -> Self {
        Self {
            header,
            field,
            kind,
        }
    }

    fn render(&self, record: &RawRecord) -> String {
        let rendered = match self.kind {
            CellKind::Text => record.display(self.field),
            CellKind::Usd => record.number(self.field).map(usd),
            CellKind::Compact => record.number(self.field).map(compact),
            CellKind::Price => record.number(self.field).map(price),
            CellKind::Percent => record.number(self.field).map(percent),
            CellKind::Number => record.number(self.field).map(number),
            CellKind::Date => match record.number(self.field) {
                Some(secs) => date(secs as i64),
                None => record.text(self.field).map(iso_date),
            },
            CellKind::Timestamp => record
                .number(self.field)
                .and_then(|secs| timestamp(secs as i64)),
            CellKind::Labels(max) => {
                let labels = record.labels(self.field);
                if labels.is_empty() {
                    None
                } else if labels.len() > max {
                    Some(format!(
                        "{} +{}",
                        labels[..max].join(", "),
                        labels.len() - max
                    ))
                } else {
                    Some(labels.join(", "))
                }
            }
        };
        escape_cell(&rendered.unwrap_or_else(|| NOT_AVAILABLE.to_string()))
    }
}

/// Render `records` as a numbered, aligned markdown table under `title`.
///
/// `summary` lines are printed between the title and the table.
pub fn table(title: &str, summary: &[String], columns: &[Column], records: &[RawRecord]) -> String {
    let mut out = format!("**{}**\n\n", title);
    for line in summary {
        out.push_str(line);
        out.push('\n');
    }
    if !summary.is_empty() {
        out.push('\n');
    }

    if records.is_empty() {
        out.push_str("No matching results.");
        return out;
    }

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(records.len() + 1);
    let mut header = vec!["#".to_string()];
    header.extend(columns.iter().map(|c| c.header.to_string()));
    rows.push(header);
    for (i, record) in records.iter().enumerate() {
        let mut row = vec![(i + 1).to_string()];
        row.extend(columns.iter().map(|c| c.render(record)));
        rows.push(row);
    }

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let render_row = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(&rows[0]));
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    lines.push(format!("| {} |", rule.join(" | ")));
    for row in &rows[1..] {
        lines.push(render_row(row));
    }

    out.push_str(&lines.join("\n"));
    out
}

/// Render `label: value` pairs with labels padded to a common width
pub fn key_values(title: &str, pairs: &[(&str, String)]) -> String {
    let width = pairs
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = format!("**{}**\n", title);
    for (label, value) in pairs {
        out.push_str(&format!(
            "\n- {:<width$} : {}",
            label,
            value,
            width = width
        ));
    }
    out
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

/// Compact dollar amount: `$1.23B`, `$4.5M`, `$6.7K`, `$8.90`
pub fn usd(value: f64) -> String {
    scaled(value, "$")
}

/// Like [`usd`] without the dollar sign
pub fn compact(value: f64) -> String {
    scaled(value, "")
}

fn scaled(value: f64, unit: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{}{}{:.2}B", sign, unit, abs / 1e9)
    } else if abs >= 1e6 {
        format!("{}{}{:.1}M", sign, unit, abs / 1e6)
    } else if abs >= 1e3 {
        format!("{}{}{:.1}K", sign, unit, abs / 1e3)
    } else {
        format!("{}{}{:.2}", sign, unit, abs)
    }
}

/// Dollar price with thousands separators and six decimals
pub fn price(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.6}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    format!("{}${}.{}", sign, group_thousands(int_part), frac_part)
}

pub fn percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Integers print without a fraction, everything else with two decimals
pub fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        group_thousands(&format!("{}", value as i64))
    } else {
        format!("{:.2}", value)
    }
}

/// Unix seconds as `YYYY-MM-DD HH:MM:SS UTC`
pub fn timestamp(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Unix seconds as `YYYY-MM-DD`
pub fn date(secs: i64) -> Option<String> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Date part of an RFC 3339 timestamp, or the input unchanged
fn iso_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}
