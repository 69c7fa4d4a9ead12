//! Output formatting utilities for MCP tools.
//!
//! Renders a [`QueryResult`] as an ASCII table (MySQL CLI style) or a
//! Markdown table for clients that display text rather than JSON.

use crate::models::QueryResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

/// Format value for display in a table cell.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Render in the requested text format. `None` for JSON.
pub fn render(result: &QueryResult, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Json => None,
        OutputFormat::Table => Some(format_as_table(result)),
        OutputFormat::Markdown => Some(format_as_markdown(result)),
    }
}

/// Format query result as ASCII table (MySQL CLI style).
pub fn format_as_table(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "Empty set".to_string();
    }

    // Calculate column widths
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.name.width()).collect();
    for row in &result.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(format_value(value).width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    // Header
    output.push_str(&separator);
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad_center(&col.name, *w))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &result.rows {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|(value, w)| {
                let formatted = format_value(value);
                // Right-align numbers, left-align others
                if matches!(value, JsonValue::Number(_)) {
                    pad_right_aligned(&formatted, *w)
                } else {
                    pad_left_aligned(&formatted, *w)
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    // Footer
    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    let truncated_text = if result.truncated { " (truncated)" } else { "" };
    output.push_str(&format!(
        "{} {} in set{} ({:.2} sec)\n",
        row_count,
        row_text,
        truncated_text,
        result.execution_time_ms as f64 / 1000.0
    ));

    output
}

/// Format query result as Markdown table.
pub fn format_as_markdown(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = result
        .columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(&c.name)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = row
            .iter()
            .map(|value| format!("| {} ", escape_markdown(&format_value(value))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    let truncated_text = if result.truncated { " *(truncated)*" } else { "" };
    output.push_str(&format!("\n*{} rows*{}", result.row_count(), truncated_text));

    output
}

// `{:^w$}` pads by char count, which misaligns wide (CJK, emoji) text.
fn pad_center(text: &str, width: usize) -> String {
    let gap = width.saturating_sub(text.width());
    let left = gap / 2;
    format!("| {}{}{} ", " ".repeat(left), text, " ".repeat(gap - left))
}

fn pad_left_aligned(text: &str, width: usize) -> String {
    format!("| {}{} ", text, " ".repeat(width.saturating_sub(text.width())))
}

fn pad_right_aligned(text: &str, width: usize) -> String {
    format!("| {}{} ", " ".repeat(width.saturating_sub(text.width())), text)
}

fn escape_markdown(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
