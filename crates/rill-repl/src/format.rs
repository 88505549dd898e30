//! Row rendering for the terminal.
//!
//! Single-column rows print as the bare value; multi-column rows print
//! `key=value` pairs in column order. Styled values pick up ANSI colors
//! only when the destination is a terminal.

use rill_types::{Record, Style, Value};

const RED: &str = "\x1b[31m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render one record to a display line.
pub fn render(record: &Record, color: bool) -> String {
    if record.len() == 1 {
        return record
            .values()
            .map(|value| paint(value, color))
            .collect::<Vec<_>>()
            .join(" ");
    }

    record
        .iter()
        .map(|(key, value)| format!("{key}={}", paint(value, color)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn paint(value: &Value, color: bool) -> String {
    match value {
        Value::Styled(inner, style) if color => {
            let code = match style {
                Style::Error => RED,
                Style::Emphasis => BOLD,
            };
            format!("{code}{}{RESET}", paint(inner, color))
        }
        Value::Styled(inner, _) => paint(inner, color),
        other => other.to_string(),
    }
}
