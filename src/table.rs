use std::borrow::Cow;
use std::iter;

use itertools::Itertools;

use crate::export::Tabular;

/// Renders any result as an aligned plain-text table.
pub fn render_result(result: &dyn Tabular) -> String {
    render_table(result.columns(), &result.display_rows())
}

/// Header line, a dashed rule, then one line per row. Columns are separated
/// by two spaces and trailing padding is trimmed.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = column_widths(headers, rows);
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).join("  ");

    iter::once(format_row(headers, &widths))
        .chain(iter::once(rule))
        .chain(rows.iter().map(|row| format_row(row, &widths)))
        .map(|line| line + "\n")
        .collect()
}

pub fn print_result(result: &dyn Tabular) {
    print!("{}", render_result(result));
}

fn column_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| display_width(cell))
                .chain(iter::once(display_width(header)))
                .max()
                .unwrap_or_default()
                .max(1)
        })
        .collect()
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .join("  ")
        .trim_end()
        .to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

// Tabs and line breaks would break column alignment.
fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
