//! Plain-text preview of a [`Table`] for terminal output.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::frame::Table;

const NULL_MARKER: &str = "<null>";

/// Renders the first `limit` rows of `table` as aligned columns, with each
/// header annotated by its column type.
pub fn render_preview(table: &Table, limit: usize) -> String {
    let headers = table
        .columns()
        .iter()
        .map(|column| format!("{} ({})", column.name(), column.kind()))
        .collect::<Vec<_>>();
    let rows = (0..table.row_count().min(limit))
        .map(|idx| {
            table
                .row(idx)
                .into_iter()
                .map(|cell| cell.map_or_else(|| NULL_MARKER.to_string(), |v| v.as_display()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut output = render_grid(&headers, &rows);
    if table.row_count() > limit {
        let _ = writeln!(
            output,
            "... {} more row(s)",
            table.row_count() - limit
        );
    }
    output
}

fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separators = widths.iter().map(|w| "-".repeat((*w).max(3))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separators, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end().len());
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
