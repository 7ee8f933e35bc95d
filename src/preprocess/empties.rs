use crate::{
    data::Value,
    frame::{Column, Table},
};

/// Replaces textual cells whose trimmed content is one of `tokens` with null.
/// Columns that are not textual are returned untouched.
pub fn normalize_empty_tokens<S: AsRef<str>>(table: &Table, tokens: &[S]) -> Table {
    let tokens = tokens
        .iter()
        .map(|t| t.as_ref().trim())
        .collect::<Vec<_>>();
    table.map_columns(|column| {
        if !column.kind().is_textual() {
            return column.clone();
        }
        let values = column
            .values()
            .iter()
            .map(|cell| match cell {
                Some(Value::String(s)) if tokens.contains(&s.trim()) => None,
                other => other.clone(),
            })
            .collect();
        Column::with_type(column.name(), column.kind(), values)
    })
}

pub fn drop_empty_rows(table: &Table) -> Table {
    table.filter_rows(|idx| table.columns().iter().any(|c| c.get(idx).is_some()))
}

pub fn drop_empty_columns(table: &Table) -> Table {
    table.retain_columns(|column| !column.is_all_null())
}

/// Drops all-null rows first, then all-null columns.
pub fn drop_empty(table: &Table) -> Table {
    drop_empty_columns(&drop_empty_rows(table))
}
