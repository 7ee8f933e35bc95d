//! Columnar table model shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length. Each
//! column carries a [`ColumnType`] inferred from its values when it is built
//! and a vector of nullable [`Value`] cells. Tables are never mutated in
//! place by the pipeline: every transformation returns a new table.
//!
//! Serialization uses the split orientation consumed by the UI store:
//! `{"columns": [...], "index": [...], "data": [[...], ...]}` with ISO-8601
//! datetimes and JSON `null` for missing or non-finite cells.

use std::fmt;

use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::data::{Value, format_datetime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Typed text.
    String,
    /// Untyped or mixed raw cells, as delivered by the loaders.
    Object,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Object)
    }

    /// Infers the narrowest type able to hold every non-null value. Integers
    /// mixed with floats widen to `Float`; any other mix falls back to
    /// `Object`. An all-null column is `Object`.
    pub fn infer<'a, I>(values: I) -> ColumnType
    where
        I: IntoIterator<Item = &'a Option<Value>>,
    {
        let mut inferred: Option<ColumnType> = None;
        for value in values.into_iter().flatten() {
            let current = match value {
                Value::Integer(_) => ColumnType::Integer,
                Value::Float(_) => ColumnType::Float,
                Value::Boolean(_) => ColumnType::Boolean,
                Value::DateTime(_) => ColumnType::DateTime,
                Value::String(_) => ColumnType::Object,
            };
            inferred = Some(match (inferred, current) {
                (None, current) => current,
                (Some(prev), current) if prev == current => prev,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Object,
            });
        }
        inferred.unwrap_or(ColumnType::Object)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::String => "string",
            ColumnType::Object => "object",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnType,
    values: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<Value>>) -> Self {
        let kind = ColumnType::infer(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn with_type(name: impl Into<String>, kind: ColumnType, values: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().flatten()
    }

    pub fn is_all_null(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Numeric view of every cell, `None` where the cell is null or has no
    /// numeric reading.
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .map(|cell| cell.as_ref().and_then(Value::as_f64))
            .collect()
    }

    fn take_rows(&self, rows: &[usize]) -> Column {
        let values = rows
            .iter()
            .map(|&idx| self.values.get(idx).cloned().flatten())
            .collect();
        Column::with_type(self.name.clone(), self.kind, values)
    }

    fn padded(mut self, len: usize) -> Column {
        self.values.resize(len, None);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from columns, padding ragged columns with nulls.
    pub fn from_columns(columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(Column::len).max().unwrap_or(0);
        let columns = columns
            .into_iter()
            .map(|column| {
                if column.len() == row_count {
                    column
                } else {
                    column.padded(row_count)
                }
            })
            .collect();
        Self { columns, row_count }
    }

    /// Builds a table from row-major cells, inferring each column's type.
    /// Short rows are padded with nulls and surplus cells are ignored.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        let row_count = rows.len();
        let mut buffers: Vec<Vec<Option<Value>>> = headers
            .iter()
            .map(|_| Vec::with_capacity(row_count))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for buffer in buffers.iter_mut() {
                buffer.push(cells.next().flatten());
            }
        }
        let columns = headers
            .into_iter()
            .zip(buffers)
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self { columns, row_count }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn row(&self, idx: usize) -> Vec<Option<&Value>> {
        self.columns.iter().map(|c| c.get(idx)).collect()
    }

    /// Returns a copy with `column` replacing the column of the same name, or
    /// appended when no such column exists.
    pub fn with_column(&self, column: Column) -> Table {
        let mut columns = self.columns.clone();
        let column = if column.len() == self.row_count || self.columns.is_empty() {
            column
        } else {
            column.padded(self.row_count)
        };
        match columns.iter().position(|c| c.name == column.name) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Table::from_columns(columns)
    }

    /// Applies `f` to every column, keeping the row count.
    pub fn map_columns<F>(&self, mut f: F) -> Table
    where
        F: FnMut(&Column) -> Column,
    {
        let columns = self.columns.iter().map(&mut f).collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }

    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take_rows(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Keeps the rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let rows = (0..self.row_count).filter(|&idx| keep(idx)).collect::<Vec<_>>();
        self.take_rows(&rows)
    }

    /// Keeps the columns for which `keep` returns true, in table order. A
    /// table left without columns has no rows either.
    pub fn retain_columns<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Column) -> bool,
    {
        let columns = self
            .columns
            .iter()
            .filter(|&c| keep(c))
            .cloned()
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Table::empty();
        }
        Table {
            columns,
            row_count: self.row_count,
        }
    }

    pub fn with_column_names(&self, names: &[String]) -> Table {
        let columns = self
            .columns
            .iter()
            .zip(names)
            .map(|(column, name)| column.clone().renamed(name.clone()))
            .collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }

    pub fn to_split_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Table", 3)?;
        state.serialize_field("columns", &self.column_names())?;
        state.serialize_field("index", &(0..self.row_count).collect::<Vec<_>>())?;
        state.serialize_field("data", &SplitRows(self))?;
        state.end()
    }
}

struct SplitRows<'a>(&'a Table);

impl Serialize for SplitRows<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let table = self.0;
        let mut seq = serializer.serialize_seq(Some(table.row_count))?;
        for idx in 0..table.row_count {
            let row = table.row(idx).into_iter().map(Cell).collect::<Vec<_>>();
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

struct Cell<'a>(Option<&'a Value>);

impl Serialize for Cell<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            None => serializer.serialize_none(),
            Some(Value::String(s)) => serializer.serialize_str(s),
            Some(Value::Integer(i)) => serializer.serialize_i64(*i),
            Some(Value::Float(f)) if f.is_finite() => serializer.serialize_f64(*f),
            Some(Value::Float(_)) => serializer.serialize_none(),
            Some(Value::Boolean(b)) => serializer.serialize_bool(*b),
            Some(Value::DateTime(dt)) => serializer.serialize_str(&format_datetime(dt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<Value> {
        Some(Value::String(v.to_string()))
    }

    #[test]
    fn infer_widens_integer_and_float() {
        let values = vec![Some(Value::Integer(1)), None, Some(Value::Float(2.5))];
        assert_eq!(ColumnType::infer(&values), ColumnType::Float);
    }

    #[test]
    fn infer_mixed_values_is_object() {
        let values = vec![Some(Value::Integer(1)), s("x")];
        assert_eq!(ColumnType::infer(&values), ColumnType::Object);
        assert_eq!(ColumnType::infer(&[None, None]), ColumnType::Object);
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Some(Value::Integer(1))], vec![Some(Value::Integer(2)), s("x")]],
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().get(0), None);
        assert_eq!(table.column("a").unwrap().kind(), ColumnType::Integer);
    }

    #[test]
    fn with_column_replaces_in_place() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Some(Value::Integer(1)), s("x")]],
        );
        let replaced = table.with_column(Column::new("a", vec![Some(Value::Float(9.0))]));
        assert_eq!(replaced.column_names(), vec!["a", "b"]);
        assert_eq!(replaced.column("a").unwrap().kind(), ColumnType::Float);
    }

    #[test]
    fn retain_nothing_yields_empty_table() {
        let table = Table::from_rows(vec!["a".into()], vec![vec![s("x")]]);
        let subset = table.retain_columns(|_| false);
        assert_eq!(subset.row_count(), 0);
        assert_eq!(subset.column_count(), 0);
    }

    #[test]
    fn split_json_orientation() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Some(Value::Integer(1)), Some(Value::Float(f64::NAN))],
                vec![None, Some(Value::Float(0.5))],
            ],
        );
        let json = table.to_split_json().unwrap();
        assert_eq!(
            json,
            r#"{"columns":["a","b"],"index":[0,1],"data":[[1,null],[null,0.5]]}"#
        );
    }
}
