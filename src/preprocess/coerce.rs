use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, parse_number, round_to},
    frame::{Column, ColumnType, Table},
};

/// How eagerly text columns are promoted to numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionPolicy {
    /// Number of leading non-null values inspected per column.
    pub sample_size: usize,
    /// Minimum share of sampled values that must parse as numbers.
    pub threshold: f64,
}

impl Default for CoercionPolicy {
    fn default() -> Self {
        Self {
            sample_size: 200,
            threshold: 0.8,
        }
    }
}

/// Renders every untyped (`Object`) column as typed text.
pub fn cast_objects_to_string(table: &Table) -> Table {
    table.map_columns(|column| {
        if column.kind() != ColumnType::Object {
            return column.clone();
        }
        let values = column
            .values()
            .iter()
            .map(|cell| match cell {
                Some(Value::String(s)) => Some(Value::String(s.clone())),
                Some(other) => Some(Value::String(other.as_display())),
                None => None,
            })
            .collect();
        Column::with_type(column.name(), ColumnType::String, values)
    })
}

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_EXACT_INTEGER: f64 = 9e15;

/// Converts a `String` column to numbers when enough of its leading values
/// read as numbers (decimal commas accepted). The column becomes `Integer`
/// when every parsed value is whole and `Float` otherwise. Values that do not
/// parse become null. Other columns, and text columns under the threshold,
/// are returned as they are.
pub fn coerce_numeric(column: &Column, policy: &CoercionPolicy) -> Column {
    if column.kind() != ColumnType::String {
        return column.clone();
    }
    let sample = column
        .non_null()
        .take(policy.sample_size)
        .map(Value::as_display)
        .collect::<Vec<_>>();
    if sample.is_empty() {
        return column.clone();
    }
    let parsed = sample.iter().filter(|s| parse_number(s).is_some()).count();
    let share = parsed as f64 / sample.len() as f64;
    if share < policy.threshold {
        return column.clone();
    }
    debug!(
        "Column '{}' coerced to numbers ({parsed}/{} sampled values parsed)",
        column.name(),
        sample.len()
    );
    let numbers = column
        .values()
        .iter()
        .map(|cell| cell.as_ref().and_then(|value| parse_number(&value.as_display())))
        .collect::<Vec<_>>();
    if numbers.iter().flatten().all(|v| is_whole(*v)) {
        let values = numbers
            .into_iter()
            .map(|v| v.map(|v| Value::Integer(v as i64)))
            .collect();
        return Column::with_type(column.name(), ColumnType::Integer, values);
    }
    let values = numbers.into_iter().map(|v| v.map(Value::Float)).collect();
    Column::with_type(column.name(), ColumnType::Float, values)
}

fn is_whole(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER
}

pub fn coerce_numeric_columns(table: &Table, policy: &CoercionPolicy) -> Table {
    table.map_columns(|column| coerce_numeric(column, policy))
}

/// Rounds every `Float` column to `decimals` places.
pub fn round_floats(table: &Table, decimals: u32) -> Table {
    table.map_columns(|column| {
        if column.kind() != ColumnType::Float {
            return column.clone();
        }
        let values = column
            .values()
            .iter()
            .map(|cell| match cell {
                Some(Value::Float(f)) => Some(Value::Float(round_to(*f, decimals))),
                other => other.clone(),
            })
            .collect();
        Column::with_type(column.name(), ColumnType::Float, values)
    })
}
