//! Active column preselection and the selector helpers built on it.

use std::collections::HashSet;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    classify::{Category, CategoryMap},
    frame::{ColumnType, Table},
    preprocess::coords::{LATITUDE, LONGITUDE},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    pub per_category_cap: usize,
    pub total_cap: usize,
    /// Order in which categories contribute columns.
    pub priority: Vec<Category>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        use Category::*;
        Self {
            per_category_cap: 4,
            total_cap: 30,
            priority: vec![
                Coordinates,
                Time,
                BooleanLike,
                RegionOrArea,
                Species,
                SiteType,
                Counts,
                Lengths,
                Numeric,
                Text,
                Other,
            ],
        }
    }
}

struct Picker<'a> {
    table: &'a Table,
    cap: usize,
    picked: Vec<String>,
    seen: HashSet<String>,
}

impl<'a> Picker<'a> {
    fn new(table: &'a Table, cap: usize) -> Self {
        Self {
            table,
            cap,
            picked: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn full(&self) -> bool {
        self.picked.len() >= self.cap
    }

    fn offer(&mut self, column: &str) {
        if !self.full() && self.table.has_column(column) && self.seen.insert(column.to_string()) {
            self.picked.push(column.to_string());
        }
    }
}

/// Greedy, deterministic preselection of the columns exposed to selectors
/// and charts. Coordinates come first when both are present, then up to
/// `per_category_cap` columns per category in priority order, then any
/// remaining column until `total_cap` is reached.
pub fn select_active(map: &CategoryMap, table: &Table, policy: &SelectionPolicy) -> Vec<String> {
    let mut picker = Picker::new(table, policy.total_cap);

    if table.has_column(LATITUDE) && table.has_column(LONGITUDE) {
        picker.offer(LATITUDE);
        picker.offer(LONGITUDE);
    }

    for category in &policy.priority {
        if picker.full() {
            break;
        }
        let present = map
            .get(*category)
            .iter()
            .filter(|column| table.has_column(column));
        for column in present.take(policy.per_category_cap) {
            picker.offer(column);
        }
    }

    for (_, columns) in map.iter() {
        if picker.full() {
            break;
        }
        for column in columns {
            picker.offer(column);
        }
    }

    debug!(
        "Preselected {} active column(s): {:?}",
        picker.picked.len(),
        picker.picked
    );
    picker.picked
}

/// Every categorized column once, in category-map order.
pub fn all_columns(map: &CategoryMap) -> Vec<String> {
    map.iter()
        .flat_map(|(_, columns)| columns.iter().cloned())
        .unique()
        .collect()
}

/// Turns a user selection into the active set: duplicates and unknown
/// columns are dropped and the result is capped at `total_cap`.
pub fn reselect<S: AsRef<str>>(selected: &[S], table: &Table, total_cap: usize) -> Vec<String> {
    let mut picker = Picker::new(table, total_cap);
    for column in selected {
        picker.offer(column.as_ref());
    }
    picker.picked
}

/// Splits the present `columns` into text columns and numeric columns.
pub fn typed_columns<S: AsRef<str>>(table: &Table, columns: &[S]) -> (Vec<String>, Vec<String>) {
    let present = columns
        .iter()
        .filter_map(|name| table.column(name.as_ref()))
        .collect::<Vec<_>>();
    let text = present
        .iter()
        .filter(|c| c.kind() == ColumnType::String)
        .map(|c| c.name().to_string())
        .collect();
    let numeric = present
        .iter()
        .filter(|c| c.kind().is_numeric())
        .map(|c| c.name().to_string())
        .collect();
    (text, numeric)
}

fn time_rank(kind: ColumnType) -> u8 {
    match kind {
        ColumnType::DateTime => 0,
        ColumnType::Integer => 1,
        ColumnType::String => 2,
        _ => 3,
    }
}

/// Time-category columns that are active and present, datetime columns
/// first, then integer, then text.
pub fn time_columns<S: AsRef<str>>(map: &CategoryMap, active: &[S], table: &Table) -> Vec<String> {
    map.get(Category::Time)
        .iter()
        .filter(|name| active.iter().any(|a| a.as_ref() == name.as_str()))
        .filter_map(|name| table.column(name))
        .sorted_by_key(|column| time_rank(column.kind()))
        .map(|column| column.name().to_string())
        .collect()
}

/// Sorted, distinct display strings of the column's non-null values.
pub fn filter_values(table: &Table, column: &str) -> Vec<String> {
    let Some(column) = table.column(column) else {
        return Vec::new();
    };
    column
        .non_null()
        .map(|value| value.as_display())
        .unique()
        .sorted()
        .collect()
}

/// Sorted, distinct periods (years) derivable from `time_column`.
pub fn available_periods(table: &Table, time_column: &str) -> Vec<i32> {
    let Some(column) = table.column(time_column) else {
        return Vec::new();
    };
    column
        .non_null()
        .filter_map(|value| value.year())
        .unique()
        .sorted()
        .collect()
}
