use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    frame::Table,
    preprocess::coords::{LATITUDE, LONGITUDE},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Raw selector token meaning "no filtering".
    pub all_token: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            all_token: String::from("__ALL__"),
        }
    }
}

/// Either every value, or a specific one. Keeps "all" apart from any real
/// cell value or period.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<T> {
    All,
    Only(T),
}

impl<T> Selection<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

impl FilterConfig {
    pub fn value_selection(&self, raw: &str) -> Selection<Value> {
        if raw == self.all_token {
            Selection::All
        } else {
            Selection::Only(Value::String(raw.to_string()))
        }
    }

    /// Maps raw period tokens onto a selection. Any `all_token` selects
    /// everything; tokens that are not whole numbers are ignored.
    pub fn period_selection<S: AsRef<str>>(&self, raw: &[S]) -> Selection<Vec<i32>> {
        if raw.iter().any(|token| token.as_ref() == self.all_token) {
            return Selection::All;
        }
        Selection::Only(
            raw.iter()
                .filter_map(|token| {
                    let token = token.as_ref().trim();
                    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                        token.parse::<i32>().ok()
                    } else {
                        None
                    }
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EqualityFilter {
    pub column: String,
    /// `None` is a null selection and filters nothing.
    pub value: Option<Selection<Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalFilter {
    pub column: String,
    pub periods: Selection<Vec<i32>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub equality: Option<EqualityFilter>,
    pub temporal: Option<TemporalFilter>,
}

impl FilterSpec {
    /// Builds a spec from raw selector values.
    pub fn from_raw<S: AsRef<str>>(
        config: &FilterConfig,
        filter_column: Option<&str>,
        filter_value: Option<&str>,
        time_column: Option<&str>,
        periods: &[S],
    ) -> Self {
        Self {
            equality: filter_column.map(|column| EqualityFilter {
                column: column.to_string(),
                value: filter_value.map(|raw| config.value_selection(raw)),
            }),
            temporal: time_column.map(|column| TemporalFilter {
                column: column.to_string(),
                periods: config.period_selection(periods),
            }),
        }
    }
}

/// Keeps the active columns, the coordinate pair (when both are present) and
/// any of `also_keep`, in table order.
pub fn subset_to_active<S: AsRef<str>>(table: &Table, active: &[S], also_keep: &[S]) -> Table {
    let keep_pair = table.has_column(LATITUDE) && table.has_column(LONGITUDE);
    table.retain_columns(|column| {
        let name = column.name();
        active.iter().any(|a| a.as_ref() == name)
            || also_keep.iter().any(|a| a.as_ref() == name)
            || (keep_pair && (name == LATITUDE || name == LONGITUDE))
    })
}

/// Keeps rows whose cell in `column` displays the same as `value`. Null
/// cells never match. An absent column, a null value or `All` filters
/// nothing.
pub fn apply_equality_filter(
    table: &Table,
    column: &str,
    value: Option<&Selection<Value>>,
) -> Table {
    let (Some(target), Some(Selection::Only(value))) = (table.column(column), value) else {
        return table.clone();
    };
    let wanted = value.as_display();
    table.filter_rows(|idx| {
        target
            .get(idx)
            .is_some_and(|cell| cell.as_display() == wanted)
    })
}

/// Keeps rows whose derived year is one of `periods`. Datetime cells give
/// their year; other cells must read as a whole number. Rows without a
/// period are dropped. An absent column, an empty selection or `All` filters
/// nothing.
pub fn apply_temporal_filter(
    table: &Table,
    time_column: &str,
    periods: &Selection<Vec<i32>>,
) -> Table {
    let (Some(target), Selection::Only(periods)) = (table.column(time_column), periods) else {
        return table.clone();
    };
    if periods.is_empty() {
        return table.clone();
    }
    table.filter_rows(|idx| {
        target
            .get(idx)
            .and_then(Value::year)
            .is_some_and(|year| periods.contains(&year))
    })
}

/// Subsets to the active columns (keeping the filter and time columns) and
/// applies the equality and temporal filters.
pub fn apply<S: AsRef<str>>(table: &Table, active: &[S], spec: &FilterSpec) -> Table {
    let active = active.iter().map(|s| s.as_ref().to_string()).collect::<Vec<_>>();
    let also_keep = spec
        .temporal
        .iter()
        .map(|t| t.column.clone())
        .chain(spec.equality.iter().map(|e| e.column.clone()))
        .collect::<Vec<_>>();
    let mut filtered = subset_to_active(table, &active, &also_keep);
    if let Some(equality) = &spec.equality {
        filtered = apply_equality_filter(&filtered, &equality.column, equality.value.as_ref());
    }
    if let Some(temporal) = &spec.temporal {
        filtered = apply_temporal_filter(&filtered, &temporal.column, &temporal.periods);
    }
    filtered
}
