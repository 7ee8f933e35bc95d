//! Chart-ready reductions of a filtered table.
//!
//! [`aggregate`] dispatches a [`ChartSpec`] to the reduction for its kind.
//! Each reduction validates its column roles and answers
//! [`ChartSeries::Empty`] instead of failing when they do not fit. Every
//! other series carries `n`, the number of rows (or points) it was computed
//! from.

use std::collections::BTreeMap;

use chrono::Datelike;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, round_to, whole_number},
    frame::{Column, ColumnType, Table},
    frequency::{FrequencyAccumulator, value_counts},
    preprocess::coords::{LATITUDE, LONGITUDE},
    stats::{BoxSummary, LinearFit, MeanAccumulator, least_squares, sorted_finite},
};

const YEAR_RANGE: std::ops::RangeInclusive<f64> = 1800.0..=2100.0;
const MIN_BINS: usize = 5;
const MAX_BINS: usize = 60;
const MEAN_DECIMALS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Histogram,
    Box,
    Line,
    Scatter,
    Map,
}

/// Chart intent: a kind plus the columns filling its roles. Which roles are
/// read depends on the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Hover label column for map points.
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub trendline: bool,
}

impl ChartSpec {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            color: None,
            label: None,
            trendline: false,
        }
    }

    pub fn x(mut self, column: impl Into<String>) -> Self {
        self.x = Some(column.into());
        self
    }

    pub fn y(mut self, column: impl Into<String>) -> Self {
        self.y = Some(column.into());
        self
    }

    pub fn color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    pub fn label(mut self, column: impl Into<String>) -> Self {
        self.label = Some(column.into());
        self
    }

    pub fn trendline(mut self, enabled: bool) -> Self {
        self.trendline = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarMeasure {
    Mean,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    pub label: Option<String>,
    /// Group mean or count; `None` for a group without numeric values.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: Option<String>,
    pub count: usize,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub label: String,
    pub n: usize,
    #[serde(flatten)]
    pub summary: BoxSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineBucket {
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub group: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorScale {
    /// Values limited to 0 and 1, rendered as the labels "0" and "1".
    Binary,
    Continuous,
    Categorical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorValue {
    Number(f64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: Option<String>,
    pub color: Option<ColorValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSeries {
    Empty,
    Bar {
        x: String,
        y: Option<String>,
        measure: BarMeasure,
        year_axis: bool,
        bars: Vec<BarEntry>,
        n: usize,
    },
    Pie {
        column: String,
        slices: Vec<PieSlice>,
        n: usize,
    },
    Histogram {
        column: String,
        bins: Vec<HistogramBin>,
        n: usize,
    },
    Box {
        x: String,
        y: String,
        groups: Vec<BoxGroup>,
        n: usize,
    },
    Line {
        x: String,
        y: String,
        bucket: LineBucket,
        points: Vec<LinePoint>,
        n: usize,
    },
    Scatter {
        x: String,
        y: String,
        color: Option<String>,
        points: Vec<ScatterPoint>,
        trendline: Option<LinearFit>,
        n: usize,
    },
    Map {
        label: Option<String>,
        color: Option<String>,
        color_scale: Option<ColorScale>,
        points: Vec<MapPoint>,
        n: usize,
    },
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChartSeries::Empty)
    }
}

pub fn aggregate(table: &Table, spec: &ChartSpec) -> ChartSeries {
    let x = spec.x.as_deref();
    let y = spec.y.as_deref();
    let series = match spec.kind {
        ChartKind::Bar => x.map_or(ChartSeries::Empty, |x| bar(table, x, y)),
        ChartKind::Pie => x.map_or(ChartSeries::Empty, |x| pie(table, x)),
        ChartKind::Histogram => x.or(y).map_or(ChartSeries::Empty, |c| histogram(table, c)),
        ChartKind::Box => match (x, y) {
            (Some(x), Some(y)) => box_plot(table, x, y),
            _ => ChartSeries::Empty,
        },
        ChartKind::Line => match (x, y) {
            (Some(x), Some(y)) => line(table, x, y),
            _ => ChartSeries::Empty,
        },
        ChartKind::Scatter => match (x, y) {
            (Some(x), Some(y)) => scatter(table, x, y, spec.color.as_deref(), spec.trendline),
            _ => ChartSeries::Empty,
        },
        ChartKind::Map => map(table, spec.label.as_deref(), spec.color.as_deref()),
    };
    if series.is_empty() {
        debug!("{:?} chart request produced no series", spec.kind);
    }
    series
}

fn numeric_column<'a>(table: &'a Table, name: &str) -> Option<&'a Column> {
    table.column(name).filter(|c| c.kind().is_numeric())
}

/// Categorical rendering of a bar X column. Numeric columns with no gaps
/// and at least one year-like value become whole-year labels.
fn categorical_labels(column: &Column) -> Vec<Option<String>> {
    if column.kind().is_numeric() {
        let numbers = column.numeric_values();
        let complete = numbers.iter().all(|v| v.is_some_and(f64::is_finite));
        let year_like = numbers.iter().flatten().any(|v| YEAR_RANGE.contains(v));
        if complete && year_like {
            return numbers
                .into_iter()
                .map(|v| v.map(|v| format!("{}", v.round() as i64)))
                .collect();
        }
    }
    column
        .values()
        .iter()
        .map(|cell| cell.as_ref().map(Value::as_display))
        .collect()
}

fn label_year(label: &str) -> Option<i64> {
    let trimmed = label.trim();
    if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed
        .parse::<i64>()
        .ok()
        .filter(|year| YEAR_RANGE.contains(&(*year as f64)))
}

fn is_year_axis(bars: &[BarEntry]) -> bool {
    let mut labels = bars.iter().filter_map(|b| b.label.as_deref()).peekable();
    labels.peek().is_some() && labels.all(|label| label_year(label).is_some())
}

/// Mean of a numeric `y` per `x` group, or counts per `x` when `y` is absent
/// or not numeric.
pub fn bar(table: &Table, x: &str, y: Option<&str>) -> ChartSeries {
    let Some(x_column) = table.column(x) else {
        return ChartSeries::Empty;
    };
    let labels = categorical_labels(x_column);
    let y_column = y.and_then(|name| numeric_column(table, name));

    let (measure, mut bars) = match y_column {
        Some(y_column) => {
            let mut groups: BTreeMap<Option<String>, MeanAccumulator> = BTreeMap::new();
            for (label, value) in labels.into_iter().zip(y_column.numeric_values()) {
                let group = groups.entry(label).or_default();
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    group.add(v);
                }
            }
            let mut bars = groups
                .into_iter()
                .map(|(label, acc)| BarEntry {
                    label,
                    value: acc.mean().map(|m| round_to(m, MEAN_DECIMALS)),
                })
                .collect::<Vec<_>>();
            // Nulls sort first in a BTreeMap; show the null group last.
            let null_first = bars.first().is_some_and(|b| b.label.is_none());
            bars.rotate_left(usize::from(null_first));
            (BarMeasure::Mean, bars)
        }
        None => {
            let bars = value_counts(labels)
                .into_iter()
                .map(|c| BarEntry {
                    label: c.label,
                    value: Some(c.count as f64),
                })
                .collect();
            (BarMeasure::Count, bars)
        }
    };

    let year_axis = is_year_axis(&bars);
    if year_axis {
        bars.sort_by_key(|b| b.label.as_deref().and_then(label_year).unwrap_or(i64::MAX));
    }
    ChartSeries::Bar {
        x: x.to_string(),
        y: y_column.map(|c| c.name().to_string()),
        measure,
        year_axis,
        bars,
        n: table.row_count(),
    }
}

/// Share of each value of `column`, nulls included.
pub fn pie(table: &Table, column: &str) -> ChartSeries {
    let Some(source) = table.column(column) else {
        return ChartSeries::Empty;
    };
    let mut accumulator = FrequencyAccumulator::new();
    for cell in source.values() {
        accumulator.ingest(cell.as_ref().map(Value::as_display));
    }
    let total = accumulator.total();
    let slices = accumulator
        .into_counts()
        .into_iter()
        .map(|c| PieSlice {
            share: if total > 0 {
                c.count as f64 / total as f64
            } else {
                0.0
            },
            label: c.label,
            count: c.count,
        })
        .collect();
    ChartSeries::Pie {
        column: column.to_string(),
        slices,
        n: table.row_count(),
    }
}

/// Square-root rule clamped to 5..=60 bins, never more bins than distinct
/// values.
pub fn histogram_bin_count(values: usize, distinct: usize) -> usize {
    let root = (values as f64).sqrt().floor() as usize;
    root.clamp(MIN_BINS, MAX_BINS).min(distinct)
}

/// Equal-width bins over the finite values of a numeric column; the last
/// bin is closed on the right.
pub fn histogram(table: &Table, column: &str) -> ChartSeries {
    let Some(source) = numeric_column(table, column) else {
        return ChartSeries::Empty;
    };
    let sorted = sorted_finite(source.numeric_values().into_iter().flatten());
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
        return ChartSeries::Empty;
    };
    let mut distinct = sorted.clone();
    distinct.dedup();
    let bin_count = histogram_bin_count(sorted.len(), distinct.len());

    let width = (max - min) / bin_count as f64;
    let mut bins = (0..bin_count)
        .map(|idx| HistogramBin {
            start: min + width * idx as f64,
            end: if idx + 1 == bin_count {
                max
            } else {
                min + width * (idx + 1) as f64
            },
            count: 0,
        })
        .collect::<Vec<_>>();
    for value in &sorted {
        let idx = if width > 0.0 {
            (((value - min) / width).floor() as usize).min(bin_count - 1)
        } else {
            0
        };
        bins[idx].count += 1;
    }
    ChartSeries::Histogram {
        column: column.to_string(),
        bins,
        n: sorted.len(),
    }
}

/// Five-number summary of numeric `y` per `x` group, groups in order of
/// first appearance. Rows with a null `x` or `y` are skipped.
pub fn box_plot(table: &Table, x: &str, y: &str) -> ChartSeries {
    let (Some(x_column), Some(y_column)) = (table.column(x), numeric_column(table, y)) else {
        return ChartSeries::Empty;
    };
    let mut order: Vec<String> = Vec::new();
    let mut values: Vec<Vec<f64>> = Vec::new();
    for (cell, value) in x_column.values().iter().zip(y_column.numeric_values()) {
        let (Some(cell), Some(value)) = (cell, value) else {
            continue;
        };
        let label = cell.as_display();
        let idx = match order.iter().position(|l| *l == label) {
            Some(idx) => idx,
            None => {
                order.push(label);
                values.push(Vec::new());
                order.len() - 1
            }
        };
        values[idx].push(value);
    }
    let groups = order
        .into_iter()
        .zip(values)
        .filter_map(|(label, values)| {
            let n = values.len();
            BoxSummary::from_values(values).map(|summary| BoxGroup { label, n, summary })
        })
        .collect();
    ChartSeries::Box {
        x: x.to_string(),
        y: y.to_string(),
        groups,
        n: table.row_count(),
    }
}

/// Mean of numeric `y` over time: per month for a datetime `x`, otherwise
/// per whole year read from `x`.
pub fn line(table: &Table, x: &str, y: &str) -> ChartSeries {
    let (Some(x_column), Some(y_column)) = (table.column(x), numeric_column(table, y)) else {
        return ChartSeries::Empty;
    };
    let bucket = if x_column.kind() == ColumnType::DateTime {
        LineBucket::Month
    } else {
        LineBucket::Year
    };

    let mut periods: BTreeMap<(i32, u32), MeanAccumulator> = BTreeMap::new();
    for (cell, value) in x_column.values().iter().zip(y_column.numeric_values()) {
        let key = match (bucket, cell) {
            (LineBucket::Month, Some(Value::DateTime(dt))) => Some((dt.year(), dt.month())),
            (LineBucket::Year, Some(cell)) => cell
                .as_f64()
                .and_then(|v| whole_number(v.round()))
                .map(|year| (year, 0)),
            _ => None,
        };
        if let (Some(key), Some(value)) = (key, value.filter(|v| v.is_finite())) {
            periods.entry(key).or_default().add(value);
        }
    }
    if periods.is_empty() {
        return ChartSeries::Empty;
    }
    let points = periods
        .into_iter()
        .filter_map(|((year, month), acc)| {
            let period = match bucket {
                LineBucket::Month => format!("{year:04}-{month:02}"),
                LineBucket::Year => year.to_string(),
            };
            acc.mean().map(|value| LinePoint { period, value })
        })
        .collect();
    ChartSeries::Line {
        x: x.to_string(),
        y: y.to_string(),
        bucket,
        points,
        n: table.row_count(),
    }
}

/// Points of two numeric columns, optionally grouped by a color column and
/// fitted with a least-squares line.
pub fn scatter(
    table: &Table,
    x: &str,
    y: &str,
    color: Option<&str>,
    trendline: bool,
) -> ChartSeries {
    let (Some(x_column), Some(y_column)) = (numeric_column(table, x), numeric_column(table, y))
    else {
        return ChartSeries::Empty;
    };
    let color_column = color.and_then(|name| table.column(name));
    let points = x_column
        .numeric_values()
        .into_iter()
        .zip(y_column.numeric_values())
        .enumerate()
        .filter_map(|(row, pair)| match pair {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(ScatterPoint {
                x,
                y,
                group: color_column
                    .and_then(|c| c.get(row))
                    .map(Value::as_display),
            }),
            _ => None,
        })
        .collect::<Vec<_>>();
    let fit = if trendline {
        let pairs = points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>();
        least_squares(&pairs)
    } else {
        None
    };
    ChartSeries::Scatter {
        x: x.to_string(),
        y: y.to_string(),
        color: color_column.map(|c| c.name().to_string()),
        n: points.len(),
        points,
        trendline: fit,
    }
}

fn color_scale(column: &Column) -> ColorScale {
    if column.kind().is_numeric() {
        let binary = column
            .non_null()
            .filter_map(Value::as_f64)
            .all(|v| v == 0.0 || v == 1.0);
        if binary {
            ColorScale::Binary
        } else {
            ColorScale::Continuous
        }
    } else if column
        .non_null()
        .all(|v| matches!(v.as_display().as_str(), "0" | "1"))
    {
        ColorScale::Binary
    } else {
        ColorScale::Categorical
    }
}

fn color_value(value: &Value, scale: ColorScale) -> Option<ColorValue> {
    match scale {
        ColorScale::Binary => value
            .as_f64()
            .map(|v| ColorValue::Label(format!("{}", v.round() as i64))),
        ColorScale::Continuous => value.as_f64().map(ColorValue::Number),
        ColorScale::Categorical => Some(ColorValue::Label(value.as_display())),
    }
}

/// Geographic points for rows with both coordinates.
pub fn map(table: &Table, label: Option<&str>, color: Option<&str>) -> ChartSeries {
    let (Some(latitudes), Some(longitudes)) = (table.column(LATITUDE), table.column(LONGITUDE))
    else {
        return ChartSeries::Empty;
    };
    let label_column = label.and_then(|name| table.column(name));
    let color_column = color.and_then(|name| table.column(name));
    let scale = color_column.map(color_scale);

    let points = latitudes
        .numeric_values()
        .into_iter()
        .zip(longitudes.numeric_values())
        .enumerate()
        .filter_map(|(row, pair)| {
            let (Some(latitude), Some(longitude)) = pair else {
                return None;
            };
            let color = color_column
                .zip(scale)
                .and_then(|(column, scale)| column.get(row).and_then(|v| color_value(v, scale)));
            Some(MapPoint {
                latitude,
                longitude,
                label: label_column
                    .and_then(|c| c.get(row))
                    .map(Value::as_display),
                color,
            })
        })
        .collect::<Vec<_>>();
    if points.is_empty() {
        return ChartSeries::Empty;
    }
    ChartSeries::Map {
        label: label_column.map(|c| c.name().to_string()),
        color: color_column.map(|c| c.name().to_string()),
        color_scale: scale,
        n: points.len(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(name: &str, values: &[&str]) -> Column {
        Column::with_type(
            name,
            ColumnType::String,
            values
                .iter()
                .map(|v| Some(Value::String(v.to_string())))
                .collect(),
        )
    }

    fn floats(name: &str, values: &[f64]) -> Column {
        Column::new(name, values.iter().map(|v| Some(Value::Float(*v))).collect())
    }

    #[test]
    fn bin_count_rule() {
        assert_eq!(histogram_bin_count(10_000, 10_000), 60);
        assert_eq!(histogram_bin_count(3, 3), 3);
        assert_eq!(histogram_bin_count(100, 100), 10);
        assert_eq!(histogram_bin_count(4, 4), 4);
    }

    #[test]
    fn bar_counts_include_a_null_bucket() {
        let table = Table::from_columns(vec![Column::with_type(
            "species",
            ColumnType::String,
            vec![
                Some(Value::String("pine".into())),
                None,
                Some(Value::String("pine".into())),
            ],
        )]);
        let ChartSeries::Bar { measure, bars, n, .. } = bar(&table, "species", None) else {
            panic!("expected a bar series");
        };
        assert_eq!(measure, BarMeasure::Count);
        assert_eq!(n, 3);
        assert_eq!(bars[0].label.as_deref(), Some("pine"));
        assert_eq!(bars[0].value, Some(2.0));
        assert_eq!(bars[1].label, None);
    }

    #[test]
    fn numeric_years_become_a_year_axis() {
        let table = Table::from_columns(vec![floats("vuosi", &[2011.0, 2009.0, 2010.0, 2009.0])]);
        let ChartSeries::Bar { year_axis, bars, .. } = bar(&table, "vuosi", None) else {
            panic!("expected a bar series");
        };
        assert!(year_axis);
        let labels = bars.iter().filter_map(|b| b.label.clone()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["2009", "2010", "2011"]);
    }

    #[test]
    fn mean_bar_lists_null_group_last() {
        let table = Table::from_columns(vec![
            Column::with_type(
                "site",
                ColumnType::String,
                vec![
                    None,
                    Some(Value::String("b".into())),
                    Some(Value::String("a".into())),
                    None,
                ],
            ),
            floats("h", &[1.0, 2.0, 4.0, 3.0]),
        ]);
        let ChartSeries::Bar { measure, bars, .. } = bar(&table, "site", Some("h")) else {
            panic!("expected a bar series");
        };
        assert_eq!(measure, BarMeasure::Mean);
        let labels = bars.iter().map(|b| b.label.as_deref()).collect::<Vec<_>>();
        assert_eq!(labels, vec![Some("a"), Some("b"), None]);
        assert_eq!(bars[2].value, Some(2.0));
    }

    #[test]
    fn non_finite_numbers_never_become_year_labels() {
        let table = Table::from_columns(vec![floats("vuosi", &[2010.0, f64::NAN, 2011.0])]);
        let ChartSeries::Bar { year_axis, bars, .. } = bar(&table, "vuosi", None) else {
            panic!("expected a bar series");
        };
        assert!(!year_axis);
        assert!(bars.iter().all(|b| b.label.as_deref() != Some("0")));
        assert!(bars.iter().any(|b| b.label.as_deref() == Some("nan")));
    }

    #[test]
    fn box_requires_numeric_y() {
        let table = Table::from_columns(vec![strings("g", &["a"]), strings("v", &["x"])]);
        assert!(box_plot(&table, "g", "v").is_empty());
    }

    #[test]
    fn line_buckets_datetimes_by_month() {
        let day = |m, d| {
            chrono::NaiveDate::from_ymd_opt(2020, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let table = Table::from_columns(vec![
            Column::new(
                "date",
                vec![
                    Some(Value::DateTime(day(2, 3))),
                    Some(Value::DateTime(day(1, 5))),
                    Some(Value::DateTime(day(1, 20))),
                ],
            ),
            floats("h", &[5.0, 1.0, 3.0]),
        ]);
        let ChartSeries::Line { bucket, points, .. } = line(&table, "date", "h") else {
            panic!("expected a line series");
        };
        assert_eq!(bucket, LineBucket::Month);
        assert_eq!(
            points,
            vec![
                LinePoint {
                    period: "2020-01".into(),
                    value: 2.0
                },
                LinePoint {
                    period: "2020-02".into(),
                    value: 5.0
                },
            ]
        );
    }

    #[test]
    fn scatter_without_variance_has_no_trendline() {
        let table = Table::from_columns(vec![floats("a", &[1.0, 1.0]), floats("b", &[2.0, 3.0])]);
        let ChartSeries::Scatter { trendline, n, .. } = scatter(&table, "a", "b", None, true) else {
            panic!("expected a scatter series");
        };
        assert_eq!(n, 2);
        assert_eq!(trendline, None);
    }

    #[test]
    fn map_detects_binary_color() {
        let table = Table::from_columns(vec![
            floats(LATITUDE, &[61.0, 62.0]),
            floats(LONGITUDE, &[24.0, 25.0]),
            Column::new("damaged", vec![Some(Value::Integer(0)), Some(Value::Integer(1))]),
        ]);
        let ChartSeries::Map {
            color_scale,
            points,
            ..
        } = map(&table, None, Some("damaged"))
        else {
            panic!("expected a map series");
        };
        assert_eq!(color_scale, Some(ColorScale::Binary));
        assert_eq!(points[1].color, Some(ColorValue::Label("1".into())));
    }
}
