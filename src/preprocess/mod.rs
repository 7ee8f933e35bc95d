//! Raw table → cleaned table.
//!
//! Each step lives in its own submodule and is a total function from one
//! table to a new one. [`Preprocessor::run`] only fixes their order:
//!
//! 1. header normalization ([`headers`]);
//! 2. date parsing for date-like column names ([`dates`]);
//! 3. untyped text cast to `String` and numeric coercion ([`coerce`]);
//! 4. latitude/longitude resolution, reprojecting grid coordinates when a
//!    [`Projector`] is available ([`coords`]);
//! 5. float rounding;
//! 6. empty-token nulling and all-null row/column removal ([`empties`]).

pub mod coerce;
pub mod coords;
pub mod dates;
pub mod empties;
pub mod headers;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    frame::Table,
    projection::{KkjToWgs84, Projector},
};

pub use coerce::CoercionPolicy;
pub use coords::CoordinateConfig;

static KKJ_PROJECTOR: KkjToWgs84 = KkjToWgs84;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub coercion: CoercionPolicy,
    /// Decimal places kept in float columns.
    pub decimals: u32,
    /// Cell values (after trimming) treated as missing in text columns.
    pub empty_tokens: Vec<String>,
    /// Lowercase substrings marking a column as date-like.
    pub date_keywords: Vec<String>,
    pub coordinates: CoordinateConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            coercion: CoercionPolicy::default(),
            decimals: 3,
            empty_tokens: ["", " ", "-", "NA", "N/A", "nan", "NaN"]
                .into_iter()
                .map(String::from)
                .collect(),
            date_keywords: [
                "date",
                "time",
                "timestamp",
                "datetime",
                "created",
                "modified",
                "pvm",
                "päivä",
                "aika",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            coordinates: CoordinateConfig::default(),
        }
    }
}

pub struct Preprocessor<'a> {
    config: &'a PreprocessConfig,
    projector: Option<&'a dyn Projector>,
}

impl<'a> Preprocessor<'a> {
    /// A preprocessor that reprojects KKJ grid coordinates to WGS84.
    pub fn new(config: &'a PreprocessConfig) -> Self {
        Self {
            config,
            projector: Some(&KKJ_PROJECTOR),
        }
    }

    /// Replaces the reprojection capability; `None` leaves grid-derived
    /// coordinates empty.
    pub fn with_projector(mut self, projector: Option<&'a dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    pub fn run(&self, raw: &Table) -> Table {
        let config = self.config;
        debug!(
            "Preprocessing {} row(s) x {} column(s)",
            raw.row_count(),
            raw.column_count()
        );

        let names = headers::normalize_headers(&raw.column_names());
        let table = raw.with_column_names(&names);
        debug!("Headers normalized: {names:?}");

        let table = dates::parse_date_columns(&table, &config.date_keywords);
        let table = coerce::cast_objects_to_string(&table);
        let table = coerce::coerce_numeric_columns(&table, &config.coercion);
        debug!("Column types: {}", describe_types(&table));

        let table = coords::resolve_coordinates(&table, &config.coordinates, self.projector);
        let table = coerce::round_floats(&table, config.decimals);

        let table = empties::normalize_empty_tokens(&table, &config.empty_tokens);
        let cleaned = empties::drop_empty(&table);
        debug!(
            "Dropped {} empty row(s) and {} empty column(s)",
            table.row_count() - cleaned.row_count(),
            table.column_count() - cleaned.column_count()
        );

        info!(
            "Cleaned table has {} row(s) x {} column(s)",
            cleaned.row_count(),
            cleaned.column_count()
        );
        cleaned
    }
}

/// Runs the default pipeline, including KKJ reprojection.
pub fn preprocess(raw: &Table, config: &PreprocessConfig) -> Table {
    Preprocessor::new(config).run(raw)
}

fn describe_types(table: &Table) -> String {
    table
        .columns()
        .iter()
        .map(|column| format!("{}={}", column.name(), column.kind()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        frame::{Column, ColumnType},
    };

    fn text(values: &[&str]) -> Vec<Option<Value>> {
        values.iter().map(|s| Some(Value::String(s.to_string()))).collect()
    }

    #[test]
    fn run_normalizes_types_and_drops_empties() {
        let raw = Table::from_columns(vec![
            Column::new("Height (m)", text(&["1,5", "2", "3", "4", "-"])),
            Column::new(
                "Sample Date",
                text(&["01.02.2020", "02.02.2020", "03.02.2020", "04.02.2020", ""]),
            ),
            Column::new("Notes", text(&["NA", "", "-", " ", "nan"])),
            Column::new("Site", text(&["a", "b", "c", "d", "NA"])),
        ]);
        let config = PreprocessConfig::default();
        let cleaned = preprocess(&raw, &config);

        assert_eq!(cleaned.column_names(), vec!["Height_m", "Sample_Date", "Site"]);
        assert_eq!(cleaned.row_count(), 4);
        assert_eq!(cleaned.column("Height_m").unwrap().kind(), ColumnType::Float);
        assert_eq!(
            cleaned.column("Height_m").unwrap().get(0),
            Some(&Value::Float(1.5))
        );
        assert_eq!(
            cleaned.column("Sample_Date").unwrap().kind(),
            ColumnType::DateTime
        );
        assert_eq!(cleaned.column("Site").unwrap().kind(), ColumnType::String);
    }

    #[test]
    fn missing_projector_leaves_grid_rows_without_coordinates() {
        let raw = Table::from_columns(vec![
            Column::new("kkjx", vec![Some(Value::Integer(3_500_000))]),
            Column::new("kkjy", vec![Some(Value::Integer(6_700_000))]),
        ]);
        let config = PreprocessConfig::default();
        let cleaned = Preprocessor::new(&config).with_projector(None).run(&raw);
        assert!(!cleaned.has_column("latitude"));
        assert!(!cleaned.has_column("longitude"));

        let projected = Preprocessor::new(&config).run(&raw);
        assert!(projected.has_column("latitude"));
        assert!(projected.has_column("longitude"));
    }
}
