//! Upload decoding: raw bytes + filename → raw [`Table`].
//!
//! This is the only fallible boundary of the pipeline. The format is chosen
//! from the filename extension:
//!
//! - `.xls`, `.xlsx`, `.xlsm`, `.xlsb`, `.ods` → first worksheet via `calamine`
//! - `.json`, `.geojson` → record lists or a GeoJSON `FeatureCollection`
//! - anything else → CSV
//!
//! Loaders type cells as faithfully as the format allows and leave every
//! cleaning decision to [`crate::preprocess`].

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::{
    data::{Value, parse_boolean_literal, parse_integer},
    error::IngestError,
    frame::{Column, ColumnType, Table},
    io_utils,
};

const RECORD_LIST_KEYS: &[&str] = &["data", "items", "rows"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Cell contents (compared after trimming) read as missing values.
    pub null_tokens: Vec<String>,
    /// CSV delimiter; resolved from the extension when absent.
    pub delimiter: Option<char>,
    /// Text encoding label for CSV/JSON uploads; UTF-8 when absent.
    pub encoding: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            null_tokens: ["", " ", "-", "NA", "N/A", "nan", "NaN"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            delimiter: None,
            encoding: None,
        }
    }
}

impl IngestConfig {
    fn is_null_token(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.null_tokens.iter().any(|token| token.trim() == trimmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Excel,
    Json,
}

impl UploadFormat {
    pub fn from_filename(filename: &str) -> Self {
        match io_utils::extension(filename).map(str::to_ascii_lowercase).as_deref() {
            Some("xls" | "xlsx" | "xlsm" | "xlsb" | "ods") => UploadFormat::Excel,
            Some("json" | "geojson") => UploadFormat::Json,
            _ => UploadFormat::Csv,
        }
    }
}

/// Decodes an uploaded file into a raw table.
pub fn load_table(bytes: &[u8], filename: &str, config: &IngestConfig) -> Result<Table, IngestError> {
    let format = UploadFormat::from_filename(filename);
    debug!("Decoding '{filename}' as {format:?} ({} byte(s))", bytes.len());
    let table = match format {
        UploadFormat::Excel => load_excel(bytes, config)?,
        UploadFormat::Json => {
            let encoding = io_utils::resolve_encoding(config.encoding.as_deref())?;
            let text = io_utils::decode_bytes(bytes, encoding)?;
            load_json_or_geojson(&text)?
        }
        UploadFormat::Csv => {
            let encoding = io_utils::resolve_encoding(config.encoding.as_deref())?;
            let text = io_utils::decode_bytes(bytes, encoding)?;
            let delimiter = io_utils::resolve_input_delimiter(
                filename,
                config.delimiter.and_then(|c| u8::try_from(c).ok()),
            );
            load_csv(&text, delimiter, config)?
        }
    };
    info!(
        "Loaded '{filename}': {} row(s) x {} column(s)",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

pub fn load_csv(text: &str, delimiter: u8, config: &IngestConfig) -> Result<Table, IngestError> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = io_utils::decode_record(reader.headers()?);
    let mut buffers: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (idx, buffer) in buffers.iter_mut().enumerate() {
            let cell = record
                .get(idx)
                .filter(|raw| !config.is_null_token(raw))
                .map(str::to_string);
            buffer.push(cell);
        }
    }
    let columns = headers
        .into_iter()
        .zip(buffers)
        .map(|(name, raw)| type_text_column(name, raw))
        .collect();
    Ok(Table::from_columns(columns))
}

/// Types a column of CSV text the way a dataframe reader would: all-integer,
/// then all-float, then all-boolean; anything else stays untyped text.
/// Plain float literal; `NaN` and infinities are left as text.
fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn type_text_column(name: String, raw: Vec<Option<String>>) -> Column {
    let present = || raw.iter().flatten();
    if present().next().is_none() {
        let values = raw.into_iter().map(|cell| cell.map(Value::String)).collect();
        return Column::with_type(name, ColumnType::Object, values);
    }
    if present().all(|s| parse_integer(s).is_some()) {
        let values = raw
            .iter()
            .map(|cell| cell.as_deref().and_then(parse_integer).map(Value::Integer))
            .collect();
        return Column::with_type(name, ColumnType::Integer, values);
    }
    if present().all(|s| parse_finite(s).is_some()) {
        let values = raw
            .iter()
            .map(|cell| cell.as_deref().and_then(parse_finite).map(Value::Float))
            .collect();
        return Column::with_type(name, ColumnType::Float, values);
    }
    if present().all(|s| parse_boolean_literal(s).is_some()) {
        let values = raw
            .iter()
            .map(|cell| {
                cell.as_deref()
                    .and_then(parse_boolean_literal)
                    .map(Value::Boolean)
            })
            .collect();
        return Column::with_type(name, ColumnType::Boolean, values);
    }
    let values = raw.into_iter().map(|cell| cell.map(Value::String)).collect();
    Column::with_type(name, ColumnType::Object, values)
}

pub fn load_excel(bytes: &[u8], config: &IngestConfig) -> Result<Table, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(IngestError::EmptyWorkbook);
    };
    if sheet_names.len() > 1 {
        warn!(
            "Workbook has {} sheets; reading only '{sheet_name}'",
            sheet_names.len()
        );
    }
    let range = workbook.worksheet_range(sheet_name)?;
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::empty());
    };
    let headers = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell {
            Data::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Data::Empty => format!("Unnamed_{idx}"),
            Data::String(_) => format!("Unnamed_{idx}"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>();
    let body = rows
        .map(|row| row.iter().map(|cell| excel_cell(cell, config)).collect())
        .collect::<Vec<Vec<Option<Value>>>>();
    Ok(Table::from_rows(headers, body))
}

fn excel_cell(cell: &Data, config: &IngestConfig) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if config.is_null_token(s) => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(Value::Integer(*i)),
        Data::Float(f) if !f.is_finite() => None,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(Value::Integer(*f as i64)),
        Data::Float(f) => Some(Value::Float(*f)),
        Data::Bool(b) => Some(Value::Boolean(*b)),
        Data::DateTime(dt) => dt.as_datetime().map(Value::DateTime),
        other => Some(Value::String(other.to_string())),
    }
}

/// Parses JSON text as either a GeoJSON `FeatureCollection`, a list of flat
/// records, or an object holding such a list under `data`, `items` or `rows`.
pub fn load_json_or_geojson(text: &str) -> Result<Table, IngestError> {
    let parsed: JsonValue = serde_json::from_str(text)?;

    if is_feature_collection(&parsed) {
        return Ok(geojson_to_table(&parsed));
    }

    if let Some(records) = as_record_list(&parsed) {
        return Ok(records_to_table(records));
    }

    if let JsonValue::Object(object) = &parsed {
        for key in RECORD_LIST_KEYS {
            if let Some(records) = object.get(*key).and_then(as_record_list) {
                debug!("Reading records from JSON key '{key}'");
                return Ok(records_to_table(records));
            }
        }
    }

    Err(IngestError::UnsupportedJson)
}

fn is_feature_collection(value: &JsonValue) -> bool {
    value.get("type").and_then(JsonValue::as_str) == Some("FeatureCollection")
}

fn as_record_list(value: &JsonValue) -> Option<Vec<&Map<String, JsonValue>>> {
    let items = value.as_array()?;
    items.iter().map(JsonValue::as_object).collect()
}

fn records_to_table<'a, I>(records: I) -> Table
where
    I: IntoIterator<Item = &'a Map<String, JsonValue>>,
{
    let records = records.into_iter().collect::<Vec<_>>();
    let mut headers: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }
    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|key| record.get(key).and_then(json_cell))
                .collect()
        })
        .collect();
    Table::from_rows(headers, rows)
}

fn json_cell(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(Value::Boolean(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        JsonValue::String(s) => Some(Value::String(s.clone())),
        nested => Some(Value::String(nested.to_string())),
    }
}

/// Flattens a `FeatureCollection`: feature properties become row fields and
/// the geometry is reduced to one `longitude`/`latitude` pair. Features
/// without a valid WGS84 position are skipped.
fn geojson_to_table(collection: &JsonValue) -> Table {
    let features = collection
        .get("features")
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let mut rows: Vec<Map<String, JsonValue>> = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for feature in features {
        let Some(feature) = feature.as_object() else {
            skipped += 1;
            continue;
        };
        let Some((lon, lat)) = feature.get("geometry").and_then(geometry_position) else {
            skipped += 1;
            continue;
        };
        let mut row = feature
            .get("properties")
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();
        row.insert("longitude".to_string(), JsonValue::from(lon));
        row.insert("latitude".to_string(), JsonValue::from(lat));
        rows.push(row);
    }

    if skipped > 0 {
        debug!("Skipped {skipped} feature(s) without a usable position");
    }
    if rows.is_empty() {
        return Table::from_columns(vec![
            Column::with_type("latitude", ColumnType::Float, Vec::new()),
            Column::with_type("longitude", ColumnType::Float, Vec::new()),
        ]);
    }
    records_to_table(rows.iter())
}

/// A `Point` yields its own coordinates; any other geometry yields the mean
/// of all its vertices.
fn geometry_position(geometry: &JsonValue) -> Option<(f64, f64)> {
    let kind = geometry.get("type").and_then(JsonValue::as_str);
    let coordinates = geometry.get("coordinates")?;

    if kind == Some("Point") {
        let pair = coordinates.as_array()?;
        if pair.len() < 2 {
            return None;
        }
        return valid_position(pair[0].as_f64()?, pair[1].as_f64()?);
    }

    let mut points = Vec::new();
    flatten_positions(coordinates, &mut points);
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lon = points.iter().map(|p| p.0).sum::<f64>() / n;
    let lat = points.iter().map(|p| p.1).sum::<f64>() / n;
    valid_position(lon, lat)
}

fn flatten_positions(value: &JsonValue, out: &mut Vec<(f64, f64)>) {
    let Some(items) = value.as_array() else {
        return;
    };
    match items.first() {
        Some(JsonValue::Array(_)) => {
            for child in items {
                flatten_positions(child, out);
            }
        }
        Some(_) if items.len() >= 2 => {
            if let (Some(x), Some(y)) = (items[0].as_f64(), items[1].as_f64()) {
                out.push((x, y));
            }
        }
        _ => {}
    }
}

fn valid_position(lon: f64, lat: f64) -> Option<(f64, f64)> {
    if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat) {
        Some((lon, lat))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(UploadFormat::from_filename("a.XLSX"), UploadFormat::Excel);
        assert_eq!(UploadFormat::from_filename("a.geojson"), UploadFormat::Json);
        assert_eq!(UploadFormat::from_filename("a.txt"), UploadFormat::Csv);
        assert_eq!(UploadFormat::from_filename("noext"), UploadFormat::Csv);
    }

    #[test]
    fn csv_columns_are_typed() {
        let table = load_csv(
            "id,score,flag,name\n1,1.5,true,a\n2,NA,false,b\n",
            b',',
            &IngestConfig::default(),
        )
        .unwrap();
        assert_eq!(table.column("id").unwrap().kind(), ColumnType::Integer);
        assert_eq!(table.column("score").unwrap().kind(), ColumnType::Float);
        assert_eq!(table.column("score").unwrap().get(1), None);
        assert_eq!(table.column("flag").unwrap().kind(), ColumnType::Boolean);
        assert_eq!(table.column("name").unwrap().kind(), ColumnType::Object);
    }

    #[test]
    fn decimal_comma_stays_text_at_load() {
        let table = load_csv("v\n\"1,5\"\n2\n", b',', &IngestConfig::default()).unwrap();
        assert_eq!(table.column("v").unwrap().kind(), ColumnType::Object);
    }

    #[test]
    fn infinite_literals_are_not_floats() {
        let table = load_csv("v,w\ninf,1.5\n2.5,-Infinity\n", b',', &IngestConfig::default())
            .unwrap();
        assert_eq!(table.column("v").unwrap().kind(), ColumnType::Object);
        assert_eq!(table.column("w").unwrap().kind(), ColumnType::Object);
    }

    #[test]
    fn polygon_position_is_vertex_mean() {
        let geometry = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[20.0, 60.0], [22.0, 60.0], [22.0, 62.0], [20.0, 62.0]]]
        });
        assert_eq!(geometry_position(&geometry), Some((21.0, 61.0)));
    }

    #[test]
    fn out_of_range_point_is_rejected() {
        let geometry = serde_json::json!({"type": "Point", "coordinates": [200.0, 10.0]});
        assert_eq!(geometry_position(&geometry), None);
    }

    #[test]
    fn record_keys_are_unioned_in_first_seen_order() {
        let table = load_json_or_geojson(r#"[{"a": 1}, {"b": "x", "a": 2}]"#).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("b").unwrap().get(0), None);
    }

    #[test]
    fn unsupported_json_shape_is_an_error() {
        let err = load_json_or_geojson(r#"{"meta": 1}"#).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedJson));
        let err = load_json_or_geojson("[1, 2]").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedJson));
    }
}
