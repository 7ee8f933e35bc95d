use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    frame::{Column, ColumnType, Table},
    projection::Projector,
};

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Column-name tokens the resolver looks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConfig {
    /// Exact (lowercased) names of a latitude column.
    pub latitude_names: Vec<String>,
    /// Exact (lowercased) names of a longitude column.
    pub longitude_names: Vec<String>,
    /// Substrings identifying a KKJ easting column.
    pub easting_tokens: Vec<String>,
    /// Substrings identifying a KKJ northing column.
    pub northing_tokens: Vec<String>,
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Self {
            latitude_names: owned(&["lat", "latitude"]),
            longitude_names: owned(&["lon", "long", "lng", "longitude"]),
            easting_tokens: owned(&["kkjx", "kkj_x", "kkjx_coordinate"]),
            northing_tokens: owned(&["kkjy", "kkj_y", "kkjy_coordinate"]),
        }
    }
}

fn find_exact<'a>(table: &'a Table, names: &[String]) -> Option<&'a Column> {
    table.columns().iter().find(|column| {
        let lowered = column.name().trim().to_lowercase();
        names.iter().any(|name| lowered == name.to_lowercase())
    })
}

fn find_containing<'a>(table: &'a Table, tokens: &[String]) -> Option<&'a Column> {
    table.columns().iter().find(|column| {
        let lowered = column.name().trim().to_lowercase();
        tokens
            .iter()
            .any(|token| lowered.contains(&token.to_lowercase()))
    })
}

/// Adds `latitude`/`longitude` columns when they can be derived, either from
/// named latitude/longitude columns or by reprojecting a KKJ grid pair.
/// Existing `latitude`/`longitude` columns take precedence over aliases such
/// as `lat`/`lon` and are only validated in place. The resolved pair is
/// invalidated row by row: when either value is missing or out of range,
/// both become null.
pub fn resolve_coordinates(
    table: &Table,
    config: &CoordinateConfig,
    projector: Option<&dyn Projector>,
) -> Table {
    // An existing canonical column is its own source, never an alias.
    let latitude = table
        .column(LATITUDE)
        .or_else(|| find_exact(table, &config.latitude_names));
    let longitude = table
        .column(LONGITUDE)
        .or_else(|| find_exact(table, &config.longitude_names));

    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        debug!(
            "Coordinates taken from named columns '{}' and '{}'",
            lat.name(),
            lon.name()
        );
        return write_pair(table, lat.numeric_values(), lon.numeric_values());
    }

    let easting = find_containing(table, &config.easting_tokens);
    let northing = find_containing(table, &config.northing_tokens);
    if let (Some(east), Some(north)) = (easting, northing)
        && east.name() != north.name()
    {
        return reproject(table, east, north, projector);
    }

    if latitude.is_some() || longitude.is_some() {
        debug!("Lone latitude/longitude column has no partner; coordinates cleared");
        let nulls = vec![None; table.row_count()];
        return write_pair(table, nulls.clone(), nulls);
    }

    table.clone()
}

fn reproject(
    table: &Table,
    easting: &Column,
    northing: &Column,
    projector: Option<&dyn Projector>,
) -> Table {
    let rows = table.row_count();
    let Some(projector) = projector else {
        warn!(
            "Grid columns '{}'/'{}' found but no projector is available; coordinates left empty",
            easting.name(),
            northing.name()
        );
        let nulls = vec![None; rows];
        return write_pair(table, nulls.clone(), nulls);
    };

    let mut latitudes = Vec::with_capacity(rows);
    let mut longitudes = Vec::with_capacity(rows);
    for (east, north) in easting
        .numeric_values()
        .into_iter()
        .zip(northing.numeric_values())
    {
        let projected = match (east, north) {
            (Some(e), Some(n)) => projector.project(e, n),
            _ => None,
        };
        latitudes.push(projected.map(|(_, lat)| lat));
        longitudes.push(projected.map(|(lon, _)| lon));
    }
    info!(
        "Reprojected {} of {rows} row(s) from '{}'/'{}' ({})",
        latitudes.iter().flatten().count(),
        easting.name(),
        northing.name(),
        projector.name()
    );
    write_pair(table, latitudes, longitudes)
}

fn in_range(value: Option<f64>, limit: f64) -> Option<f64> {
    value.filter(|v| v.is_finite() && v.abs() <= limit)
}

fn write_pair(table: &Table, latitudes: Vec<Option<f64>>, longitudes: Vec<Option<f64>>) -> Table {
    let (lat_values, lon_values): (Vec<_>, Vec<_>) = latitudes
        .into_iter()
        .zip(longitudes)
        .map(|(lat, lon)| {
            match (in_range(lat, 90.0), in_range(lon, 180.0)) {
                (Some(lat), Some(lon)) => (Some(Value::Float(lat)), Some(Value::Float(lon))),
                _ => (None, None),
            }
        })
        .unzip();
    table
        .with_column(Column::with_type(LATITUDE, ColumnType::Float, lat_values))
        .with_column(Column::with_type(LONGITUDE, ColumnType::Float, lon_values))
}
