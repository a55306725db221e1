//! Radius search around a point.
//!
//! Always a full scan of the dataset table: every record's coordinates are
//! read, measured against the center, filtered by radius (inclusive), and
//! stably sorted by distance so equal distances keep dataset order.

use std::iter;

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::Cell,
    error::{LocatorError, Result},
    export::Tabular,
    geo::{self, DistanceUnit, GeoPoint},
    store::{Store, quote_identifier},
};

pub const DEFAULT_RADIUS: f64 = 10.0;
pub const DISTANCE_COLUMN: &str = "distance";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub table: String,
    pub latitude_column: String,
    pub longitude_column: String,
    /// Record fields to include in each result row; all fields when `None`.
    pub projection: Option<Vec<String>>,
    pub unit: DistanceUnit,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            table: "school_data".to_string(),
            latitude_column: "latitude".to_string(),
            longitude_column: "longitude".to_string(),
            projection: None,
            unit: DistanceUnit::Miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityRow {
    pub cells: Vec<Cell>,
    /// Rounded to two decimal places.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityResult {
    /// Record columns followed by [`DISTANCE_COLUMN`].
    pub columns: Vec<String>,
    pub rows: Vec<ProximityRow>,
    pub center: GeoPoint,
    pub radius: f64,
    pub unit: DistanceUnit,
    /// Records left out because their coordinates were missing, unparsable,
    /// or out of range.
    pub skipped: usize,
}

impl ProximityResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Tabular for ProximityResult {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn cell_rows(&self) -> Box<dyn Iterator<Item = Vec<Cell>> + '_> {
        Box::new(self.rows.iter().map(|row| {
            let mut cells = row.cells.clone();
            cells.push(Cell::Real(row.distance));
            cells
        }))
    }
}

pub fn validate_radius(radius: f64) -> Result<f64> {
    if !radius.is_finite() {
        return Err(LocatorError::Parse(format!(
            "radius '{radius}' is not a finite number"
        )));
    }
    if radius < 0.0 {
        return Err(LocatorError::Range(format!(
            "radius {radius} is below the minimum of 0"
        )));
    }
    Ok(radius)
}

/// Finds every record within `radius` (default [`DEFAULT_RADIUS`]) of
/// `center`, nearest first.
pub fn find_nearby(
    store: &Store,
    center: GeoPoint,
    radius: Option<f64>,
    options: &SearchOptions,
) -> Result<ProximityResult> {
    let radius = validate_radius(radius.unwrap_or(DEFAULT_RADIUS))?;

    let order = match store.row_order_column(&options.table)? {
        Some(alias) => format!(" ORDER BY {alias}"),
        None => {
            // A plain scan of a rowid table still visits rows in insertion order.
            warn!(
                "Columns of '{}' shadow every row id alias; relying on scan order",
                options.table
            );
            String::new()
        }
    };
    let sql = format!("SELECT * FROM {}{order}", quote_identifier(&options.table));
    let (columns, records) = store
        .select(&sql)
        .map_err(|err| LocatorError::store(format!("Reading table '{}'", options.table), err))?;

    let lat_idx = require_column(&columns, &options.latitude_column, &options.table)?;
    let lon_idx = require_column(&columns, &options.longitude_column, &options.table)?;
    let projection = match &options.projection {
        Some(names) => names
            .iter()
            .map(|name| require_column(&columns, name, &options.table))
            .collect::<Result<Vec<_>>>()?,
        None => (0..columns.len()).collect(),
    };

    let scanned = records.len();
    let mut skipped = 0usize;
    let mut matches = Vec::new();
    for (row_idx, record) in records.into_iter().enumerate() {
        let point = record_point(&record[lat_idx], &record[lon_idx]);
        let Some(point) = point else {
            debug!("Skipping record {row_idx}: unusable coordinates");
            skipped += 1;
            continue;
        };
        let distance = geo::distance(center, point, options.unit);
        if distance <= radius {
            let cells: Vec<Cell> = projection.iter().map(|&idx| record[idx].clone()).collect();
            matches.push((cells, distance));
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} record(s) with missing or invalid coordinates");
    }

    // Vec::sort_by is stable, so ties keep dataset order.
    matches.sort_by(|a, b| a.1.total_cmp(&b.1));
    let rows = matches
        .into_iter()
        .map(|(cells, distance)| ProximityRow {
            cells,
            distance: geo::round_distance(distance),
        })
        .collect::<Vec<_>>();

    let mut result_columns = projection
        .iter()
        .map(|&idx| columns[idx].clone())
        .collect::<Vec<_>>();
    let distance_column = distance_column_name(&result_columns, options.unit);
    if distance_column != DISTANCE_COLUMN {
        warn!("Record column '{DISTANCE_COLUMN}' exists; computed distance is '{distance_column}'");
    }
    result_columns.push(distance_column);

    info!(
        "Found {} of {scanned} record(s) within {radius} {} of {center}",
        rows.len(),
        options.unit
    );
    Ok(ProximityResult {
        columns: result_columns,
        rows,
        center,
        radius,
        unit: options.unit,
        skipped,
    })
}

fn record_point(latitude: &Cell, longitude: &Cell) -> Option<GeoPoint> {
    let lat = latitude.as_f64()?;
    let lon = longitude.as_f64()?;
    geo::validate(lat, lon).ok()
}

/// [`DISTANCE_COLUMN`] unless a record column already uses it, then
/// `distance_<unit>` (numbered further if that is taken too).
fn distance_column_name(columns: &[String], unit: DistanceUnit) -> String {
    if !columns.iter().any(|c| c == DISTANCE_COLUMN) {
        return DISTANCE_COLUMN.to_string();
    }
    let base = format!("{DISTANCE_COLUMN}_{}", unit.abbreviation());
    iter::once(base.clone())
        .chain((1..).map(|n| format!("{base}_{n}")))
        .find(|name| !columns.contains(name))
        .unwrap_or(base)
}

fn require_column(columns: &[String], name: &str, table: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| LocatorError::Store(format!("table '{table}' has no column '{name}'")))
}
