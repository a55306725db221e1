//! Coordinate validation and great-circle distance.
//!
//! - Latitude: degrees north, inclusive range -90 to 90
//! - Longitude: degrees east, inclusive range -180 to 180
//! - Distance: haversine over a spherical Earth of mean radius

use std::{fmt, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{LocatorError, Result};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MI: f64 = 3958.8;

const LAT_BOUND: f64 = 90.0;
const LON_BOUND: f64 = 180.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    #[value(alias = "mi")]
    Miles,
    #[value(alias = "km")]
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(self) -> f64 {
        match self {
            DistanceUnit::Miles => EARTH_RADIUS_MI,
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// A validated geographic point. Only constructible through [`GeoPoint::new`]
/// or [`GeoPoint::parse`], so every instance is finite and in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate(latitude, longitude)
    }

    /// Parses textual coordinates such as those typed into a form field.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self> {
        let lat = parse_coordinate("latitude", latitude)?;
        let lon = parse_coordinate("longitude", longitude)?;
        validate(lat, lon)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl FromStr for GeoPoint {
    type Err = LocatorError;

    /// Accepts `lat,lon`.
    fn from_str(value: &str) -> Result<Self> {
        let (lat, lon) = value.split_once(',').ok_or_else(|| {
            LocatorError::Parse(format!("expected 'latitude,longitude' but found '{value}'"))
        })?;
        GeoPoint::parse(lat, lon)
    }
}

pub fn validate(latitude: f64, longitude: f64) -> Result<GeoPoint> {
    ensure_finite("latitude", latitude)?;
    ensure_finite("longitude", longitude)?;
    if latitude < -LAT_BOUND {
        return Err(LocatorError::Range(format!(
            "latitude {latitude} is below the minimum of -90"
        )));
    }
    if latitude > LAT_BOUND {
        return Err(LocatorError::Range(format!(
            "latitude {latitude} is above the maximum of 90"
        )));
    }
    if longitude < -LON_BOUND {
        return Err(LocatorError::Range(format!(
            "longitude {longitude} is below the minimum of -180"
        )));
    }
    if longitude > LON_BOUND {
        return Err(LocatorError::Range(format!(
            "longitude {longitude} is above the maximum of 180"
        )));
    }
    Ok(GeoPoint {
        latitude,
        longitude,
    })
}

pub(crate) fn parse_coordinate(label: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|_| LocatorError::Parse(format!("{label} '{trimmed}' is not a number")))?;
    ensure_finite(label, value)?;
    Ok(value)
}

fn ensure_finite(label: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LocatorError::Parse(format!(
            "{label} '{value}' is not a finite number"
        )))
    }
}

/// Great-circle distance between two points using the haversine formula.
///
/// Identical points yield exactly `0.0`, and the result is symmetric in its
/// arguments.
pub fn distance(a: GeoPoint, b: GeoPoint, unit: DistanceUnit) -> f64 {
    if a == b {
        return 0.0;
    }
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = ((delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    unit.earth_radius() * c
}

/// Rounds a distance to two decimal places for display.
pub fn round_distance(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive() {
        assert!(validate(90.0, 180.0).is_ok());
        assert!(validate(-90.0, -180.0).is_ok());
    }

    #[test]
    fn out_of_range_reports_violated_bound() {
        let err = validate(91.0, 0.0).unwrap_err();
        assert!(matches!(err, LocatorError::Range(ref msg) if msg.contains("maximum of 90")));
        let err = validate(0.0, -181.0).unwrap_err();
        assert!(matches!(err, LocatorError::Range(ref msg) if msg.contains("minimum of -180")));
    }

    #[test]
    fn non_numeric_text_is_parse_error() {
        let err = GeoPoint::parse("north", "0").unwrap_err();
        assert!(matches!(err, LocatorError::Parse(_)));
        let err = GeoPoint::parse("NaN", "0").unwrap_err();
        assert!(matches!(err, LocatorError::Parse(_)));
    }

    #[test]
    fn one_degree_of_latitude_is_about_69_miles() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        let miles = distance(a, b, DistanceUnit::Miles);
        assert!((miles - 69.09).abs() < 0.05, "{miles}");
        let km = distance(a, b, DistanceUnit::Kilometers);
        assert!((km - 111.19).abs() < 0.05, "{km}");
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 180.0).unwrap();
        let d = distance(a, b, DistanceUnit::Kilometers);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn from_str_accepts_comma_pair() {
        let point: GeoPoint = "37.4, -122.1".parse().unwrap();
        assert_eq!(point.latitude(), 37.4);
        assert_eq!(point.longitude(), -122.1);
    }

    #[test]
    fn round_distance_keeps_two_places() {
        assert_eq!(round_distance(4.2649), 4.26);
        assert_eq!(round_distance(0.0), 0.0);
    }
}
