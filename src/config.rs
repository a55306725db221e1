//! Engine configuration, loaded from YAML and overridden from the command
//! line.
//!
//! ```yaml
//! database: school_db.sqlite
//! table: school_data
//! latitude_column: latitude
//! longitude_column: longitude
//! unit: miles
//! default_radius: 10
//! read_only_queries: true
//! nearby_columns: [school_name, location_city, latitude, longitude]
//! address_book: addresses.csv
//! ```

use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LocatorError, Result},
    geo::DistanceUnit,
    proximity::{self, DEFAULT_RADIUS, SearchOptions},
    query::QueryPolicy,
};

pub const DEFAULT_DATABASE: &str = "school_db.sqlite";
pub const DEFAULT_TABLE: &str = "school_data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub database: PathBuf,
    pub table: String,
    pub latitude_column: String,
    pub longitude_column: String,
    pub unit: DistanceUnit,
    pub default_radius: f64,
    /// Must be enabled whenever the query surface is reachable by untrusted
    /// callers.
    pub read_only_queries: bool,
    pub nearby_columns: Option<Vec<String>>,
    /// Delimited file of `address,latitude,longitude` rows for address
    /// searches.
    pub address_book: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            table: DEFAULT_TABLE.to_string(),
            latitude_column: "latitude".to_string(),
            longitude_column: "longitude".to_string(),
            unit: DistanceUnit::Miles,
            default_radius: DEFAULT_RADIUS,
            read_only_queries: false,
            nearby_columns: None,
            address_book: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|err| LocatorError::Parse(format!("Opening config file {path:?}: {err}")))?;
        let config: EngineConfig = serde_yaml::from_reader(BufReader::new(file))
            .map_err(|err| LocatorError::Parse(format!("Parsing config file {path:?}: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        proximity::validate_radius(self.default_radius)?;
        for (label, value) in [
            ("table", &self.table),
            ("latitude_column", &self.latitude_column),
            ("longitude_column", &self.longitude_column),
        ] {
            if value.trim().is_empty() {
                return Err(LocatorError::Parse(format!("config field '{label}' is empty")));
            }
        }
        if let Some(columns) = &self.nearby_columns
            && columns.is_empty()
        {
            return Err(LocatorError::Parse(
                "config field 'nearby_columns' lists no columns".into(),
            ));
        }
        Ok(())
    }

    pub fn query_policy(&self) -> QueryPolicy {
        if self.read_only_queries {
            QueryPolicy::ReadOnly
        } else {
            QueryPolicy::Permissive
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            table: self.table.clone(),
            latitude_column: self.latitude_column.clone(),
            longitude_column: self.longitude_column.clone(),
            projection: self.nearby_columns.clone(),
            unit: self.unit,
        }
    }
}
