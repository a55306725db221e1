//! The single entry point presentation layers call into.
//!
//! Desktop and web front ends share this contract instead of carrying their
//! own copies of the query and proximity logic. Every failure comes back as a
//! [`LocatorError`]; rendering it (dialog, HTTP status, exit code) is the
//! caller's job.

use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    address::AddressBook,
    config::EngineConfig,
    error::{LocatorError, Result},
    export::{self, ExportOptions, Tabular},
    geo::{self, GeoPoint},
    ingest::{self, DatasetSummary, IngestOptions},
    proximity::{self, ProximityResult},
    query::{self, QueryResult},
    records::RawTable,
    store::Store,
};

pub struct Engine {
    store: Store,
    config: EngineConfig,
    export: ExportOptions,
}

impl Engine {
    /// Opens the configured store for reading and writing.
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open(&config.database)?;
        Ok(Self::with_store(store, config))
    }

    /// Opens a store that must already exist, for reading and writing.
    pub fn open_existing(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open_existing(&config.database)?;
        Ok(Self::with_store(store, config))
    }

    /// Opens an existing store without write access, for serving traffic.
    pub fn open_read_only(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = Store::open_read_only(&config.database)?;
        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Store, config: EngineConfig) -> Self {
        debug!("Engine ready on table '{}'", config.table);
        Self {
            store,
            config,
            export: ExportOptions::default(),
        }
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Replaces the configured table with the normalized contents of `source`.
    /// Must not run concurrently with reads of the same table. The configured
    /// coordinate columns replace those in `options`.
    pub fn ingest(&mut self, source: &Path, options: &IngestOptions) -> Result<DatasetSummary> {
        let options = IngestOptions {
            coordinate_columns: self.coordinate_columns(),
            ..options.clone()
        };
        ingest::ingest(source, &mut self.store, &self.config.table, &options)
    }

    pub fn ingest_feature_pages(&mut self, pages: &[PathBuf]) -> Result<DatasetSummary> {
        let options = self.ingest_options();
        ingest::ingest_feature_pages(pages, &mut self.store, &self.config.table, &options)
    }

    pub fn ingest_records(&mut self, raw: &RawTable) -> Result<DatasetSummary> {
        let options = self.ingest_options();
        ingest::ingest_raw(raw, &mut self.store, &self.config.table, &options)
    }

    fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            coordinate_columns: self.coordinate_columns(),
            ..IngestOptions::default()
        }
    }

    fn coordinate_columns(&self) -> Vec<String> {
        vec![
            self.config.latitude_column.clone(),
            self.config.longitude_column.clone(),
        ]
    }

    pub fn run_query(&self, text: &str) -> Result<QueryResult> {
        query::execute(&self.store, text, self.config.query_policy())
    }

    /// Searches around `(latitude, longitude)`. Coordinates are validated
    /// before the store is read; `radius` falls back to the configured
    /// default.
    pub fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius: Option<f64>,
    ) -> Result<ProximityResult> {
        let center = geo::validate(latitude, longitude)?;
        self.search(center, radius)
    }

    /// Same as [`Engine::find_nearby`] for values typed by a user. A blank
    /// radius means the default.
    pub fn find_nearby_text(
        &self,
        latitude: &str,
        longitude: &str,
        radius: Option<&str>,
    ) -> Result<ProximityResult> {
        let center = GeoPoint::parse(latitude, longitude)?;
        self.search(center, parse_radius(radius)?)
    }

    /// Searches around the coordinates `book` lists for `address`. An
    /// unknown address fails before the store is read.
    pub fn find_nearby_address(
        &self,
        book: &AddressBook,
        address: &str,
        radius: Option<f64>,
    ) -> Result<ProximityResult> {
        let center = book.lookup(address)?;
        debug!("Resolved '{}' to {center}", address.trim());
        self.search(center, radius)
    }

    fn search(&self, center: GeoPoint, radius: Option<f64>) -> Result<ProximityResult> {
        let radius = radius.unwrap_or(self.config.default_radius);
        proximity::find_nearby(
            &self.store,
            center,
            Some(radius),
            &self.config.search_options(),
        )
    }

    pub fn encode(&self, table: &dyn Tabular) -> Result<Vec<u8>> {
        export::encode(table, self.export)
    }

    pub fn export_to_file(&self, table: &dyn Tabular, destination: &Path) -> Result<()> {
        export::export_to_file(table, destination, self.export)
    }
}

/// Reads a typed radius. Blank or absent text means the configured default.
pub fn parse_radius(radius: Option<&str>) -> Result<Option<f64>> {
    match radius.map(str::trim).filter(|r| !r.is_empty()) {
        Some(text) => text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| LocatorError::Parse(format!("radius '{text}' is not a number"))),
        None => Ok(None),
    }
}
