//! Address lookup for search centers.
//!
//! An address book is a delimited file mapping free-text addresses to
//! coordinates:
//!
//! ```text
//! address,latitude,longitude
//! 450 Serra Mall,37.4275,-122.1697
//! ```
//!
//! Headers are matched after normalization (`Latitude`, `lat` and `LAT` all
//! work). A three-column file with other header names is read positionally.
//! Lookups ignore case and surrounding whitespace.

use std::{collections::HashMap, path::Path};

use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::{
    error::{LocatorError, Result},
    geo::GeoPoint,
    io_utils,
    records::{self, RawTable},
    schema::normalize_column_name,
};

const ADDRESS_HEADERS: &[&str] = &["address"];
const LATITUDE_HEADERS: &[&str] = &["latitude", "lat"];
const LONGITUDE_HEADERS: &[&str] = &["longitude", "lon", "lng"];

#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, GeoPoint>,
}

impl AddressBook {
    /// Reads a UTF-8 address book, picking the delimiter from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, None);
        Self::load_with(path, delimiter, encoding_rs::UTF_8)
    }

    pub fn load_with(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let raw = records::read_delimited(path, delimiter, encoding)?;
        let book = Self::from_raw(&raw)?;
        info!("Loaded {} address(es) from {path:?}", book.len());
        Ok(book)
    }

    /// Builds a book from raw records. Rows with a blank address are
    /// ignored; a repeated address keeps its last coordinates. Any
    /// unusable coordinate fails the whole book.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let (address_idx, lat_idx, lon_idx) = locate_columns(&raw.headers)?;
        let mut entries = HashMap::with_capacity(raw.rows.len());
        for (row_idx, row) in raw.rows.iter().enumerate() {
            let line = row_idx + 2;
            let address = field(row, address_idx);
            let key = address_key(address);
            if key.is_empty() {
                debug!("Skipping address book row {line} with a blank address");
                continue;
            }
            let point = GeoPoint::parse(field(row, lat_idx), field(row, lon_idx)).map_err(
                |err| LocatorError::Ingest(format!("address book row {line}: {err}")),
            )?;
            if entries.insert(key, point).is_some() {
                warn!(
                    "Address '{}' is listed more than once; keeping row {line}",
                    address.trim()
                );
            }
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, address: &str, point: GeoPoint) -> Option<GeoPoint> {
        self.entries.insert(address_key(address), point)
    }

    pub fn lookup(&self, address: &str) -> Result<GeoPoint> {
        self.entries
            .get(&address_key(address))
            .copied()
            .ok_or_else(|| LocatorError::Lookup(format!("address '{}' not found", address.trim())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn address_key(address: &str) -> String {
    address.trim().to_lowercase()
}

fn field(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

fn locate_columns(headers: &[String]) -> Result<(usize, usize, usize)> {
    let normalized = headers
        .iter()
        .map(|h| normalize_column_name(h))
        .collect::<Vec<_>>();
    let find = |candidates: &[&str]| {
        normalized
            .iter()
            .position(|name| candidates.contains(&name.as_str()))
    };
    match (
        find(ADDRESS_HEADERS),
        find(LATITUDE_HEADERS),
        find(LONGITUDE_HEADERS),
    ) {
        (Some(address), Some(lat), Some(lon)) => Ok((address, lat, lon)),
        _ if headers.len() == 3 => {
            debug!("Address book headers {headers:?} not recognized; reading columns by position");
            Ok((0, 1, 2))
        }
        _ => Err(LocatorError::Ingest(format!(
            "address book needs address, latitude and longitude columns but has {headers:?}"
        ))),
    }
}
