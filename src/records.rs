//! Upstream record sources.
//!
//! Everything the normalizer consumes arrives as a [`RawTable`]: a header row
//! plus string rows of equal width. Two file formats are understood:
//!
//! - delimited text with a header row (comma by default), and
//! - harvested feature pages, i.e. JSON documents shaped like
//!   `{"fieldAliases": {...}, "features": [{"attributes": {...}}]}`.

use std::{fs, path::Path};

use encoding_rs::Encoding;
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::{
    error::{LocatorError, Result},
    io_utils,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Hex SHA-256 of the source bytes (or of the cell contents for tables
    /// built in memory).
    pub digest: String,
}

impl RawTable {
    /// Builds a table from in-memory records, checking every row against the
    /// header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        ensure_headers(&headers)?;
        let mut hasher = Sha256::new();
        for (row_idx, row) in std::iter::once(&headers).chain(&rows).enumerate() {
            if row.len() != headers.len() {
                return Err(LocatorError::Ingest(format!(
                    "record {row_idx} has {} field(s) but the header has {}",
                    row.len(),
                    headers.len()
                )));
            }
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }
        Ok(Self {
            headers,
            rows,
            digest: format!("{:x}", hasher.finalize()),
        })
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

fn ensure_headers(headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(LocatorError::Ingest("source has no header row".into()));
    }
    Ok(())
}

/// Reads a delimited file with a header row. Ragged rows are rejected.
pub fn read_delimited(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<RawTable> {
    let bytes = fs::read(path)
        .map_err(|err| LocatorError::ingest(format!("Reading source file {path:?}"), err))?;
    let digest = format!("{:x}", Sha256::digest(&bytes));

    let decoded = io_utils::decoding_reader(bytes.as_slice(), encoding);
    let mut reader = io_utils::open_csv_reader(decoded, delimiter);
    let headers = reader
        .headers()
        .map_err(|err| LocatorError::ingest(format!("Reading header row of {path:?}"), err))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LocatorError::Ingest(format!("{path:?} has no header row")));
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| LocatorError::ingest(format!("Reading row {} in {path:?}", row_idx + 2), err))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!("Read {} row(s) x {} column(s) from {path:?}", rows.len(), headers.len());
    Ok(RawTable {
        headers,
        rows,
        digest,
    })
}

#[derive(Debug, Deserialize)]
struct FeaturePage {
    #[serde(default, rename = "fieldAliases")]
    field_aliases: Option<Map<String, Value>>,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    attributes: Map<String, Value>,
}

/// Reads one or more harvested feature pages into a single table.
///
/// Field order comes from the first page's `fieldAliases` when present (the
/// alias text becomes the header), otherwise from the attribute order of the
/// first feature.
pub fn read_feature_pages(paths: &[impl AsRef<Path>]) -> Result<RawTable> {
    let mut hasher = Sha256::new();
    let mut fields: Option<Vec<(String, String)>> = None;
    let mut rows = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|err| LocatorError::ingest(format!("Reading feature page {path:?}"), err))?;
        hasher.update(&bytes);
        let page: FeaturePage = serde_json::from_slice(&bytes)
            .map_err(|err| LocatorError::ingest(format!("Parsing feature page {path:?}"), err))?;

        if fields.is_none() {
            fields = page_fields(&page);
        }
        let Some(fields) = fields.as_ref() else {
            continue;
        };
        for (feature_idx, feature) in page.features.iter().enumerate() {
            if let Some(extra) = feature
                .attributes
                .keys()
                .find(|key| !fields.iter().any(|(field, _)| field == *key))
            {
                return Err(LocatorError::Ingest(format!(
                    "feature {feature_idx} in {path:?} has unexpected attribute '{extra}'"
                )));
            }
            rows.push(
                fields
                    .iter()
                    .map(|(field, _)| render_attribute(feature.attributes.get(field)))
                    .collect(),
            );
        }
    }

    let headers = fields
        .unwrap_or_default()
        .into_iter()
        .map(|(_, header)| header)
        .collect::<Vec<_>>();
    ensure_headers(&headers)?;
    Ok(RawTable {
        headers,
        rows,
        digest: format!("{:x}", hasher.finalize()),
    })
}

fn page_fields(page: &FeaturePage) -> Option<Vec<(String, String)>> {
    if let Some(aliases) = page.field_aliases.as_ref().filter(|a| !a.is_empty()) {
        return Some(
            aliases
                .iter()
                .map(|(field, alias)| {
                    let header = alias.as_str().unwrap_or(field).to_string();
                    (field.clone(), header)
                })
                .collect(),
        );
    }
    page.features.first().map(|feature| {
        feature
            .attributes
            .keys()
            .map(|key| (key.clone(), key.clone()))
            .collect()
    })
}

fn render_attribute(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}
