//! Dataset ingestion: raw records in, normalized table out.
//!
//! The whole table is built in memory first (names normalized, types
//! inferred, missing numerics zero-filled, integer columns narrowed) and only
//! then committed to the store as a single table swap. Re-ingesting the same
//! source produces the same schema and row count.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::Cell,
    error::Result,
    io_utils,
    records::{self, RawTable},
    schema::{self, ColumnMeta, MissingNumbers, Schema},
    store::{self, Store},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Delimited text with a header row
    #[default]
    Csv,
    /// Harvested JSON feature pages
    Features,
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub format: SourceFormat,
    /// Overrides the extension-based delimiter for delimited sources.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Normalized names of the latitude and longitude columns. Missing values
    /// in these stay null instead of being zero-filled, so proximity search
    /// can skip the record.
    pub coordinate_columns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            format: SourceFormat::Csv,
            delimiter: None,
            encoding: UTF_8,
            coordinate_columns: vec!["latitude".to_string(), "longitude".to_string()],
        }
    }
}

/// A fully normalized table ready to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub schema: Schema,
    pub rows: Vec<Vec<Cell>>,
    /// Source headers dropped because a later header normalized to the same
    /// name.
    pub shadowed_columns: Vec<String>,
    /// Columns whose values were all integral but kept as REAL because at
    /// least one value does not fit a 64-bit integer.
    pub narrowing_fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub table: String,
    pub row_count: usize,
    pub columns: Vec<ColumnMeta>,
    pub shadowed_columns: Vec<String>,
    pub narrowing_fallbacks: Vec<String>,
    pub source_digest: String,
    pub ingested_at: DateTime<Utc>,
}

pub fn normalize(raw: &RawTable, options: &IngestOptions) -> NormalizedTable {
    let headers = schema::normalize_headers(&raw.headers);
    let shadowed_columns = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| !headers.iter().any(|h| h.source_index == *idx))
        .map(|(_, name)| name.clone())
        .collect::<Vec<_>>();

    let mut columns = Vec::with_capacity(headers.len());
    let mut narrowing_fallbacks = Vec::new();
    let mut column_cells = Vec::with_capacity(headers.len());
    for header in &headers {
        let missing = if options.coordinate_columns.contains(&header.name) {
            MissingNumbers::Null
        } else {
            MissingNumbers::ZeroFill
        };
        let inferred = schema::infer_column_with(raw.column_values(header.source_index), missing);
        if header.name != header.source_name {
            debug!("Column '{}' stored as '{}'", header.source_name, header.name);
        }
        if inferred.narrowing_fallback {
            warn!(
                "Column '{}' holds integers outside the 64-bit range; keeping it as REAL",
                header.name
            );
            narrowing_fallbacks.push(header.name.clone());
        }
        columns.push(ColumnMeta {
            name: header.name.clone(),
            column_type: inferred.column_type,
        });
        column_cells.push(inferred.cells);
    }

    let rows = transpose(column_cells, raw.rows.len());
    NormalizedTable {
        schema: Schema { columns },
        rows,
        shadowed_columns,
        narrowing_fallbacks,
    }
}

fn transpose(columns: Vec<Vec<Cell>>, row_count: usize) -> Vec<Vec<Cell>> {
    let mut rows = (0..row_count)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect::<Vec<Vec<Cell>>>();
    for column in columns {
        for (row, cell) in rows.iter_mut().zip(column) {
            row.push(cell);
        }
    }
    rows
}

/// Normalizes `raw` and replaces `table` in `store` with the result.
pub fn ingest_raw(
    raw: &RawTable,
    store: &mut Store,
    table: &str,
    options: &IngestOptions,
) -> Result<DatasetSummary> {
    store::ensure_table_name(table)?;
    let normalized = normalize(raw, options);
    store.replace_table(table, &normalized.schema, &normalized.rows)?;

    let columns = store.table_columns(table)?;
    let row_count = store.row_count(table)?;
    info!(
        "Ingested {row_count} row(s) into '{table}' with columns: {}",
        columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(DatasetSummary {
        table: table.to_string(),
        row_count,
        columns,
        shadowed_columns: normalized.shadowed_columns,
        narrowing_fallbacks: normalized.narrowing_fallbacks,
        source_digest: raw.digest.clone(),
        ingested_at: Utc::now(),
    })
}

/// Reads `source` and replaces `table` in `store` with its normalized form.
pub fn ingest(
    source: &Path,
    store: &mut Store,
    table: &str,
    options: &IngestOptions,
) -> Result<DatasetSummary> {
    let raw = match options.format {
        SourceFormat::Csv => {
            let delimiter = io_utils::resolve_input_delimiter(source, options.delimiter);
            info!(
                "Ingesting '{}' with delimiter '{}'",
                source.display(),
                crate::printable_delimiter(delimiter)
            );
            records::read_delimited(source, delimiter, options.encoding)?
        }
        SourceFormat::Features => {
            info!("Ingesting feature page '{}'", source.display());
            records::read_feature_pages(&[source])?
        }
    };
    ingest_raw(&raw, store, table, options)
}

/// Reads every harvested feature page and replaces `table` with their union.
pub fn ingest_feature_pages(
    pages: &[PathBuf],
    store: &mut Store,
    table: &str,
    options: &IngestOptions,
) -> Result<DatasetSummary> {
    info!("Ingesting {} feature page(s)", pages.len());
    let raw = records::read_feature_pages(pages)?;
    ingest_raw(&raw, store, table, options)
}
