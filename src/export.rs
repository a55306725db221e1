//! Delimited export of tabular results.
//!
//! Headers come first in result order; null cells are written as empty
//! fields. The same result always encodes to the same bytes.

use std::{io::Write, path::Path};

use csv::QuoteStyle;
use log::info;
use serde_json::{Map, Value};

use crate::{
    data::Cell,
    error::{LocatorError, Result},
    io_utils,
};

/// Anything with column labels and rows of cells: query results and
/// proximity results alike.
pub trait Tabular {
    fn columns(&self) -> &[String];

    fn cell_rows(&self) -> Box<dyn Iterator<Item = Vec<Cell>> + '_>;

    fn display_rows(&self) -> Vec<Vec<String>> {
        self.cell_rows()
            .map(|row| row.iter().map(Cell::as_display).collect())
            .collect()
    }

    /// Rows as JSON objects keyed by column label, `null` for missing cells.
    fn to_json_records(&self) -> Value {
        let columns = self.columns();
        Value::Array(
            self.cell_rows()
                .map(|row| {
                    let record = columns
                        .iter()
                        .zip(row)
                        .map(|(column, cell)| {
                            let value = serde_json::to_value(&cell).unwrap_or(Value::Null);
                            (column.clone(), value)
                        })
                        .collect::<Map<_, _>>();
                    Value::Object(record)
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub delimiter: u8,
    pub quote_style: QuoteStyle,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            quote_style: QuoteStyle::Necessary,
        }
    }
}

pub fn encode(table: &dyn Tabular, options: ExportOptions) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_delimited(table, &mut buffer, options)?;
    Ok(buffer)
}

pub fn write_delimited<W: Write>(table: &dyn Tabular, writer: W, options: ExportOptions) -> Result<()> {
    let mut writer = io_utils::csv_writer(writer, options.delimiter, options.quote_style);
    writer
        .write_record(table.columns())
        .map_err(|err| LocatorError::Export(format!("Writing header row: {err}")))?;
    for (row_idx, row) in table.display_rows().into_iter().enumerate() {
        writer
            .write_record(&row)
            .map_err(|err| LocatorError::Export(format!("Writing row {}: {err}", row_idx + 1)))?;
    }
    writer
        .flush()
        .map_err(|err| LocatorError::Export(format!("Flushing output: {err}")))?;
    Ok(())
}

/// Writes the encoded form of `table` to `destination` (`-` for stdout).
pub fn export_to_file(table: &dyn Tabular, destination: &Path, options: ExportOptions) -> Result<()> {
    let output = io_utils::open_output(destination)?;
    write_delimited(table, output, options)?;
    info!(
        "Exported {} column(s) to {}",
        table.columns().len(),
        if io_utils::is_dash(destination) {
            "stdout".to_string()
        } else {
            format!("{destination:?}")
        }
    );
    Ok(())
}
