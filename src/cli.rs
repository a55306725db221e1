use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{geo::DistanceUnit, ingest::SourceFormat};

#[derive(Debug, Parser)]
#[command(author, version, about = "Find schools near a point and query the school dataset", long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// SQLite store file (overrides the configured database)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Dataset table name (overrides the configured table)
    #[arg(long, global = true)]
    pub table: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a source file into the store, replacing the dataset table
    Ingest(IngestArgs),
    /// Run a SQL statement against the store
    Query(QueryArgs),
    /// List records within a radius of a point, nearest first
    Nearby(NearbyArgs),
    /// List the stored columns of the dataset table and their types
    Columns,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Source file (repeat for multiple feature pages)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Source format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: SourceFormat,
    /// Delimiter for delimited sources (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited sources (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write delimited output to this file (`-` for stdout) instead of a table
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Print rows as a JSON array of objects
    #[arg(long, conflicts_with = "output")]
    pub json: bool,
    /// Delimiter for delimited output (defaults by extension, else comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Quote every field in delimited output
    #[arg(long = "quote-all")]
    pub quote_all: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// SQL statement to execute
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub sql: Option<String>,
    /// File containing the SQL statement to execute
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Reject statements that could modify the store
    #[arg(long = "read-only")]
    pub read_only: bool,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct NearbyArgs {
    /// Latitude of the search center in degrees
    #[arg(
        long,
        allow_hyphen_values = true,
        required_unless_present = "address",
        conflicts_with = "address"
    )]
    pub lat: Option<String>,
    /// Longitude of the search center in degrees
    #[arg(
        long,
        allow_hyphen_values = true,
        required_unless_present = "address",
        conflicts_with = "address"
    )]
    pub lon: Option<String>,
    /// Search around a known address instead of coordinates
    #[arg(long)]
    pub address: Option<String>,
    /// Address book to resolve --address with (overrides the configured one)
    #[arg(long = "address-book", requires = "address")]
    pub address_book: Option<PathBuf>,
    /// Search radius (defaults to the configured radius)
    #[arg(long, allow_hyphen_values = true)]
    pub radius: Option<String>,
    /// Distance unit (overrides the configured unit)
    #[arg(long, value_enum)]
    pub unit: Option<DistanceUnit>,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
