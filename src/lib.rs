pub mod address;
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod export;
pub mod geo;
pub mod ingest;
pub mod io_utils;
pub mod proximity;
pub mod query;
pub mod records;
pub mod schema;
pub mod store;
pub mod table;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use csv::QuoteStyle;
use log::{LevelFilter, debug, info};

use crate::{
    address::AddressBook,
    cli::{Cli, Commands, IngestArgs, NearbyArgs, OutputArgs, QueryArgs},
    config::EngineConfig,
    engine::{Engine, parse_radius},
    export::{ExportOptions, Tabular},
    ingest::{IngestOptions, SourceFormat},
};

pub use crate::error::LocatorError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("school_locator", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    match cli.command {
        Commands::Ingest(args) => handle_ingest(config, &args),
        Commands::Query(args) => handle_query(config, &args),
        Commands::Nearby(args) => handle_nearby(config, &args),
        Commands::Columns => handle_columns(config),
    }
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Loading configuration from {path:?}"))?,
        None => EngineConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(table) = &cli.table {
        config.table = table.clone();
    }
    debug!("Resolved configuration: {config:?}");
    Ok(config)
}

fn handle_ingest(config: EngineConfig, args: &IngestArgs) -> Result<()> {
    let database = config.database.clone();
    let mut engine =
        Engine::open(config).with_context(|| format!("Opening store {database:?}"))?;
    let summary = match args.format {
        SourceFormat::Features => {
            engine
                .ingest_feature_pages(&args.inputs)
                .with_context(|| format!("Ingesting {} feature page(s)", args.inputs.len()))?
        }
        SourceFormat::Csv => {
            let [input] = args.inputs.as_slice() else {
                bail!("Delimited ingestion takes exactly one --input file");
            };
            let options = IngestOptions {
                format: SourceFormat::Csv,
                delimiter: args.delimiter,
                encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
                ..IngestOptions::default()
            };
            engine
                .ingest(input, &options)
                .with_context(|| format!("Ingesting {input:?}"))?
        }
    };
    info!(
        "Loaded {} row(s) and {} column(s) into '{}' of {:?}",
        summary.row_count,
        summary.columns.len(),
        summary.table,
        database
    );
    Ok(())
}

fn handle_query(mut config: EngineConfig, args: &QueryArgs) -> Result<()> {
    let text = match (&args.sql, &args.file) {
        (Some(sql), _) => sql.clone(),
        (None, Some(path)) => {
            fs::read_to_string(path).with_context(|| format!("Reading query file {path:?}"))?
        }
        (None, None) => bail!("Provide --sql or --file"),
    };
    config.read_only_queries |= args.read_only;
    let database = config.database.clone();
    let engine = if config.read_only_queries {
        Engine::open_read_only(config)
    } else {
        Engine::open_existing(config)
    }
    .with_context(|| format!("Opening store {database:?}"))?
    .with_export_options(export_options(&args.output));
    let result = engine.run_query(&text)?;
    emit(&engine, &result, &args.output)
}

fn handle_nearby(mut config: EngineConfig, args: &NearbyArgs) -> Result<()> {
    if let Some(unit) = args.unit {
        config.unit = unit;
    }
    let database = config.database.clone();
    let engine = Engine::open_read_only(config)
        .with_context(|| format!("Opening store {database:?}"))?
        .with_export_options(export_options(&args.output));
    let result = match (&args.address, &args.lat, &args.lon) {
        (Some(address), _, _) => {
            let path = args
                .address_book
                .as_ref()
                .or(engine.config().address_book.as_ref())
                .context("--address needs --address-book or 'address_book' in the config")?;
            let book = AddressBook::load(path)
                .with_context(|| format!("Loading address book {path:?}"))?;
            let radius = parse_radius(args.radius.as_deref())?;
            engine.find_nearby_address(&book, address, radius)?
        }
        (None, Some(lat), Some(lon)) => {
            engine.find_nearby_text(lat, lon, args.radius.as_deref())?
        }
        _ => bail!("Provide --lat and --lon, or --address"),
    };
    if result.skipped > 0 {
        info!(
            "{} record(s) had unusable coordinates and were left out",
            result.skipped
        );
    }
    emit(&engine, &result, &args.output)
}

fn handle_columns(config: EngineConfig) -> Result<()> {
    let table = config.table.clone();
    let database = config.database.clone();
    let engine = Engine::open_read_only(config)
        .with_context(|| format!("Opening store {database:?}"))?;
    let columns = engine.store().table_columns(&table)?;
    let rows = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.column_type.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    let headers = vec!["#".to_string(), "name".to_string(), "type".to_string()];
    print!("{}", table::render_table(&headers, &rows));
    info!("Listed {} column(s) of '{table}'", columns.len());
    Ok(())
}

fn export_options(args: &OutputArgs) -> ExportOptions {
    ExportOptions {
        delimiter: io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter),
        quote_style: if args.quote_all {
            QuoteStyle::Always
        } else {
            QuoteStyle::Necessary
        },
    }
}

fn emit(engine: &Engine, result: &dyn Tabular, args: &OutputArgs) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(&result.to_json_records())
            .context("Serializing rows to JSON")?;
        println!("{json}");
    } else if let Some(path) = &args.output {
        engine
            .export_to_file(result, path)
            .with_context(|| format!("Exporting to {path:?}"))?;
    } else {
        table::print_result(result);
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
