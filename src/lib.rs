pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod frame;
pub mod frequency;
pub mod ingest;
pub mod io_utils;
pub mod preprocess;
pub mod projection;
pub mod selection;
pub mod stats;
pub mod table;

use std::{env, fs, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    aggregate::ChartSpec,
    cli::{ChartArgs, CleanArgs, Cli, Commands, InputArgs},
    config::PipelineConfig,
    error::IngestError,
    filter::FilterSpec,
    frame::Table,
    ingest::IngestConfig,
    preprocess::Preprocessor,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("geotable", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

/// Decodes an upload and runs the preprocessing pipeline on it.
pub fn load_and_clean(
    bytes: &[u8],
    filename: &str,
    config: &PipelineConfig,
) -> Result<Table, IngestError> {
    let raw = ingest::load_table(bytes, filename, &config.ingest)?;
    Ok(Preprocessor::new(&config.preprocess).run(&raw))
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Loading policy from {path:?}"))?,
        None => PipelineConfig::default(),
    };
    match &cli.command {
        Commands::Clean(args) => handle_clean(args, &config),
        Commands::Classify(args) => handle_classify(args, &config),
        Commands::Select(args) => handle_select(args, &config),
        Commands::Chart(args) => handle_chart(args, &config),
    }
}

fn ingest_overrides(args: &InputArgs, config: &PipelineConfig) -> IngestConfig {
    let mut ingest = config.ingest.clone();
    if let Some(delimiter) = args.delimiter {
        ingest.delimiter = Some(char::from(delimiter));
    }
    if let Some(encoding) = &args.input_encoding {
        ingest.encoding = Some(encoding.clone());
    }
    ingest
}

fn load_input(args: &InputArgs, config: &PipelineConfig) -> Result<Table> {
    let bytes = fs::read(&args.input).with_context(|| format!("Reading {:?}", args.input))?;
    let filename = file_name(&args.input);
    let ingest = ingest_overrides(args, config);
    let raw = ingest::load_table(&bytes, &filename, &ingest)
        .with_context(|| format!("Decoding {:?}", args.input))?;
    Ok(Preprocessor::new(&config.preprocess).run(&raw))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Serializing output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn handle_clean(args: &CleanArgs, config: &PipelineConfig) -> Result<()> {
    let table = load_input(&args.input, config)?;
    if args.json {
        let rendered = table
            .to_split_json()
            .context("Serializing cleaned table")?;
        println!("{rendered}");
    } else {
        print!("{}", table::render_preview(&table, args.preview));
    }
    Ok(())
}

fn handle_classify(args: &InputArgs, config: &PipelineConfig) -> Result<()> {
    let table = load_input(args, config)?;
    let categories = classify::classify(&table, &config.classifier);
    info!("Classified {} column(s) into {} categories", table.column_count(), categories.len());
    print_json(&categories)
}

fn handle_select(args: &InputArgs, config: &PipelineConfig) -> Result<()> {
    let table = load_input(args, config)?;
    let categories = classify::classify(&table, &config.classifier);
    let active = selection::select_active(&categories, &table, &config.selection);
    print_json(&active)
}

fn handle_chart(args: &ChartArgs, config: &PipelineConfig) -> Result<()> {
    let table = load_input(&args.input, config)?;
    let active = if args.columns.is_empty() {
        let categories = classify::classify(&table, &config.classifier);
        selection::select_active(&categories, &table, &config.selection)
    } else {
        selection::reselect(&args.columns, &table, config.selection.total_cap)
    };
    debug!("Active columns: {active:?}");

    let spec = FilterSpec::from_raw(
        &config.filter,
        args.filter_col.as_deref(),
        args.filter_val.as_deref(),
        args.time_col.as_deref(),
        &args.periods,
    );
    let filtered = filter::apply(&table, &active, &spec);
    info!(
        "Filtered table has {} row(s) x {} column(s)",
        filtered.row_count(),
        filtered.column_count()
    );

    let mut chart = ChartSpec::new(args.kind.into()).trendline(args.trendline);
    chart.x = args.x.clone();
    chart.y = args.y.clone();
    chart.color = args.color.clone();
    chart.label = args.label.clone();
    print_json(&aggregate::aggregate(&filtered, &chart))
}
