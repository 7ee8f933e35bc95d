use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::aggregate::ChartKind;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean, geolocate and classify tabular uploads",
    long_about = None
)]
pub struct Cli {
    /// YAML policy file overriding the pipeline defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean a file and preview the result
    Clean(CleanArgs),
    /// Print the semantic category of every cleaned column as JSON
    Classify(InputArgs),
    /// Print the preselected active columns as JSON
    Select(InputArgs),
    /// Filter the cleaned table and print a chart series as JSON
    Chart(ChartArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file (CSV, TSV, Excel, JSON or GeoJSON)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to preview
    #[arg(long, default_value_t = 10)]
    pub preview: usize,
    /// Emit the whole cleaned table as split-orientation JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ChartKindArg {
    Bar,
    Pie,
    Histogram,
    Box,
    Line,
    Scatter,
    Map,
}

impl From<ChartKindArg> for ChartKind {
    fn from(value: ChartKindArg) -> Self {
        match value {
            ChartKindArg::Bar => ChartKind::Bar,
            ChartKindArg::Pie => ChartKind::Pie,
            ChartKindArg::Histogram => ChartKind::Histogram,
            ChartKindArg::Box => ChartKind::Box,
            ChartKindArg::Line => ChartKind::Line,
            ChartKindArg::Scatter => ChartKind::Scatter,
            ChartKindArg::Map => ChartKind::Map,
        }
    }
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Chart to compute
    #[arg(long, value_enum)]
    pub kind: ChartKindArg,
    /// X column (category, time or histogram column)
    #[arg(long)]
    pub x: Option<String>,
    /// Y column (numeric measure)
    #[arg(long)]
    pub y: Option<String>,
    /// Color/group column for scatter and map charts
    #[arg(long)]
    pub color: Option<String>,
    /// Hover label column for map charts
    #[arg(long)]
    pub label: Option<String>,
    /// Fit a least-squares line through scatter points
    #[arg(long)]
    pub trendline: bool,
    /// Active columns (comma-separated); the preselection when omitted
    #[arg(long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Column for the equality filter
    #[arg(long = "filter-col")]
    pub filter_col: Option<String>,
    /// Value for the equality filter (the configured all-token disables it)
    #[arg(long = "filter-val")]
    pub filter_val: Option<String>,
    /// Time column for the period filter
    #[arg(long = "time-col")]
    pub time_col: Option<String>,
    /// Periods (years) to keep; repeatable
    #[arg(long = "period", action = clap::ArgAction::Append)]
    pub periods: Vec<String>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn chart_arguments_parse() {
        let cli = Cli::try_parse_from([
            "geotable",
            "chart",
            "-i",
            "data.csv",
            "--kind",
            "bar",
            "--x",
            "species",
            "--period",
            "2010",
            "--period",
            "2011",
            "--config",
            "policy.yaml",
        ])
        .expect("parse chart args");
        assert!(cli.config.is_some());
        let Commands::Chart(args) = cli.command else {
            panic!("expected chart command");
        };
        assert_eq!(args.kind, ChartKindArg::Bar);
        assert_eq!(args.periods, vec!["2010", "2011"]);
    }
}
