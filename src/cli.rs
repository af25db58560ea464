use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer PIM import hierarchies from product spreadsheets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full analysis and emit the result as JSON or YAML
    Analyze(AnalyzeArgs),
    /// Print per-column statistics and hierarchy scores
    Profile(ProfileArgs),
    /// Print the alternative hierarchy presets
    Presets(PresetsArgs),
    /// Print the taxonomy tree with row counts
    Tree(TreeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Options shared by every subcommand that reads a table.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV or TSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

/// Threshold overrides applied on top of the defaults or a config file.
#[derive(Debug, Args)]
pub struct ThresholdArgs {
    /// YAML or JSON file holding analysis thresholds
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Cardinality at or below which a column is labelled parent
    #[arg(long = "parent-threshold")]
    pub parent_threshold: Option<f64>,
    /// Lower bound of the children cardinality band
    #[arg(long = "children-min")]
    pub children_min: Option<f64>,
    /// Upper bound of the children cardinality band
    #[arg(long = "children-max")]
    pub children_max: Option<f64>,
    /// Cardinality at or above which a column is forced to the SKU level
    #[arg(long = "sku-threshold")]
    pub sku_threshold: Option<f64>,
    /// Minimum member count of a non-terminal level
    #[arg(long = "min-properties")]
    pub min_properties: Option<usize>,
    /// Header to pin to the SKU level (repeatable)
    #[arg(long = "forced-sku", action = clap::ArgAction::Append)]
    pub forced_sku: Vec<String>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
    /// Output file (defaults to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Serialization format of the result
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,
    /// Include the per-stage decision trace in the output
    #[arg(long)]
    pub trace: bool,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Debug, Args)]
pub struct PresetsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
    /// Maximum depth to print (the tree itself holds at most four levels)
    #[arg(long)]
    pub depth: Option<usize>,
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
