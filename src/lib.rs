pub mod analysis;
pub mod cli;
pub mod config;
pub mod conservation;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod io_utils;
pub mod keywords;
pub mod levels;
pub mod orphans;
pub mod presets;
pub mod profile;
pub mod property;
pub mod table;
pub mod taxonomy;
pub mod uom;
pub mod value;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

pub use crate::{
    analysis::{AnalysisResult, analyze, analyze_with_trace},
    config::AnalysisConfig,
    diagnostics::{Stage, Trace, TraceEntry},
    error::{AnalysisError, AnalysisOutcome},
    hierarchy::{HierarchyLevel, TERMINAL_LEVEL_NAME},
    value::Cell,
};

use crate::cli::{Cli, Commands, InputArgs, OutputFormat, ThresholdArgs};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("pim_hierarchy", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => handle_analyze(&args),
        Commands::Profile(args) => handle_profile(&args.input, &args.thresholds),
        Commands::Presets(args) => handle_presets(&args.input, &args.thresholds),
        Commands::Tree(args) => handle_tree(&args.input, &args.thresholds, args.depth),
    }
}

/// Config file first, then individual flags on top.
fn resolve_config(args: &ThresholdArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Loading analysis config from {path:?}"))?,
        None => AnalysisConfig::default(),
    };
    if let Some(value) = args.parent_threshold {
        config.parent_threshold = value;
    }
    if let Some(value) = args.children_min {
        config.children_min = value;
    }
    if let Some(value) = args.children_max {
        config.children_max = value;
    }
    if let Some(value) = args.sku_threshold {
        config.sku_threshold = value;
    }
    if let Some(value) = args.min_properties {
        config.min_properties_per_level = value;
    }
    if !args.forced_sku.is_empty() {
        config.forced_sku_headers.extend(args.forced_sku.iter().cloned());
    }
    debug!("Analysis config: {config:?}");
    Ok(config)
}

fn load_and_analyze(input: &InputArgs, thresholds: &ThresholdArgs) -> Result<(AnalysisResult, Trace)> {
    let delimiter = io_utils::resolve_input_delimiter(&input.input, input.delimiter);
    info!(
        "Analyzing '{}' with delimiter '{}'",
        input.input.display(),
        printable_delimiter(delimiter)
    );
    let config = resolve_config(thresholds)?;
    let (headers, rows) =
        io_utils::read_table(&input.input, Some(delimiter), input.input_encoding.as_deref())
            .with_context(|| format!("Reading table from {:?}", input.input))?;
    let (result, trace) = analyze_with_trace(&headers, &rows, &config)
        .with_context(|| format!("Analyzing {:?}", input.input))?;
    info!(
        "Inferred {} level(s) over {} column(s) and {} row(s), confidence {:.2}",
        result.hierarchy.len(),
        result.column_count,
        result.row_count,
        result.confidence
    );
    Ok((result, trace))
}

#[derive(Serialize)]
struct TracedResult<'a> {
    result: &'a AnalysisResult,
    trace: &'a [TraceEntry],
}

fn handle_analyze(args: &cli::AnalyzeArgs) -> Result<()> {
    let (result, trace) = load_and_analyze(&args.input, &args.thresholds)?;
    let mut writer = io_utils::open_output(args.output.as_deref())?;
    if args.trace {
        write_document(
            &mut writer,
            &TracedResult {
                result: &result,
                trace: trace.entries(),
            },
            args.format,
        )?;
    } else {
        write_document(&mut writer, &result, args.format)?;
    }
    writer.flush().context("Flushing analysis output")?;
    if let Some(path) = &args.output {
        info!("Analysis written to {path:?}");
    }
    Ok(())
}

fn write_document<T: Serialize>(writer: &mut dyn Write, value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, value).context("Serializing analysis JSON")?;
            writeln!(writer).context("Writing analysis output")?;
        }
        OutputFormat::Yaml => {
            serde_yaml::to_writer(&mut *writer, value).context("Serializing analysis YAML")?;
        }
    }
    Ok(())
}

fn handle_profile(input: &InputArgs, thresholds: &ThresholdArgs) -> Result<()> {
    let (result, _) = load_and_analyze(input, thresholds)?;
    print!(
        "{}",
        table::render_column_stats(&result.column_stats, &result.hierarchy)
    );
    Ok(())
}

fn handle_presets(input: &InputArgs, thresholds: &ThresholdArgs) -> Result<()> {
    let (result, _) = load_and_analyze(input, thresholds)?;
    print!("{}", table::render_presets(&result.presets));
    Ok(())
}

fn handle_tree(input: &InputArgs, thresholds: &ThresholdArgs, depth: Option<usize>) -> Result<()> {
    let (result, _) = load_and_analyze(input, thresholds)?;
    print!("{}", table::render_tree(&result.taxonomy_tree, depth));
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
