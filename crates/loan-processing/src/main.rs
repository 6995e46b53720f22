//! CLI entry point for the loan cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use loan_processing::{
    HighMissingPolicy, MissingValueProfile, Pipeline, PipelineConfig, ReportGenerator,
    SlabEdgePolicy, load_loan_data, save_dataset,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible high-missing policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingPolicy {
    /// Drop the fixed list of known sparse columns
    Fixed,
    /// Drop every column whose missing ratio reaches --missing-threshold
    Threshold,
}

/// CLI-compatible slab edge policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSlabEdges {
    /// Fail when two quantile edges coincide
    Reject,
    /// Keep coinciding edges and leave the collapsed slab empty
    Merge,
}

impl From<CliSlabEdges> for SlabEdgePolicy {
    fn from(cli: CliSlabEdges) -> Self {
        match cli {
            CliSlabEdges::Reject => SlabEdgePolicy::Reject,
            CliSlabEdges::Merge => SlabEdgePolicy::Merge,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Loan dataset cleaning and feature derivation",
    long_about = "Cleans a Lending Club loan export for default-risk analysis.\n\n\
                  Drops sparse and non-analytical columns, removes running loans,\n\
                  parses percentages and employment length, imputes gaps and derives\n\
                  the issue month and five equal-frequency slab features.\n\n\
                  EXAMPLES:\n  \
                  # Clean and save\n  \
                  loan-processing -i loan.csv -o cleaned.csv\n\n  \
                  # Default rate by interest slab and state\n  \
                  loan-processing -i loan.csv --group-by int_slab --group-by addr_state\n\n  \
                  # Recompute the sparse columns instead of using the fixed list\n  \
                  loan-processing -i loan.csv --missing-policy threshold --missing-threshold 0.5"
)]
struct Args {
    /// Path to the raw loan export (CSV or Parquet)
    #[arg(short, long)]
    input: String,

    /// Where to save the cleaned dataset (.csv or .parquet)
    #[arg(short, long)]
    output: Option<String>,

    /// JSON file with a full pipeline configuration
    ///
    /// Command line flags below override the values it sets.
    #[arg(short, long)]
    config: Option<String>,

    /// Column of the cleaned data to break the loan outcome down by (repeatable)
    #[arg(short, long = "group-by")]
    group_by: Vec<String>,

    /// Number of riskiest groups listed per --group-by column
    #[arg(long, default_value = "5")]
    top: usize,

    /// How columns with too many missing values are chosen
    #[arg(long, value_enum)]
    missing_policy: Option<CliMissingPolicy>,

    /// Missing ratio (0.0 - 1.0) at or above which a column is dropped
    ///
    /// Only used with `--missing-policy threshold`
    #[arg(long, default_value = "0.5")]
    missing_threshold: f64,

    /// What to do when two quantile edges of a slab feature coincide
    #[arg(long, value_enum)]
    slab_edges: Option<CliSlabEdges>,

    /// Fail when a column listed for removal is absent
    #[arg(long)]
    strict_drops: bool,

    /// Only profile missing values of the input, without cleaning
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to this file
    #[arg(short = 'r', long)]
    emit_report: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let raw = load_loan_data(Path::new(&args.input))?;

    if args.dry_run {
        run_dry_run(&args, &raw);
        return Ok(());
    }

    let config = build_config(&args)?;
    let pipeline = Pipeline::builder().config(config).build()?;

    let cleaned = match pipeline.clean(&raw) {
        Ok(cleaned) => cleaned,
        Err(e) => {
            error!("Cleaning failed [{}]", e.error_code());
            if e.is_data_error() {
                error!("A value in {} has to be fixed before rerunning", args.input);
            } else if e.is_schema_error() {
                error!("The input lacks a column the configuration needs");
            }
            return Err(e.into());
        }
    };

    if let Some(output) = &args.output {
        let mut frame = cleaned.frame.clone();
        save_dataset(&mut frame, Path::new(output))?;
    }

    let report = ReportGenerator::build_run_report(
        &args.input,
        args.output.as_deref(),
        &cleaned,
        &args.group_by,
        args.top,
    )?;

    if let Some(path) = &args.emit_report {
        ReportGenerator::write_report_to_file(&report, &PathBuf::from(path))?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        println!("{}", ReportGenerator::render_text(&report));
    }

    Ok(())
}

/// Assemble the configuration: defaults, then the `--config` file, then flags.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("Invalid config file: {}", path))?
        }
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfig::builder()
        .outcome_column(base.outcome_column)
        .unresolved_status(base.unresolved_status)
        .high_missing_policy(base.high_missing_policy)
        .non_analytical_columns(base.non_analytical_columns)
        .strict_column_drops(base.strict_column_drops || args.strict_drops)
        .percentage_columns(base.percentage_columns)
        .imputations(base.imputations)
        .employment_length_column(base.employment_length_column)
        .employment_length_imputation(base.employment_length_imputation)
        .issue_date_column(base.issue_date_column)
        .issue_month_column(base.issue_month_column)
        .slab_features(base.slab_features)
        .slab_edge_policy(base.slab_edge_policy);

    match args.missing_policy {
        Some(CliMissingPolicy::Fixed) => {
            builder = builder.high_missing_policy(HighMissingPolicy::default());
        }
        Some(CliMissingPolicy::Threshold) => {
            builder = builder.high_missing_policy(HighMissingPolicy::Threshold(args.missing_threshold));
        }
        None => {}
    }

    if let Some(edges) = args.slab_edges {
        builder = builder.slab_edge_policy(edges.into());
    }

    Ok(builder.build()?)
}

/// Print the missing-value profile of the raw input.
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn run_dry_run(args: &Args, raw: &polars::prelude::DataFrame) {
    let profile = MissingValueProfile::of(raw);

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Missing values of the raw input");
    println!("{}\n", "=".repeat(80));

    println!("  File: {}", args.input);
    println!("  Rows: {}", raw.height());
    println!("  Columns: {}", raw.width());
    println!();

    println!("{:<32} {:>10} {:>10}", "Column", "Missing", "Missing %");
    println!("{}", "-".repeat(54));
    for column in profile.columns.iter().filter(|c| c.missing > 0) {
        println!(
            "{:<32} {:>10} {:>9.1}%",
            column.name,
            column.missing,
            column.ratio * 100.0
        );
    }
    println!();

    println!("{:<32} {:>10}", "Missing cells per row", "Rows %");
    println!("{}", "-".repeat(43));
    for share in &profile.rows_by_missing_cells {
        println!("{:<32} {:>9.1}%", share.missing_cells, share.share * 100.0);
    }
}
