//! attnlab CLI: plan and build attention indexes.
//!
//! Commands:
//! - `build`: run the full pipeline against a simulated source and export
//!   the artifacts
//! - `plan`: dry run, print the date windows and keyword batches

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use attnlab_core::data::{InterestSource, SimulatedSource};
use attnlab_core::plan::keywords::needs_benchmark;
use attnlab_core::plan::{plan_batches, reference_term, BenchmarkMode, COMBINE_SEPARATOR};
use attnlab_core::{Frequency, TracingObserver};
use attnlab_runner::{export_run, pacer_for, plan_run, run_index, IndexConfig, IndexRun};

#[derive(Parser)]
#[command(
    name = "attnlab",
    about = "attnlab: stitched, standardized attention indexes from search interest"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index and write its artifacts.
    Build {
        #[command(flatten)]
        input: ConfigArgs,

        /// Ground-truth CSV for the simulated source (`date` column, then
        /// one column per keyword).
        #[arg(long, conflicts_with = "synthetic")]
        truth: Option<PathBuf>,

        /// Seed for a synthetic ground truth covering the run's range.
        #[arg(long)]
        synthetic: Option<u64>,

        /// Skip the pauses between requests.
        #[arg(long, default_value_t = false)]
        no_slowdown: bool,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Print the request plan without fetching anything.
    Plan {
        #[command(flatten)]
        input: ConfigArgs,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keywords (comma-separated). Replaces the config's list.
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Output frequency: daily, weekly, monthly or quarterly.
    #[arg(long)]
    frequency: Option<Frequency>,

    /// Benchmark mode: first or adaptive.
    #[arg(long)]
    benchmark: Option<BenchmarkMode>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Build {
            input,
            truth,
            synthetic,
            no_slowdown,
            output_dir,
        } => {
            let mut config = load_config(&input)?;
            if no_slowdown {
                config.index.slowdown = false;
            }
            run_build(&config, truth, synthetic, &output_dir, today)
        }
        Commands::Plan { input } => run_plan(&load_config(&input)?, today),
    }
}

fn parse_date(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("--{flag} expects YYYY-MM-DD, got '{s}'"))
        })
        .transpose()
}

/// Config file (if any) with command-line overrides applied.
fn load_config(args: &ConfigArgs) -> Result<IndexConfig> {
    let mut config = match &args.config {
        Some(path) => IndexConfig::from_file(path)?,
        None if args.keywords.is_empty() => bail!("one of --config or --keywords is required"),
        None => IndexConfig::for_keywords(args.keywords.clone()),
    };

    if !args.keywords.is_empty() {
        config.index.keywords = args.keywords.iter().map(|k| k.trim().to_string()).collect();
    }
    if let Some(start) = parse_date("start", args.start.as_deref())? {
        config.index.start_date = Some(start);
    }
    if let Some(end) = parse_date("end", args.end.as_deref())? {
        config.index.end_date = Some(end);
    }
    if let Some(frequency) = args.frequency {
        config.index.frequency = frequency;
    }
    if let Some(benchmark) = args.benchmark {
        config.index.benchmark = benchmark;
    }
    config.validate()?;
    Ok(config)
}

/// Every plain term the source must know: the keywords themselves, the parts
/// of combined terms and, for adaptive runs, the reference term.
fn source_terms(config: &IndexConfig) -> Result<Vec<String>> {
    let mut terms: Vec<String> = Vec::new();
    for keyword in &config.index.keywords {
        for part in keyword.split(COMBINE_SEPARATOR) {
            if !terms.iter().any(|t| t == part) {
                terms.push(part.to_string());
            }
        }
    }
    if config.index.benchmark == BenchmarkMode::Adaptive {
        let reference = reference_term(&config.index.language)?.to_string();
        if !terms.contains(&reference) {
            terms.push(reference);
        }
    }
    Ok(terms)
}

fn run_build(
    config: &IndexConfig,
    truth: Option<PathBuf>,
    synthetic: Option<u64>,
    output_dir: &std::path::Path,
    today: NaiveDate,
) -> Result<()> {
    let plan = plan_run(config, today)?;
    let source = match (truth, synthetic) {
        (Some(path), _) => SimulatedSource::from_csv_path(&path)
            .with_context(|| format!("loading ground truth from {}", path.display()))?,
        (None, Some(seed)) => {
            SimulatedSource::synthetic(&source_terms(config)?, plan.range.start, plan.range.end, seed)?
        }
        (None, None) => bail!(
            "no interest source available: pass --truth <CSV> or --synthetic <SEED> for an offline run"
        ),
    };
    // the service reports the current day as incomplete
    let source = if plan.range.end >= today {
        source.with_partial_from(today)
    } else {
        source
    };

    let pacer = pacer_for(config);
    let run = run_index(config, &source, pacer.as_ref(), &TracingObserver, today)?;
    print_summary(&run);

    let paths = export_run(&run, config, source.name(), output_dir)?;
    println!("Artifacts saved to: {}", paths.run_dir.display());
    Ok(())
}

fn run_plan(config: &IndexConfig, today: NaiveDate) -> Result<()> {
    let plan = plan_run(config, today)?;
    println!("Range:     {} to {}", plan.range.start, plan.range.end);
    println!("Frequency: {}", config.index.frequency);
    println!("Windows:   {}", plan.windows.len());
    for (i, window) in plan.windows.iter().enumerate() {
        println!("  {i:>3}  {} .. {}  ({} days)", window.start, window.end, window.span_days() + 1);
    }

    let batch_cap = config.limits.batch_cap;
    if config.index.benchmark == BenchmarkMode::Adaptive && needs_benchmark(plan.keywords.len(), batch_cap) {
        println!(
            "Benchmark: chosen by probing against '{}'",
            reference_term(&config.index.language)?
        );
        return Ok(());
    }

    let batches = plan_batches(&plan.keywords, batch_cap, None)?;
    if let Some(benchmark) = &batches.benchmark {
        println!("Benchmark: {benchmark}");
    }
    println!(
        "Batches:   {} ({} requests)",
        batches.batches.len(),
        batches.batches.len() * plan.windows.len()
    );
    for (i, batch) in batches.batches.iter().enumerate() {
        println!("  {i:>3}  {}", batch.join(", "));
    }
    for warning in &plan.warnings {
        println!("Warning:   {warning}");
    }
    Ok(())
}

fn print_summary(run: &IndexRun) {
    println!();
    println!("=== {} ===", run.index.name);
    println!("Range:       {} to {}", run.range.start, run.range.end);
    println!(
        "Requests:    {} window(s) x {} batch(es)",
        run.windows.len(),
        run.plan.batches.len()
    );
    if let Some(benchmark) = &run.plan.benchmark {
        println!("Benchmark:   {benchmark}");
    }
    println!("Daily rows:  {}", run.stitched.len());
    println!("Periods:     {}", run.index.len());

    let tail = run.index.len().saturating_sub(5);
    for (date, value) in run.index.dates[tail..].iter().zip(&run.index.values[tail..]) {
        println!("  {date}  {value:>8.3}");
    }
    for warning in &run.warnings {
        println!("Warning:     {warning}");
    }
    println!();
}
