use std::path::PathBuf;

use clap::{Parser, Subcommand};
use settlesplit::config::SplitConfig;
use settlesplit::engine::{RunContext, SplitEngine, Summary};
use settlesplit::ports::ProgressSink;
use settlesplit::{Result, SplitError};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    match cli.command {
        Command::Split(args) => execute_split(args),
    }
}

fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| SplitError::Logging(error.to_string()))
}

fn execute_split(args: SplitArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(SplitError::MissingInput(args.input));
    }

    let config = match &args.config {
        Some(path) => SplitConfig::from_file(path)?,
        None => SplitConfig::default(),
    };

    std::fs::create_dir_all(&args.output_dir)?;

    let engine = SplitEngine::new(config);
    let mut progress = CliProgress::new(args.quiet);
    let mut ctx = RunContext::new(&mut progress);
    let summary = engine.run(&args.input, &args.output_dir, &mut ctx)?;

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report_summary(&summary);
    }

    Ok(())
}

fn report_summary(summary: &Summary) {
    println!("rows processed: {}", summary.rows_processed);
    println!("rows written:   {}", summary.rows_written());
    println!("rows skipped:   {}", summary.rows_skipped);
    println!("rows failed:    {}", summary.rows_failed.len());
    for failure in &summary.rows_failed {
        println!("  row {}: {}", failure.row, failure.reason);
    }
    println!("output: {}", summary.output_dir.display());
}

/// Progress rendering for the terminal. Repeated percentages are dropped so
/// reentrant delivery stays quiet.
struct CliProgress {
    quiet: bool,
    last: Option<u8>,
}

impl CliProgress {
    fn new(quiet: bool) -> Self {
        Self { quiet, last: None }
    }
}

impl ProgressSink for CliProgress {
    fn report(&mut self, percent: u8) {
        if self.quiet || self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        eprint!("\r{percent:>3}%");
        if percent == 100 {
            eprintln!();
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Split a master settlement workbook into per-counterparty statements."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split the master workbook into one output workbook per record.
    Split(SplitArgs),
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Master workbook holding the primary sheet and five auxiliary sheets.
    #[arg(long)]
    input: PathBuf,

    /// Directory receiving one output workbook per record.
    #[arg(long)]
    output_dir: PathBuf,

    /// Optional JSON file overriding the filter/range/removal tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    summary_json: bool,

    /// Suppress the progress indicator.
    #[arg(long)]
    quiet: bool,
}
