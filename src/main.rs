use anyhow::{Context, Result};
use clap::Parser;
use price_ingest::{
    CommitMode, IngestionLoop, IngestionOptions, PipelineConfig, ProgressReporter, SqliteSink,
    StatisticsAccumulator,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "price-ingest")]
#[command(about = "Load CSV price files into SQLite and report price statistics")]
struct Args {
    /// CSV files to load, in order (replaces csv_files from the config)
    files: Vec<PathBuf>,

    /// Path to the JSON pipeline config
    #[arg(short, long, default_value = "pipeline.json")]
    config: PathBuf,

    /// SQLite database file
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Target table name
    #[arg(long)]
    table: Option<String>,

    /// Rows per micro-batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Commit once per micro-batch instead of once per row
    #[arg(long)]
    per_batch_commit: bool,

    /// Do not wait for confirmation before querying
    #[arg(short, long)]
    yes: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    std::process::exit(exit_code(run(args)));
}

/// Log a fatal error once and map the outcome to a process exit code
fn exit_code(outcome: Result<()>) -> i32 {
    match outcome {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    if let Some(db_path) = &args.db_path {
        config.db_path = db_path.clone();
    }
    if let Some(table) = &args.table {
        config.table_name = table.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.micro_batch_size = batch_size;
    }
    if args.per_batch_commit {
        config.commit_mode = CommitMode::PerBatch;
    }
    if !args.files.is_empty() {
        config.csv_files = args.files.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    info!(
        "Loading {} file(s) into {} ({}), batch size {}, {:?} commits",
        config.csv_files.len(),
        config.table_name,
        config.db_path.display(),
        config.micro_batch_size,
        config.commit_mode
    );

    let mut sink = SqliteSink::open(&config.db_path, &config.table_name)?;
    let baseline_rows = sink.row_count()?;
    if baseline_rows > 0 {
        info!(
            "Table {} already holds {} row(s); new rows will be appended",
            config.table_name, baseline_rows
        );
    }

    let mut accumulator = StatisticsAccumulator::new();
    let summary = IngestionLoop::new(&mut sink, IngestionOptions::from(&config))
        .with_reporter(ProgressReporter::stdout())
        .run_files(config.csv_files.as_slice(), &mut accumulator)?;

    if !args.yes {
        wait_for_confirmation()?;
    }

    let statistics = sink.query_statistics()?;

    let consistent = if baseline_rows == 0 {
        let agrees = statistics.agrees_with(&summary.statistics);
        if !agrees {
            warn!(
                "Persisted statistics {:?} disagree with accumulated {:?}",
                statistics, summary.statistics
            );
        }
        Some(agrees)
    } else {
        None
    };

    if args.json {
        let report = serde_json::json!({
            "ingestion": summary,
            "statistics": statistics,
            "consistent": consistent,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\nSTATISTICS FROM DATABASE QUERY:");
        println!("{}", statistics.render());
    }

    Ok(())
}

fn wait_for_confirmation() -> io::Result<()> {
    print!(
        "\n*** press enter to query the database for total rows, mean, min and max of \"price\" *** "
    );
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(())
}
