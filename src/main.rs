use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use wikistat::api::{ClientConfig, MediaWikiClient};
use wikistat::config::{self, PipelineConfig};
use wikistat::pipeline::{self, RunReport};
use wikistat::profile::{EntityProfile, ProfileKind};
use wikistat::stats::RunStats;

#[derive(Parser)]
#[command(name = "wikistat")]
#[command(about = "Extract typed equipment and monster records from the OSRS wiki")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the profile's categories and write the result set
    Run(RunArgs),
    /// Fetch one page and print the records it would produce
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ClientArgs {
    /// MediaWiki action API endpoint
    #[arg(long, default_value = config::DEFAULT_API_URL)]
    api_url: String,

    /// User agent sent with every request
    #[arg(long, default_value = config::DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Minimum delay between requests in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_REQUEST_DELAY_MS)]
    delay_ms: u64,
}

impl ClientArgs {
    fn client(&self) -> Result<MediaWikiClient> {
        MediaWikiClient::new(ClientConfig {
            api_url: self.api_url.clone(),
            user_agent: self.user_agent.clone(),
            request_delay: Duration::from_millis(self.delay_ms),
            ..ClientConfig::default()
        })
    }
}

#[derive(Args)]
struct RunArgs {
    /// Entity profile to extract
    #[arg(short, long, value_enum)]
    profile: ProfileKind,

    /// Final output file; the checkpoint is written next to it
    #[arg(short, long)]
    output: PathBuf,

    /// Category to walk instead of the profile defaults (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Limit number of pages to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Highest versionN parameter probed per page
    #[arg(long, default_value_t = config::DEFAULT_MAX_VARIANTS)]
    max_variants: usize,

    /// Seed results from an existing checkpoint
    #[arg(long)]
    resume: bool,

    /// Write the run report (rejections, walk failures, counters) as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Args)]
struct InspectArgs {
    /// Entity profile to extract with
    #[arg(short, long, value_enum)]
    profile: ProfileKind,

    /// Page title
    title: String,

    #[arg(long, default_value_t = config::DEFAULT_MAX_VARIANTS)]
    max_variants: usize,

    #[command(flatten)]
    client: ClientArgs,
}

fn run_ingest(args: RunArgs) -> Result<()> {
    let client = args.client.client()?;
    let config = PipelineConfig {
        output: args.output,
        categories: args.categories,
        limit: args.limit,
        resume: args.resume,
        max_variants: args.max_variants,
    };

    let start = Instant::now();
    let report = pipeline::run_pipeline(&client, args.profile, &config)?;
    let duration = start.elapsed();
    info!(duration_secs = duration.as_secs_f64(), "Ingestion finished");

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }

    print_summary(&report, duration, client.request_count());
    Ok(())
}

fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .context("Failed to write run report")?;
    info!(path = ?path, "Run report written");
    Ok(())
}

fn print_summary(report: &RunReport, duration: Duration, requests: u64) {
    let stats = &report.stats;
    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", duration.as_secs_f64());
    println!("API requests:       {}", requests);
    println!(
        "Completed:          {}",
        if report.completed { "yes" } else { "no (checkpoint kept)" }
    );
    println!();
    println!("Pages seen:         {}", stats.pages_seen);
    println!("Pages fetched:      {}", stats.pages_fetched);
    println!("Fetch errors:       {}", stats.fetch_errors);
    println!("Walk errors:        {}", stats.walk_errors);
    println!("Records accepted:   {}", stats.records_accepted);
    println!("Records unchanged:  {}", stats.records_unchanged);
    println!("Records rejected:   {}", stats.records_rejected);
    println!("Images resolved:    {}", stats.images_resolved);
    println!("Variants truncated: {}", stats.variants_truncated);
    println!("Records in output:  {}", report.records);
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let client = args.client.client()?;
    let profile = EntityProfile::for_kind(args.profile)?.with_max_variants(args.max_variants)?;
    let stats = RunStats::new();

    let outcomes = match pipeline::evaluate_page(&client, &profile, &args.title, &stats) {
        Ok(outcomes) => outcomes,
        Err(reason) => {
            println!("{}: rejected ({})", args.title, reason);
            return Ok(());
        }
    };

    for (key, outcome) in outcomes {
        let label = key.display_name(&args.title);
        match outcome {
            Ok(record) => {
                let json = serde_json::to_string_pretty(&record)
                    .context("Failed to serialize record")?;
                println!("{}:\n{}", label, json);
            }
            Err(reason) => println!("{}: rejected ({})", label, reason),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Run(args) => run_ingest(args),
        Commands::Inspect(args) => run_inspect(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
