//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use trackfill_carriers::{
    AdapterRegistry, BatchSummary, ExecutorConfig, FetchExecutor, FetchObserver, LookupError,
    TracingObserver, build_adapter,
};
use trackfill_core::JobReport;
use trackfill_shared::{AppConfig, Outcome, init_config, load_config, load_config_from};
use trackfill_table::{locate_input, processed_path};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// trackfill: fill courier tracking status into ticket exports.
#[derive(Parser)]
#[command(
    name = "trackfill",
    version,
    about = "Filter a ticket export and fill in the latest courier tracking status.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.trackfill/trackfill.toml.
    #[arg(long, global = true, env = "TRACKFILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Filter a ticket export and enrich its tracking rows.
    Process {
        /// Input file, or a directory to search for the configured file prefix.
        input: Option<PathBuf>,

        /// Output file (defaults to <stem>_processed.<ext> next to the input).
        #[arg(short, long, conflicts_with = "in_place")]
        out: Option<PathBuf>,

        /// Overwrite the input file.
        #[arg(long)]
        in_place: bool,

        /// Maximum simultaneous lookups.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-lookup timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Overall deadline for each carrier batch in seconds.
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Print the job report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Look up a single tracking id with one carrier family.
    Lookup {
        /// Carrier family (e.g. bluedart, delhivery).
        #[arg(long)]
        family: String,

        /// Tracking id.
        tracking_id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "trackfill=info",
        1 => "trackfill=debug",
        _ => "trackfill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Process {
            input,
            out,
            in_place,
            concurrency,
            timeout_secs,
            deadline_secs,
            json,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(n) = concurrency {
                config.fetch.concurrency = n;
            }
            if let Some(secs) = timeout_secs {
                config.fetch.request_timeout_secs = secs;
            }
            if deadline_secs.is_some() {
                config.fetch.batch_deadline_secs = deadline_secs;
            }
            let target = OutputTarget::from_flags(out, in_place);
            cmd_process(&config, input, target, json).await
        }
        Command::Lookup {
            family,
            tracking_id,
        } => cmd_lookup(config_path, &family, &tracking_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

/// Where the processed table goes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OutputTarget {
    Path(PathBuf),
    InPlace,
    Default,
}

impl OutputTarget {
    fn from_flags(out: Option<PathBuf>, in_place: bool) -> Self {
        match (out, in_place) {
            (Some(path), _) => Self::Path(path),
            (None, true) => Self::InPlace,
            (None, false) => Self::Default,
        }
    }

    fn resolve(&self, input: &Path) -> PathBuf {
        match self {
            Self::Path(path) => path.clone(),
            Self::InPlace => input.to_path_buf(),
            Self::Default => processed_path(input),
        }
    }
}

/// A file is used as-is; a directory is searched for the configured prefix.
fn resolve_input(input: Option<PathBuf>, prefix: &str) -> Result<PathBuf> {
    let input = input.unwrap_or_else(|| PathBuf::from("."));
    if input.is_dir() {
        return Ok(locate_input(&input, prefix)?);
    }
    if !input.exists() {
        return Err(eyre!("input file '{}' does not exist", input.display()));
    }
    Ok(input)
}

async fn cmd_process(
    config: &AppConfig,
    input: Option<PathBuf>,
    target: OutputTarget,
    json: bool,
) -> Result<()> {
    config.validate()?;

    let input = resolve_input(input, &config.input.file_prefix)?;
    let output = target.resolve(&input);

    // Build adapters first so missing credentials fail before any fetch.
    let registry = AdapterRegistry::from_config(&config.carriers)?;
    let executor = FetchExecutor::new(ExecutorConfig::from(&config.fetch))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        concurrency = config.fetch.concurrency,
        "processing ticket export"
    );

    let progress = CliProgress::new();
    let report =
        trackfill_core::process_file(&input, &output, config, &registry, &executor, &progress)
            .await?;
    progress.finish();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &JobReport) {
    println!();
    println!("  Export processed.");
    println!("  Job:      {}", report.job_id);
    if let Some(output) = &report.output {
        println!("  Output:   {}", output.display());
    }
    println!("  Rows:     {} in, {} out", report.rows_in, report.rows_out);
    println!(
        "  Filtered: {} closed, {} agent, {} category",
        report.filters.closed_removed,
        report.filters.agents_removed,
        report.filters.categories_removed
    );
    if !report.enrichment_ran {
        println!("  Lookups:  skipped (courier or tracking column missing)");
    }
    for family in &report.families {
        println!(
            "  {:<9} {} ids, {} found, {} not found, {} failed",
            format!("{}:", family.family),
            family.unique_ids,
            family.found,
            family.not_found,
            family.failed
        );
    }
    println!("  Enriched: {} rows", report.merge.rows_enriched);
    println!(
        "  Time:     {:.1}s",
        Duration::from_millis(u64::try_from(report.elapsed_ms).unwrap_or(u64::MAX)).as_secs_f64()
    );
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress bar per carrier batch; failures are logged above the bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg:<10} [{bar:30}] {pos}/{len}")
                .unwrap()
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl FetchObserver for CliProgress {
    fn batch_started(&self, family: &str, total: usize) {
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(family.to_string());
        self.bar.suspend(|| TracingObserver.batch_started(family, total));
    }

    fn item_finished(&self, _family: &str, _tracking_id: &str, _outcome: &Outcome) {
        self.bar.inc(1);
    }

    fn lookup_failed(&self, family: &str, tracking_id: &str, error: &LookupError) {
        self.bar
            .suspend(|| TracingObserver.lookup_failed(family, tracking_id, error));
    }

    fn batch_finished(&self, summary: &BatchSummary) {
        self.bar.suspend(|| TracingObserver.batch_finished(summary));
    }
}

// ---------------------------------------------------------------------------
// lookup
// ---------------------------------------------------------------------------

async fn cmd_lookup(config_path: Option<&Path>, family: &str, tracking_id: &str) -> Result<()> {
    let config = resolve_config(config_path)?;
    config.validate()?;

    let carrier = config
        .carriers
        .iter()
        .find(|c| c.family == family)
        .ok_or_else(|| eyre!("unknown carrier family '{family}'"))?;
    let adapter = build_adapter(carrier, &|name: &str| std::env::var(name).ok())?;
    let executor = FetchExecutor::new(ExecutorConfig::from(&config.fetch))?;

    info!(family, tracking_id, "looking up tracking id");
    let outcome = executor
        .client_for(adapter)
        .fetch(tracking_id, &TracingObserver)
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_process_flags() {
        let cli = Cli::try_parse_from([
            "trackfill",
            "-vv",
            "process",
            "exports/",
            "--concurrency",
            "4",
            "--deadline-secs",
            "60",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Process {
                input,
                concurrency,
                deadline_secs,
                json,
                in_place,
                ..
            } => {
                assert_eq!(input, Some(PathBuf::from("exports/")));
                assert_eq!(concurrency, Some(4));
                assert_eq!(deadline_secs, Some(60));
                assert!(json);
                assert!(!in_place);
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn out_conflicts_with_in_place() {
        let result =
            Cli::try_parse_from(["trackfill", "process", "a.csv", "--out", "b.csv", "--in-place"]);
        assert!(result.is_err());
    }

    #[test]
    fn output_target_resolution() {
        let input = Path::new("/data/mydata_jan.csv");
        assert_eq!(
            OutputTarget::from_flags(None, false).resolve(input),
            PathBuf::from("/data/mydata_jan_processed.csv")
        );
        assert_eq!(
            OutputTarget::from_flags(None, true).resolve(input),
            input.to_path_buf()
        );
        assert_eq!(
            OutputTarget::from_flags(Some("out.csv".into()), false).resolve(input),
            PathBuf::from("out.csv")
        );
    }

    #[test]
    fn missing_input_file_is_reported() {
        let err = resolve_input(Some(PathBuf::from("/nonexistent/mydata_x.csv")), "mydata_")
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
