//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use treesum_core::{EchoInvoker, Invoker, SynthesisProgress, SynthesizerOptions, TreeSummarizer};
use treesum_provider::OpenRouterInvoker;
use treesum_shared::{
    AppConfig, RoundKind, RoundSummary, SynthesisReport, init_config, load_config,
    load_config_from,
};

use crate::passages::{self, SplitMode};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// treesum — answer questions over long documents by tree summarization.
#[derive(Parser)]
#[command(
    name = "treesum",
    version,
    about = "Answer a question over many passages by batch-wise tree summarization.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.treesum/treesum.toml.
    #[arg(long, global = true, env = "TREESUM_CONFIG")]
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
    /// Answer a question from passages read from files or stdin.
    Ask(AskArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `treesum ask`.
#[derive(clap::Args)]
pub(crate) struct AskArgs {
    /// The question to answer.
    pub question: String,

    /// Passage file(s), read in order. Reads stdin when omitted.
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// How inputs are cut into passages.
    #[arg(long, value_enum, default_value = "paragraphs")]
    pub split: SplitMode,

    /// Units per prompt (overrides config).
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Model identifier (overrides config).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Dispatch the batches of each round concurrently.
    #[arg(long)]
    pub parallel: bool,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Use an offline echo model instead of OpenRouter.
    #[arg(long)]
    pub dry_run: bool,
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
        0 => "treesum=info",
        1 => "treesum=debug",
        _ => "treesum=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Ask(args) => cmd_ask(resolve_config(config_path)?, &args),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(&resolve_config(config_path)?),
        },
    }
}

/// Load the config from `--config` when given, else from the home directory.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge `ask` flags over the loaded config.
fn apply_overrides(mut config: AppConfig, args: &AskArgs) -> AppConfig {
    if let Some(model) = &args.model {
        config.synthesizer.model = model.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.synthesizer.batch_size = batch_size;
    }
    if args.parallel {
        config.synthesizer.parallel = true;
    }
    config
}

fn cmd_ask(config: AppConfig, args: &AskArgs) -> Result<()> {
    let config = apply_overrides(config, args);
    let passages = passages::read_passages(&args.files, args.split)?;

    if passages.is_empty() {
        return Err(eyre!("no passages found in the input"));
    }

    info!(
        passages = passages.len(),
        batch_size = config.synthesizer.batch_size,
        model = %config.synthesizer.model,
        dry_run = args.dry_run,
        "answering question"
    );

    let options = SynthesizerOptions::from(&config.synthesizer);
    let report = if args.dry_run {
        synthesize(EchoInvoker::new(), options, &args.question, &passages)?
    } else {
        let invoker = OpenRouterInvoker::from_config(&config)?;
        synthesize(invoker, options, &args.question, &passages)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn synthesize<I: Invoker>(
    invoker: I,
    options: SynthesizerOptions,
    question: &str,
    passages: &[String],
) -> Result<SynthesisReport> {
    let summarizer = TreeSummarizer::new(invoker, options)?;
    let progress = CliProgress::new();
    let result = summarizer.synthesize_with_progress(question, passages, &progress);
    progress.finish();
    Ok(result?)
}

fn print_report(report: &SynthesisReport) {
    println!("{}", report.answer.trim());
    eprintln!();
    eprintln!("  Cost:        ${:.6}", report.total_cost);
    eprintln!(
        "  Invocations: {} across {} round(s)",
        report.invocations,
        report.rounds.len()
    );
    let dropped: usize = report.rounds.iter().map(|r| r.skipped).sum();
    if dropped > 0 {
        eprintln!("  Dropped:     {dropped} trailing answer(s)");
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl SynthesisProgress for CliProgress {
    fn round_started(&self, round: usize, kind: RoundKind, units: usize, batches: usize) {
        self.spinner.set_length(batches as u64);
        self.spinner.set_position(0);
        self.spinner.set_message(format!(
            "Round {round} ({kind}): {units} units in {batches} batches"
        ));
    }

    fn invocation_finished(&self, round: usize, batch: usize, _cost: f64) {
        self.spinner.inc(1);
        self.spinner.set_message(format!(
            "Round {round}: answered batch {batch} ({} done)",
            self.spinner.position()
        ));
    }

    fn round_finished(&self, summary: &RoundSummary) {
        info!(
            round = summary.round,
            kind = %summary.kind,
            invocations = summary.invocations,
            skipped = summary.skipped,
            cost = summary.cost,
            "round finished"
        );
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
