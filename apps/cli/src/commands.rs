//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{info, warn};

use socialsync_core::pipeline::{ProgressReporter, Stage, SyncInput, SyncPipeline};
use socialsync_core::report::{
    CompetitorInput, OpenRouterClient, SentimentPipeline, run_competitor_analysis,
};
use socialsync_fetch::adapter_for;
use socialsync_shared::{
    AppConfig, MergeMode, Owner, Platform, SyncStatus, init_config, load_config,
};
use socialsync_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SocialSync: staged social media ingestion and reporting.
#[derive(Parser)]
#[command(
    name = "socialsync",
    version,
    about = "Sync Facebook and Instagram posts and comments into a local database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Fetch posts and comments from a platform and merge them into the store.
    Sync {
        /// Platform to sync: facebook or instagram.
        platform: Platform,

        /// Number of posts to fetch (defaults to config, then 5).
        #[arg(long)]
        post_limit: Option<u32>,

        /// Comments kept per post (defaults to config, then 5).
        #[arg(long)]
        comment_limit: Option<u32>,

        /// Database file (defaults to config).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Merge mode: atomic or split-phase.
        #[arg(long)]
        merge_mode: Option<MergeMode>,
    },

    /// Write one sentiment report per post from stored comments.
    Sentiment {
        /// Platform whose comments to analyze.
        platform: Platform,

        /// Database file (defaults to config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Run a social media competitor analysis.
    Competitor {
        /// Your company.
        #[arg(long)]
        company: String,

        /// Industry both companies operate in.
        #[arg(long)]
        industry: String,

        /// Competitor to analyze.
        #[arg(long)]
        competitor: String,

        /// Database file (defaults to config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Print stored rows as JSON.
    Show {
        /// What to show.
        #[arg(value_enum)]
        what: ShowTarget,

        /// Only rows for this platform.
        #[arg(long)]
        platform: Option<Platform>,

        /// Database file (defaults to config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum ShowTarget {
    Posts,
    Comments,
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

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries JSON output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "socialsync=info",
        1 => "socialsync=debug",
        _ => "socialsync=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    match cli.command {
        Command::Sync {
            platform,
            post_limit,
            comment_limit,
            db,
            merge_mode,
        } => cmd_sync(platform, post_limit, comment_limit, db, merge_mode).await,
        Command::Sentiment { platform, db } => cmd_sentiment(platform, db).await,
        Command::Competitor {
            company,
            industry,
            competitor,
            db,
        } => {
            let input = CompetitorInput {
                company,
                industry,
                competitor,
            };
            cmd_competitor(input, db).await
        }
        Command::Show { what, platform, db } => cmd_show(what, platform, db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// `--db` flag, else the configured path.
fn resolve_db(config: &AppConfig, db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(config.database.resolved_path()?),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(
    platform: Platform,
    post_limit: Option<u32>,
    comment_limit: Option<u32>,
    db: Option<PathBuf>,
    merge_mode: Option<MergeMode>,
) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db(&config, db)?;
    let platform_config = config.platforms.get(platform);

    let input = SyncInput {
        post_limit: Some(post_limit.unwrap_or(config.defaults.post_limit)),
        comment_limit: Some(comment_limit.unwrap_or(config.defaults.comment_limit)),
    };
    let merge_mode = merge_mode.unwrap_or(config.defaults.merge_mode);

    info!(
        %platform,
        db = %db_path.display(),
        ?merge_mode,
        "starting sync"
    );

    let adapter = adapter_for(platform, &config.platforms)?;
    let pipeline = SyncPipeline::new(adapter, platform_config.credentials(), db_path)
        .with_owner(Owner::from(&config.owner))
        .with_merge_mode(merge_mode);

    let reporter = CliProgress::new();
    let output = pipeline.run(input, &reporter).await;
    reporter.finish();

    print_json(&output)?;
    if output.status == SyncStatus::Error {
        return Err(eyre!("sync failed: {}", output.message));
    }
    Ok(())
}

async fn cmd_sentiment(platform: Platform, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db(&config, db)?;
    let client = OpenRouterClient::from_config(&config)?;

    info!(%platform, model = %config.openrouter.sentiment_model, "starting sentiment analysis");

    let pipeline = SentimentPipeline::new(
        Box::new(client),
        platform,
        db_path,
        config.openrouter.sentiment_model.clone(),
    )
    .with_max_tokens(config.openrouter.max_tokens)
    .with_user_id(config.owner.user_id);

    let spinner = spinner("Analyzing comments");
    let output = pipeline.run().await;
    spinner.finish_and_clear();

    print_json(&output)?;
    if output.status == SyncStatus::Error {
        return Err(eyre!("sentiment analysis failed: {}", output.message));
    }
    Ok(())
}

async fn cmd_competitor(input: CompetitorInput, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db(&config, db)?;
    let client = OpenRouterClient::from_config(&config)?;

    let store = match Storage::open(&db_path).await {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "database unavailable, report will not be persisted");
            None
        }
    };

    let spinner = spinner(&format!("Analyzing {}", input.competitor));
    let result = run_competitor_analysis(
        &client,
        store.as_ref(),
        &input,
        &config.openrouter.competitor_model,
        config.openrouter.max_tokens,
    )
    .await;
    spinner.finish_and_clear();

    print_json(&result?)
}

async fn cmd_show(what: ShowTarget, platform: Option<Platform>, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db(&config, db)?;
    let store = Storage::open(&db_path).await?;

    let rows: Value = match what {
        ShowTarget::Posts => serde_json::to_value(store.list_posts(platform).await?)?,
        ShowTarget::Comments => serde_json::to_value(store.list_comments(platform).await?)?,
    };
    print_json(&rows)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(
            style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Mirrors pipeline stages onto an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: spinner("Starting sync"),
        }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage, status: SyncStatus, message: &str) {
        if status.is_error() {
            self.spinner.println(format!("  {stage}: {message}"));
        }
        self.spinner.set_message(format!("[{stage}] {status}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::try_parse_from([
            "socialsync",
            "-v",
            "sync",
            "instagram",
            "--post-limit",
            "2",
            "--merge-mode",
            "split-phase",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Sync {
                platform,
                post_limit,
                comment_limit,
                merge_mode,
                ..
            } => {
                assert_eq!(platform, Platform::Instagram);
                assert_eq!(post_limit, Some(2));
                assert_eq!(comment_limit, None);
                assert_eq!(merge_mode, Some(MergeMode::SplitPhase));
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["socialsync", "sync", "myspace"]).is_err());
    }

    #[test]
    fn parses_show_and_competitor() {
        let cli = Cli::try_parse_from(["socialsync", "show", "comments", "--platform", "fb"])
            .expect("parse show");
        assert!(matches!(
            cli.command,
            Command::Show {
                what: ShowTarget::Comments,
                platform: Some(Platform::Facebook),
                ..
            }
        ));

        let cli = Cli::try_parse_from([
            "socialsync",
            "competitor",
            "--company",
            "Acme",
            "--industry",
            "Retail",
            "--competitor",
            "Globex",
        ])
        .expect("parse competitor");
        assert!(matches!(cli.command, Command::Competitor { .. }));
    }
}
