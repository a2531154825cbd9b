//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use folio_core::config::{Config, paths};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version)]
#[command(about = "Terminal portfolio browser")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Inspect and warm the page catalogue
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage persisted session state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(clap::Subcommand)]
enum CatalogCommands {
    /// List categories and their pages
    List,
    /// Resolve one page and print its body
    Show {
        /// The id of the page to show
        #[arg(value_name = "PAGE_ID")]
        id: String,
    },
    /// Warm every deferred page of a category
    Preload {
        /// The category to warm
        #[arg(value_name = "CATEGORY")]
        category: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
    /// Persist the startup theme (dark or light)
    Theme {
        /// Theme name
        #[arg(value_name = "THEME")]
        value: String,
    },
}

#[derive(clap::Subcommand)]
enum StateCommands {
    /// Print the persisted session state
    Show,
    /// Clear the persisted session state
    Reset,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Interactive mode must not write logs to the terminal it draws on.
    let _log_guard = init_tracing(cli.command.is_none());

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // default to the interactive browser
    let Some(command) = cli.command else {
        let config = Config::load().context("load config")?;
        tracing::info!(
            theme = config.theme.display_name(),
            category = %config.default_category,
            "starting interactive browser"
        );
        return folio_tui::run_browser(&config).await;
    };

    match command {
        Commands::Catalog { command } => match command {
            CatalogCommands::List => commands::catalog::list(),
            CatalogCommands::Show { id } => commands::catalog::show(&id).await,
            CatalogCommands::Preload { category } => commands::catalog::preload(&category).await,
        },

        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
            ConfigCommands::Theme { value } => commands::config::theme(&value),
        },

        Commands::State { command } => match command {
            StateCommands::Show => commands::state::show(),
            StateCommands::Reset => commands::state::reset(),
        },
    }
}

/// Initializes tracing.
///
/// Plain commands log to stderr. The interactive browser logs to a daily
/// file under FOLIO_HOME/logs instead - stderr would corrupt the alternate
/// screen. Returns the appender guard that must stay alive for the file
/// writer to flush.
fn init_tracing(interactive: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    if interactive {
        let logs_dir = paths::logs_dir();
        if let Err(err) = std::fs::create_dir_all(&logs_dir) {
            // No log dir: better to run unlogged than to scribble over the UI.
            eprintln!("warning: cannot create {}: {err}", logs_dir.display());
            return None;
        }
        let appender = tracing_appender::rolling::daily(logs_dir, "folio.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}
