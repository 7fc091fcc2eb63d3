//! # Lost & Found
//!
//! Command-line entry point: database setup, the HTTP server and the
//! maintenance commands.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lostfound::cli::{cmd_init, cmd_match, cmd_search, cmd_seed, cmd_stats, open_catalog};
use lostfound::config::ServerConfig;
use lostfound::notifier::{LogNotifier, Notifier};
use lostfound::api;
use lostfound_core::{Category, ItemType, SearchQuery};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lostfound", version, about = "Lost & Found catalog server")]
struct Cli {
    /// Database path
    #[arg(long, global = true, default_value = "lostfound.db")]
    db: PathBuf,

    /// Storage backend: file or redb
    #[arg(long, global = true, default_value = "file")]
    backend: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Bind host (overrides LOSTFOUND_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides LOSTFOUND_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Load sample users and items
    Seed,
    /// Run batch matching over approved items
    Match {
        /// Also send match notifications and reminders
        #[arg(long)]
        notify: bool,
    },
    /// Print catalog statistics
    Stats {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Search approved items
    Search {
        /// Free-text query
        query: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        item_type: Option<ItemType>,
        #[arg(long)]
        location: Option<String>,
        /// Earliest date, YYYY-MM-DD
        #[arg(long)]
        date_from: Option<NaiveDate>,
        /// Latest date, YYYY-MM-DD
        #[arg(long)]
        date_to: Option<NaiveDate>,
        #[arg(long)]
        page: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "lostfound=info,tower_http=info".into()),
        ))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), String> {
    let backend = cli.backend.as_str();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.db, backend, force),
        Command::Serve { host, port } => {
            let config = ServerConfig::from_env(host, port)?;
            let catalog = open_catalog(&cli.db, backend)?;
            api::serve(catalog, config).await
        }
        Command::Seed => cmd_seed(&cli.db, backend, Utc::now()).map(|_| ()),
        Command::Match { notify } => {
            let config = ServerConfig::from_env(None, None)?;
            let notifier = LogNotifier;
            let target: (&dyn Notifier, &str) = (&notifier, config.public_url.as_str());
            let notify = notify.then_some(target);
            cmd_match(&cli.db, backend, notify, Utc::now()).map(|_| ())
        }
        Command::Stats { json } => cmd_stats(&cli.db, backend, json, Utc::now()).map(|_| ()),
        Command::Search {
            query,
            category,
            item_type,
            location,
            date_from,
            date_to,
            page,
        } => {
            let search = SearchQuery {
                search: query,
                category,
                item_type,
                location,
                date_from,
                date_to,
            };
            cmd_search(&cli.db, backend, &search, page.as_deref()).map(|_| ())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
