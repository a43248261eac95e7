//! snipvault - snippet manager backed by a GitHub repository.

mod commands;

use clap::{Parser, Subcommand};
use snipvault_core::{AccessPolicy, Config, Vault};
use snipvault_store::{Credential, GitHubConnector, GitHubSettings, StoreConnector};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snipvault")]
#[command(author, version, about = "Snippet manager backed by a GitHub repository", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ./snipvault.json when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (overrides server.host and server.port)
        #[arg(long)]
        address: Option<SocketAddr>,
    },
    /// List snippets
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a snippet with its files
    Show {
        /// Snippet ID
        id: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the revision history of a snippet
    History {
        /// Snippet ID
        id: String,
        /// Maximum number of revisions
        #[arg(short = 'n', long, default_value_t = snipvault_core::MAX_REVISIONS)]
        limit: usize,
    },
    /// Write search documents for every public snippet
    Index {
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref()).await?;
    config.validate()?;
    let connector = connector(&config)?;

    match cli.command {
        Commands::Serve { address } => {
            let address = match address {
                Some(address) => address,
                None => config.server.address().parse()?,
            };
            let policy = AccessPolicy::from_allow_list(&config.auth.allowed_users);
            commands::serve(connector, config.layout(), policy, address).await
        }
        Commands::List { json } => commands::list(&vault(&connector, &config), json).await,
        Commands::Show { id, json } => commands::show(&vault(&connector, &config), &id, json).await,
        Commands::History { id, limit } => {
            commands::history(&vault(&connector, &config), &id, limit).await
        }
        Commands::Index { out } => commands::index(&vault(&connector, &config), &out).await,
    }
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over the built-in filters.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "snipvault=debug,snipvault_core=debug,snipvault_store=debug,snipvault_server=debug,tower_http=debug"
    } else {
        "snipvault=info,snipvault_core=info,snipvault_server=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn connector(config: &Config) -> anyhow::Result<GitHubConnector> {
    let settings = GitHubSettings::new(&config.github.owner, &config.github.repo)
        .with_api_url(&config.github.api_url);
    let connector = GitHubConnector::new(settings)?
        .with_fallback(config.github.token.as_deref().map(Credential::new));
    Ok(connector)
}

/// Read-only access with the configured server token.
fn vault(connector: &GitHubConnector, config: &Config) -> Vault {
    Vault::new(connector.connect(None), config.layout())
}
