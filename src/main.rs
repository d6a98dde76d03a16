use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use igram::config::{self, ResolvedConfig};
use igram::scraper::Client;
use igram::server;
use igram::storage::{JsonFileStore, ProfileRecord, ProfileStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "igram")]
#[command(about = "Instagram session scraper")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "igram.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate and cache the session cookies
    Login {
        /// Re-authenticate even if the cached session still probes valid
        #[arg(long)]
        force: bool,
    },
    /// Fetch a profile and print its fields as JSON
    Fetch {
        profile: String,

        /// Also upsert the record into the profile store
        #[arg(long)]
        save: bool,
    },
    /// Run the ingestion endpoint
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Login { force } => {
            let mut client = authenticated_client(&config)?;
            client.login(force).await?;
            println!("Session cached.");
        }
        Command::Fetch { profile, save } => {
            // Login when credentials are available; public profiles are
            // reachable anonymously.
            let client = match config::env_credentials() {
                Some(credentials) => {
                    let mut client = scrape_client(&config)?.with_credentials(credentials);
                    client.login(false).await?;
                    client
                }
                None => scrape_client(&config)?,
            };

            let account = client.get_account(&profile).await?;
            if save {
                let store = JsonFileStore::new(&config.data_dir);
                store.upsert(&ProfileRecord::from_account(&account)).await?;
            }
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let store: Arc<dyn ProfileStore> = Arc::new(JsonFileStore::new(&config.data_dir));
            server::serve(config, store).await?;
        }
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Platform base URL: {}", config.scrape.base_url);
            println!("Server bind: {}", config.server.bind);
        }
    }

    Ok(())
}

fn scrape_client(config: &ResolvedConfig) -> Result<Client> {
    let mut client = Client::new(config.session_cache()?)
        .with_base_url(config.scrape.base_url.clone())
        .with_pacing(config.scrape.delay.strategy());
    if let Some(user_agent) = &config.scrape.user_agent {
        client = client.with_user_agent(user_agent.clone());
    }
    Ok(client)
}

fn authenticated_client(config: &ResolvedConfig) -> Result<Client> {
    let credentials = config::env_credentials().with_context(|| {
        format!(
            "{} and {} must be set",
            config::USERNAME_ENV,
            config::PASSWORD_ENV
        )
    })?;
    Ok(scrape_client(config)?.with_credentials(credentials))
}
