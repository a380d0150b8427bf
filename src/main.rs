mod auth;
mod config;
mod database;
mod entities;
mod error;
mod http_server;
mod logging;
mod ports;
mod services;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    auth::{
        token::{SigningKey, TokenSigner},
        verifier::CredentialVerifier,
    },
    config::Config,
    database::Database,
    http_server::state::AppState,
    logging::{setup_logging, shutdown_logging},
    ports::clock::SystemClock,
    services::admin::AdminService,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "PROMO_CMS_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `promo_cms=debug,tower_http=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// OTLP collector endpoint for span export
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on (overrides the config file)
        #[arg(short, long, env = "PROMO_CMS_PORT")]
        port: Option<u16>,

        /// Secret used to sign session tokens (overrides the config file)
        #[arg(long, env = "PROMO_CMS_SESSION_SECRET", hide_env_values = true)]
        session_secret: Option<String>,
    },
    /// Manage administrator accounts
    #[command(subcommand)]
    Admin(AdminCommands),
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum AdminCommands {
    /// Create an administrator
    Create {
        /// Username or email used to log in
        #[arg(short, long)]
        identity: String,

        #[arg(short, long, env = "PROMO_CMS_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Replace an administrator's password
    SetPassword {
        #[arg(short, long)]
        identity: String,

        #[arg(short, long, env = "PROMO_CMS_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = setup_logging(&args.log_level, args.otlp_endpoint.as_deref())?;

    let result = run(args).await;
    shutdown_logging(tracer_provider);
    result
}

async fn run(args: Args) -> Result<()> {
    log::debug!("Promo CMS starting");

    let mut config =
        Config::load(args.config.as_deref()).wrap_err("Failed to load promo-cms config")?;

    match args.command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                log::info!("Default config created at: {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Admin(admin_commands) => {
            let database = Arc::new(Database::open(&config.database_path()).await?);
            let admins = AdminService::new(database.clone());
            match admin_commands {
                AdminCommands::Create { identity, password } => {
                    admins.create(&identity, &password).await?;
                }
                AdminCommands::SetPassword { identity, password } => {
                    admins.set_password(&identity, &password).await?;
                }
            }
            drop(admins);
            close_database(database).await?;
        }
        Commands::Serve {
            port,
            session_secret,
        } => {
            // Refuse to start before touching the database
            let key = SigningKey::from_secret(config.session_secret(session_secret.as_deref()))?;
            let ttl = config.session_ttl()?;
            if let Some(port) = port {
                config.server.port = port;
            }

            let database = Arc::new(Database::open(&config.database_path()).await?);
            let signer = Arc::new(TokenSigner::new(key, ttl, Arc::new(SystemClock)));
            let verifier = Arc::new(CredentialVerifier::new(database.clone(), signer.clone())?);
            let app_state = Arc::new(AppState {
                db: database.clone(),
                signer,
                verifier,
                cookie: config.session_cookie(),
            });

            log::info!("Starting HTTP server on port: {}", config.server.port);
            http_server::app::start(&config.server, app_state).await?;
            close_database(database).await?;
        }
    }

    Ok(())
}

/// Close the pool once every other holder is gone.
async fn close_database(database: Arc<Database>) -> Result<()> {
    match Arc::try_unwrap(database) {
        Ok(database) => database.close().await,
        Err(_) => {
            log::warn!("Database still in use at shutdown, leaving the pool to drop");
            Ok(())
        }
    }
}
