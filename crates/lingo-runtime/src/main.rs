//! Lingo - Main Entry Point

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use lingo_common::{format_timestamp, init_logging, UserId};
use lingo_config::{Config, ConfigLoader};
use lingo_i18n::Locale;
use lingo_runtime::Lingo;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path, created with defaults when missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overriding the configuration file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the store, load the catalog and report readiness
    Check,
    /// Start and keep running until interrupted
    Run,
    /// Print one message
    Get {
        /// Locale identifier, e.g. de_DE
        locale: String,
        /// Message key
        key: String,
        /// Fail instead of printing the placeholder
        #[arg(long)]
        strict: bool,
    },
    /// List the message keys of a locale
    Keys {
        /// Locale identifier
        locale: Locale,
    },
    /// Print the stored locale of a user
    Locale {
        /// User id
        user: UserId,
    },
    /// Print the stored preference row of a user
    Record {
        /// User id
        user: UserId,
    },
    /// Store the locale of a user
    SetLocale {
        /// User id
        user: UserId,
        /// Locale identifier
        locale: Locale,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_or_create(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let _log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Lingo v{}", env!("CARGO_PKG_VERSION"));

    let lingo = Lingo::new(config)?;
    let outcome = execute(&lingo, args.command).await;
    lingo.shutdown().await;

    if let Err(e) = &outcome {
        error!("Command failed: {e:#}");
    }
    outcome
}

async fn execute(lingo: &Lingo, command: Command) -> Result<()> {
    match command {
        Command::Check => {
            let report = lingo.start().await?;
            for (locale, count) in &report.loaded {
                println!("{locale}: {count} messages");
            }
            for (identifier, failure) in &report.failures {
                println!("{identifier}: skipped ({failure})");
            }
            if let Some(stats) = lingo.gateway().stats() {
                println!(
                    "store: {} reachable, {}/{} connections",
                    lingo.config().database.backend,
                    stats.size,
                    stats.max_connections
                );
            }
            if !lingo.is_ready() {
                bail!("Lingo is not ready");
            }
            println!("ready (generation {})", report.generation);
        }
        Command::Run => {
            lingo.start().await?;
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal");
        }
        Command::Get { locale, key, strict } => {
            lingo.load_catalog().await?;
            let locale = Locale::resolve(&locale);
            let text = if strict {
                lingo.catalog().get(locale, &key)?
            } else {
                lingo.catalog().get_or_placeholder(locale, &key)
            };
            println!("{text}");
        }
        Command::Keys { locale } => {
            lingo.load_catalog().await?;
            for key in lingo.catalog().keys(locale)? {
                println!("{key}");
            }
        }
        Command::Locale { user } => {
            lingo.start_store().await?;
            println!("{}", lingo.locale_for(user).await?);
        }
        Command::Record { user } => {
            lingo.start_store().await?;
            match lingo.preferences().record(user).await? {
                Some(record) => {
                    println!("user:         {}", record.user_id);
                    println!("locale:       {}", record.locale_id.as_deref().unwrap_or("-"));
                    println!("display name: {}", record.display_name.as_deref().unwrap_or("-"));
                    println!("created:      {}", format_timestamp(record.created_at));
                }
                None => println!("{user}: no stored preference ({})", Locale::SYSTEM_DEFAULT),
            }
        }
        Command::SetLocale { user, locale } => {
            lingo.start_store().await?;
            lingo.set_locale(user, locale).await?;
            println!("{user}: {locale}");
        }
    }
    Ok(())
}
