//! classbatch CLI — the main entry point.
//!
//! Commands:
//! - `init`      — Write a default config & create the database schema
//! - `allocate`  — Place eligible students into classes
//! - `eligible`  — List students waiting for a class
//! - `classes`   — Show generated classes and their fill
//! - `status`    — Show configuration and database summary
//! - `config`    — Validate, show, or locate the config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "classbatch",
    about = "classbatch — batch class allocation for measurement-complete students",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.classbatch/config.toml
    #[arg(short, long, global = true, env = "CLASSBATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the database schema
    Init,

    /// Allocate eligible students into classes
    Allocate {
        /// Override the minimum class size
        #[arg(long)]
        min: Option<usize>,

        /// Override the maximum class size
        #[arg(long)]
        max: Option<usize>,

        /// Override the educator who owns new classes
        #[arg(long)]
        educator: Option<i64>,

        /// Seed for reproducible size draws
        #[arg(long)]
        seed: Option<u64>,

        /// Plan only; write nothing
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List students eligible for allocation
    Eligible,

    /// Show generated classes and the next sequence number
    Classes {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and database summary
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Check the config file for errors
    Validate,
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config_path).await?,
        Commands::Allocate {
            min,
            max,
            educator,
            seed,
            dry_run,
            json,
        } => {
            let args = commands::allocate::AllocateArgs {
                min,
                max,
                educator,
                seed,
                dry_run,
                json,
            };
            commands::allocate::run(config_path, args).await?
        }
        Commands::Eligible => commands::eligible::run(config_path).await?,
        Commands::Classes { json } => commands::classes::run(config_path, json).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allocate_overrides() {
        let cli = Cli::try_parse_from([
            "classbatch",
            "allocate",
            "--min",
            "3",
            "--max",
            "5",
            "--seed",
            "42",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Allocate {
                min,
                max,
                seed,
                dry_run,
                educator,
                json,
            } => {
                assert_eq!(min, Some(3));
                assert_eq!(max, Some(5));
                assert_eq!(seed, Some(42));
                assert!(dry_run);
                assert!(educator.is_none());
                assert!(!json);
            }
            _ => panic!("expected allocate"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli =
            Cli::try_parse_from(["classbatch", "classes", "--verbose", "--config", "/tmp/c.toml"])
                .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn config_requires_action() {
        assert!(Cli::try_parse_from(["classbatch", "config"]).is_err());
    }
}
