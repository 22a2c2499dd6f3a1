// SPDX-FileCopyrightText: 2026 Fluxion Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fluxion - operator CLI for the IoT message readers and rules engine.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod backup;
mod operator;
mod query;
mod script;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use fluxion_config::FluxionConfig;
use fluxion_core::FluxionError;
use fluxion_readers::{ReaderService, open_repositories};

use crate::operator::LocalOperator;
use crate::query::QueryArgs;
use crate::script::RunScriptArgs;

/// Fluxion - IoT message readers and rules engine.
#[derive(Parser, Debug)]
#[command(name = "fluxion", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump every stored message to a JSON archive.
    Backup {
        #[arg(long)]
        output: PathBuf,
    },
    /// Load a JSON archive written by `backup`.
    Restore {
        #[arg(long)]
        input: PathBuf,
    },
    /// List stored messages.
    Query(QueryArgs),
    /// Run a Lua script against a payload in a throwaway sandbox.
    RunScript(RunScriptArgs),
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => fluxion_config::load_and_validate_path(path),
        None => fluxion_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            fluxion_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    let Some(command) = cli.command else {
        println!("fluxion: use --help for available commands");
        return;
    };
    if let Err(e) = run(command, &config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &FluxionConfig) -> Result<(), FluxionError> {
    match command {
        Commands::Backup { output } => {
            let archive = backup::run_backup(&reader_service(config).await?, &output).await?;
            eprintln!(
                "Backup complete: {} JSON and {} SenML messages written to {}",
                archive.json.len(),
                archive.senml.len(),
                output.display()
            );
        }
        Commands::Restore { input } => {
            let archive = backup::run_restore(&reader_service(config).await?, &input).await?;
            eprintln!(
                "Restore complete: {} JSON and {} SenML messages",
                archive.json.len(),
                archive.senml.len()
            );
        }
        Commands::Query(args) => {
            let page = query::run_query(&reader_service(config).await?, &args).await?;
            println!("{}", to_pretty(&page)?);
        }
        Commands::RunScript(args) => {
            let outcome = script::run_script(&config.sandbox, &args).await?;
            for envelope in &outcome.published {
                eprintln!(
                    "published {}: {}",
                    envelope.subject,
                    String::from_utf8_lossy(&envelope.message.payload)
                );
            }
            println!("{}", to_pretty(&outcome.runs)?);
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| FluxionError::Config(format!("cannot render configuration: {e}")))?;
            print!("{rendered}");
        }
    }
    Ok(())
}

async fn reader_service(config: &FluxionConfig) -> Result<ReaderService, FluxionError> {
    let repositories = open_repositories(&config.storage).await?;
    Ok(ReaderService::new(
        repositories,
        Arc::new(LocalOperator),
        config.readers.max_concurrent_searches,
    ))
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, FluxionError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FluxionError::Internal(format!("cannot encode output: {e}")))
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fluxion={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_arguments_parse() {
        let cli = Cli::try_parse_from([
            "fluxion", "query", "senml", "--publisher", "p1", "--limit", "5", "--asc",
        ])
        .unwrap();
        let Some(Commands::Query(args)) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(args.encoding, query::Encoding::Senml);
        assert_eq!(args.publisher, "p1");
        assert_eq!(args.limit, 5);
        assert!(args.asc);
    }

    #[test]
    fn run_script_requires_payload() {
        assert!(Cli::try_parse_from(["fluxion", "run-script", "a.lua"]).is_err());
        let cli = Cli::try_parse_from(["fluxion", "run-script", "a.lua", "--payload", "{}"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::RunScript(_))));
    }

    #[test]
    fn default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&FluxionConfig::default()).unwrap();
        assert!(rendered.contains("[sandbox]"));
        assert!(rendered.contains("max_concurrent_searches"));
    }
}
