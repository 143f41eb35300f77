//! fieldmap CLI - Command-line interface
//!
//! Renders map frames to PNG, warms the tile cache for offline use and
//! manages the configuration and disk cache.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldmap::config::{config_file_path, ConfigFile};
use fieldmap::logging::init_logging;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::prefetch::PrefetchArgs;
use commands::render::RenderArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fieldmap", version, about = "Slippy-map tiles from the command line")]
struct Cli {
    /// Use this config file instead of the default one
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render one map frame to a PNG file
    Render(RenderArgs),

    /// Download the tiles around a point into the disk cache
    Prefetch(PrefetchArgs),

    /// Manage the disk tile cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View and edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config_file.unwrap_or_else(config_file_path);

    // Config commands print plain output and skip logging setup
    let command = match cli.command {
        Commands::Config { command } => return commands::config::run(command, &config_path),
        other => other,
    };

    let config = ConfigFile::load_from(&config_path)?;
    let _log_guard = init_logging(config.logging.directory.as_deref(), cli.verbose)?;

    match command {
        Commands::Render(args) => commands::render::run(args, config),
        Commands::Prefetch(args) => commands::prefetch::run(args, config),
        Commands::Cache { action } => commands::cache::run(action, &config),
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_coordinates_parse() {
        let cli = Cli::try_parse_from([
            "fieldmap", "render", "--lat", "-33.86", "--lon", "151.2", "--zoom", "14",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.lat, Some(-33.86));
                assert_eq!(args.zoom, Some(14));
            }
            other => panic!("Expected render, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["fieldmap", "cache", "stats", "--config", "/tmp/f.ini"]).unwrap();
        assert_eq!(cli.config_file, Some(PathBuf::from("/tmp/f.ini")));
    }
}
