//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// semrank - context-aware semantic search over a local document index
#[derive(Parser, Debug)]
#[command(name = "semrank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding snapshot.json and config.toml
    #[arg(long, global = true, env = "SEMRANK_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file path; replaces the global and data-directory config files
    #[arg(long, global = true, env = "SEMRANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output and JSON logs
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a single document
    Add(commands::add::AddArgs),

    /// Index documents from a JSON array or JSON-lines file
    Import(commands::import::ImportArgs),

    /// Change fields of an indexed document
    Update(commands::update::UpdateArgs),

    /// Remove a document from the index
    Remove(commands::remove::RemoveArgs),

    /// Rank indexed documents against a query
    Search(commands::search::SearchArgs),

    /// Show intent, entities, concepts and urgency for a query
    Analyze(commands::analyze::AnalyzeArgs),

    /// Show index and search statistics
    Health(commands::health::HealthArgs),

    /// Print the effective configuration
    Config(commands::config::ConfigArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_flags() {
        let cli = Cli::try_parse_from([
            "semrank",
            "--json",
            "search",
            "database optimization",
            "--domain",
            "technical",
            "--prefer",
            "databases,networking",
            "--history",
            "we talked about indexes",
            "--limit",
            "3",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.query, "database optimization");
        assert_eq!(args.prefer, vec!["databases", "networking"]);
        assert_eq!(args.limit, Some(3));
    }
}
