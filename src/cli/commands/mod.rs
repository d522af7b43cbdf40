//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod add;
pub mod analyze;
pub mod config;
pub mod health;
pub mod import;
pub mod remove;
pub mod search;
pub mod update;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Add(args) => add::run(ctx, args),
        Commands::Import(args) => import::run(ctx, args),
        Commands::Update(args) => update::run(ctx, args),
        Commands::Remove(args) => remove::run(ctx, args),
        Commands::Search(args) => search::run(ctx, args),
        Commands::Analyze(args) => analyze::run(ctx, args),
        Commands::Health(args) => health::run(ctx, args),
        // Handled before the engine boots.
        Commands::Config(_) => Ok(()),
    }
}
