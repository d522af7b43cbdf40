//! semrank - context-aware semantic search CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use semrank::Result;
use semrank::app::AppContext;
use semrank::cli::{Cli, Commands, output};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                // JSON error envelope to stdout
                let _ = output::emit_json(&output::json_error(&e));
            } else {
                eprintln!("Error: {}", e.to_structured());
                eprintln!("  hint: {}", e.code().suggestion());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Config(args) = &cli.command {
        return semrank::cli::commands::config::run(cli, args);
    }
    let ctx = AppContext::from_cli(cli)?;
    let outcome = semrank::cli::commands::run(&ctx, &cli.command);
    let report = ctx.finish()?;
    tracing::debug!(?report, "persistence worker finished");
    outcome
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,semrank=info",
        1 => "info,semrank=debug",
        2 => "debug,semrank=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.json {
        // JSON logging for machine consumers
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
