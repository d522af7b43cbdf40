//! semrank config - Print the effective configuration

use std::path::Path;

use clap::Args;

use crate::app::resolve_root;
use crate::cli::{Cli, output};
use crate::config::Config;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the resolved snapshot path instead of the whole config
    #[arg(long)]
    pub snapshot_path: bool,
}

/// Runs without booting the engine.
pub fn run(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    let root = resolve_root(cli.root.as_deref());
    let config = Config::load(cli.config.as_deref(), &root)?;
    emit(&config, &root, args, cli.json)
}

fn emit(config: &Config, root: &Path, args: &ConfigArgs, json: bool) -> Result<()> {
    if args.snapshot_path {
        let path = config.persistence.resolve_snapshot_path(root);
        if json {
            return output::emit_ok(serde_json::json!({ "snapshot_path": path }));
        }
        println!("{}", path.display());
        return Ok(());
    }

    if json {
        return output::emit_ok(config);
    }
    println!("{}", config.to_toml_string()?);
    Ok(())
}
