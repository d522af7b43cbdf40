//! semrank remove - Remove a document from the index

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::Result;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Document id
    pub id: String,
}

pub fn run(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    let removed = ctx.engine.remove_document(&args.id)?;

    if ctx.json {
        return output::emit_ok(serde_json::json!({ "removed": removed.id }));
    }
    println!("{} Removed {}", "✓".green(), removed.id.bold());
    Ok(())
}
