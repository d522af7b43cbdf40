//! semrank update - Change fields of an indexed document

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{RankError, Result};
use crate::search::DocumentPatch;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Document id
    pub id: String,

    /// Replacement text; the vector is recomputed
    #[arg(long)]
    pub content: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub difficulty: Option<String>,
}

pub fn run(ctx: &AppContext, args: &UpdateArgs) -> Result<()> {
    let patch = DocumentPatch {
        content: args.content.clone(),
        category: args.category.clone(),
        domain: args.domain.clone(),
        difficulty: args.difficulty.clone(),
        timestamp: None,
    };
    if patch.is_empty() {
        return Err(RankError::InvalidDocument(
            "nothing to update: pass --content, --category, --domain or --difficulty".to_string(),
        ));
    }
    ctx.engine.update_document(&args.id, patch)?;

    if ctx.json {
        return output::emit_ok(serde_json::json!({ "updated": args.id }));
    }
    println!("{} Updated {}", "✓".green(), args.id.bold());
    Ok(())
}
