//! semrank add - Index a single document

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::Result;
use crate::search::DocumentInput;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Document text
    #[arg(long)]
    pub content: String,

    /// Document id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub difficulty: Option<String>,
}

pub fn run(ctx: &AppContext, args: &AddArgs) -> Result<()> {
    let input = DocumentInput {
        id: args.id.clone(),
        content: args.content.clone(),
        category: args.category.clone(),
        domain: args.domain.clone(),
        difficulty: args.difficulty.clone(),
        timestamp: None,
    };
    let id = ctx.engine.add_document(input)?;

    if ctx.json {
        return output::emit_ok(serde_json::json!({ "id": id }));
    }
    println!("{} Indexed {}", "✓".green(), id.bold());
    Ok(())
}
