//! semrank analyze - Show the query analysis

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::Result;
use crate::search::SearchContext;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Query text
    pub query: String,

    /// Domain hint used when the query names no concept
    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub category: Option<String>,
}

pub fn run(ctx: &AppContext, args: &AnalyzeArgs) -> Result<()> {
    let context = SearchContext {
        domain: args.domain.clone(),
        category: args.category.clone(),
        ..SearchContext::default()
    };
    let analysis = ctx.engine.analyze(&args.query, &context);

    if ctx.json {
        return output::emit_ok(&analysis);
    }

    let entities: Vec<String> = analysis
        .entities
        .iter()
        .map(|e| format!("{} ({:?})", e.text, e.kind).to_lowercase())
        .collect();
    let concepts: Vec<&str> = analysis.concepts.iter().map(String::as_str).collect();

    let mut layout = HumanLayout::new();
    layout
        .title(&format!("Analysis of '{}'", args.query.cyan()))
        .kv("intent", analysis.intent.as_str())
        .kv("urgency", &analysis.urgency.to_string())
        .kv("complexity", &format!("{:.2}", analysis.complexity))
        .kv("keywords", &analysis.keywords.join(", "))
        .kv("entities", &entities.join(", "))
        .kv("concepts", &concepts.join(", "));
    if analysis.fallback {
        layout.blank().bullet("analysis failed; raw query used as keyword");
    }
    output::emit_human(&layout);
    Ok(())
}
