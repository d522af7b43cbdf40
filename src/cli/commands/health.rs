//! semrank health - Index and search statistics

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{self, HumanLayout};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct HealthArgs {}

pub fn run(ctx: &AppContext, _args: &HealthArgs) -> Result<()> {
    let health = ctx.engine.health_status();

    if ctx.json {
        return output::emit_ok(&health);
    }

    let mut layout = HumanLayout::new();
    layout
        .section("Engine")
        .kv("state", &health.state.to_string())
        .kv("root", &ctx.root.display().to_string())
        .kv("indexed documents", &health.indexed_document_count.to_string())
        .kv("users", &health.user_pattern_count.to_string())
        .blank()
        .section("Searches")
        .kv("history entries", &health.history_count.to_string())
        .kv("total searches", &health.total_searches.to_string())
        .kv("errors", &health.errors.to_string())
        .kv("avg search time", &format!("{:.2} ms", health.average_search_time_ms))
        .kv("cache hit rate", &format!("{:.1}%", health.cache_hit_rate * 100.0));
    output::emit_human(&layout);
    Ok(())
}
