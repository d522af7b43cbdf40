//! semrank search - Rank indexed documents against a query

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::Result;
use crate::search::{SearchContext, SearchOptions, SearchResponse, UserPreferences};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Domain of the conversation (e.g. technical)
    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Desired difficulty level
    #[arg(long)]
    pub difficulty: Option<String>,

    /// User id for personalization and recent-search tracking
    #[arg(long)]
    pub user: Option<String>,

    /// Preferred categories (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub prefer: Vec<String>,

    /// Recent conversation message; repeat for more, oldest first
    #[arg(long = "history", value_name = "MESSAGE")]
    pub history: Vec<String>,

    /// Maximum number of results
    #[arg(long, short)]
    pub limit: Option<usize>,

    /// Minimum relevance score (0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Bypass the result cache
    #[arg(long)]
    pub force_refresh: bool,
}

impl SearchArgs {
    pub fn context(&self) -> SearchContext {
        let preferences = (!self.prefer.is_empty() || self.difficulty.is_some()).then(|| {
            UserPreferences {
                preferred_categories: self.prefer.clone(),
                preferred_difficulty: self.difficulty.clone(),
                interests: Vec::new(),
            }
        });
        SearchContext {
            user_id: self.user.clone(),
            domain: self.domain.clone(),
            category: self.category.clone(),
            difficulty: self.difficulty.clone(),
            user_preferences: preferences,
            conversation_history_tail: self.history.clone(),
        }
    }

    pub fn options(&self) -> SearchOptions {
        let mut options = SearchOptions::new().force_refresh(self.force_refresh);
        if let Some(limit) = self.limit {
            options = options.max_results(limit);
        }
        if let Some(threshold) = self.threshold {
            options = options.threshold(threshold);
        }
        options
    }
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let response = ctx.engine.search(&args.query, &args.context(), &args.options());

    if ctx.json {
        return output::emit_ok(&response);
    }
    display(ctx, &response);
    Ok(())
}

fn display(ctx: &AppContext, response: &SearchResponse) {
    if let Some(failure) = &response.error {
        println!(
            "{} Search failed at {}: {} [{}]",
            "!".yellow(),
            failure.stage,
            failure.message,
            failure.code
        );
        return;
    }

    if response.results.is_empty() {
        println!(
            "{} No documents found for '{}'",
            "!".yellow(),
            response.query.cyan()
        );
    } else {
        println!(
            "{} results for '{}':",
            response.results.len().to_string().bold(),
            response.query.cyan()
        );
        println!();
        for (i, result) in response.results.iter().enumerate() {
            let rank = format!("{}.", i + 1);
            println!(
                "{:4} {} (score: {:.3})",
                rank.dimmed(),
                result.document_id.bold(),
                result.relevance_score
            );
            if let Some(doc) = ctx.engine.get_document(&result.document_id) {
                println!("     {}", truncate_str(&doc.content, 77).dimmed());
            }
            if !result.match_reasons.is_empty() {
                println!("     {}", result.match_reasons.join("; ").italic());
            }
        }
    }

    if response.truncated {
        println!();
        println!("{} Scan stopped early; results are partial", "!".yellow());
    }
    if !response.suggestions.is_empty() {
        println!();
        println!("Try:");
        for suggestion in &response.suggestions {
            println!("  - {suggestion}");
        }
    }
    if !response.related_queries.is_empty() {
        println!();
        println!("Related:");
        for related in &response.related_queries {
            println!("  - {related}");
        }
    }

    let cache = if response.metrics.cache_hit { ", cached" } else { "" };
    println!();
    println!(
        "{}",
        format!(
            "{} match(es), {:.2} ms{cache}",
            response.metrics.total_matches, response.metrics.search_time_ms
        )
        .dimmed()
    );
}

/// Truncate to `max_chars` characters on a char boundary, with an ellipsis.
fn truncate_str(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}
