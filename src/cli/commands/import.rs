//! semrank import - Index documents from a file
//!
//! Accepts either a JSON array of documents or JSON lines, one document per
//! line. Blank lines are ignored.

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output;
use crate::error::{RankError, Result};
use crate::search::DocumentInput;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON or JSONL file of documents
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ImportFailure {
    position: usize,
    error: String,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    added: Vec<String>,
    failed: Vec<ImportFailure>,
}

pub fn run(ctx: &AppContext, args: &ImportArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)?;
    let inputs = parse_documents(&raw)?;
    let results = ctx.engine.add_documents(inputs)?;

    let mut report = ImportReport {
        added: Vec::new(),
        failed: Vec::new(),
    };
    for (position, result) in results.into_iter().enumerate() {
        match result {
            Ok(id) => report.added.push(id),
            Err(err) => report.failed.push(ImportFailure {
                position: position + 1,
                error: err.to_string(),
            }),
        }
    }

    if ctx.json {
        return output::emit_ok(&report);
    }
    println!(
        "{} Imported {} document(s) from {}",
        "✓".green(),
        report.added.len().to_string().bold(),
        args.file.display()
    );
    for failure in &report.failed {
        println!("  {} #{}: {}", "!".yellow(), failure.position, failure.error);
    }
    Ok(())
}

pub fn parse_documents(raw: &str) -> Result<Vec<DocumentInput>> {
    if raw.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(raw)?);
    }

    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|err| {
                RankError::InvalidDocument(format!("line {}: {err}", number + 1))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let docs = parse_documents(r#"[{"id":"a","content":"one"},{"content":"two"}]"#).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id.as_deref(), Some("a"));
        assert!(docs[1].id.is_none());
    }

    #[test]
    fn parses_json_lines() {
        let raw = "{\"content\":\"one\",\"domain\":\"technical\"}\n\n{\"content\":\"two\"}\n";
        let docs = parse_documents(raw).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].domain.as_deref(), Some("technical"));
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_documents("{\"content\":\"ok\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
