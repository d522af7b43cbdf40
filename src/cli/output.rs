use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::error::{RankError, Result, StructuredError};

/// Envelope for `--json` output.
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub status: JsonStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonStatus {
    Ok,
    Error(StructuredError),
}

pub fn json_ok<T: Serialize>(data: T) -> JsonResponse<T> {
    JsonResponse {
        status: JsonStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

/// Error envelope carrying the error code, suggestion and context.
pub fn json_error(err: &RankError) -> JsonResponse<serde_json::Value> {
    JsonResponse {
        status: JsonStatus::Error(err.to_structured()),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

pub fn emit_ok<T: Serialize>(data: T) -> Result<()> {
    emit_json(&json_ok(data))
}

/// Aligned key/value text for human output.
pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 24,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", padded.dimmed()));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: &HumanLayout) {
    println!("{}", layout.build());
}
