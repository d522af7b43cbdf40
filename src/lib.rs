pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod search;
pub mod storage;

pub use error::{RankError, Result};
pub use search::{SearchContext, SearchEngine, SearchOptions, SearchResponse};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
