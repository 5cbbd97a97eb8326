//! # ArxivMind
//!
//! Client side of a research-idea assistant: submits an idea to a research
//! server and decodes its streaming NDJSON answer into progress updates and a
//! final set of papers with an analysis.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`stream`]: Incremental UTF-8 + newline framing decoder and session drivers
//! - [`models`]: Core data structures (Paper, AnalysisResult, ResearchEvent, etc.)
//! - [`client`]: HTTP backend and an in-memory mock backend
//! - [`utils`]: Score filtering, sorting and the publication timeline
//! - [`ui`]: Terminal presentation
//! - [`config`]: Configuration management

pub mod client;
pub mod config;
pub mod models;
pub mod stream;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use client::{ResearchBackend, ResearchClient};
pub use models::{AnalysisResult, Paper, ResearchEvent};
pub use stream::{NdjsonDecoder, StreamError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
