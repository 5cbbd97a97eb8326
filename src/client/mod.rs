//! Request boundary: submitting a research idea and consuming the stream.
//!
//! The [`ResearchBackend`] trait is the seam between the CLI and the
//! transport. [`ResearchClient`] talks HTTP to the research server;
//! [`MockBackend`] replays canned chunks through the same decoder.

mod http;
pub mod mock;

pub use http::{endpoint_url, ResearchClient, ResearchEventStream};
pub use mock::MockBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ResearchEvent;
use crate::stream::{DecodeStats, StreamError};

/// Body of a research request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub idea: String,
}

impl ResearchRequest {
    /// Create a request, rejecting blank ideas
    pub fn new(idea: impl Into<String>) -> Result<Self, StreamError> {
        let idea = idea.into();
        if idea.trim().is_empty() {
            return Err(StreamError::InvalidRequest(
                "research idea must not be empty".to_string(),
            ));
        }
        Ok(Self { idea })
    }
}

/// Something that can run one research session
#[async_trait]
pub trait ResearchBackend: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this backend
    fn name(&self) -> &str;

    /// Submit `idea` and hand every decoded event to `sink`.
    ///
    /// Resolves when the stream ends, or fails on the first fatal fault.
    async fn research(
        &self,
        idea: &str,
        sink: &mut (dyn FnMut(ResearchEvent) + Send),
    ) -> Result<DecodeStats, StreamError>;
}
