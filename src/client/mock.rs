//! Mock backend for testing purposes.

use async_trait::async_trait;
use futures_util::stream;
use std::sync::Mutex;

use super::{ResearchBackend, ResearchRequest};
use crate::models::ResearchEvent;
use crate::stream::{decode_stream_with, DecodeStats, DecoderOptions, StreamError};

/// A backend that replays predefined body chunks through the real decoder.
#[derive(Debug, Default)]
pub struct MockBackend {
    chunks: Mutex<Vec<Vec<u8>>>,
    transport_failure: Mutex<Option<String>>,
    ideas: Mutex<Vec<String>>,
    options: DecoderOptions,
}

impl MockBackend {
    /// Create a mock backend with no body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock backend replaying `chunks`.
    pub fn with_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let backend = Self::new();
        backend.set_chunks(chunks);
        backend
    }

    /// Use these decoder options for every session.
    pub fn with_decoder_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the body chunks to replay.
    pub fn set_chunks<I, B>(&self, chunks: I)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut guard = self.chunks.lock().unwrap();
        *guard = chunks.into_iter().map(|c| c.as_ref().to_vec()).collect();
    }

    /// Drop the connection with `message` after the last chunk.
    pub fn fail_transport_after_chunks(&self, message: impl Into<String>) {
        let mut guard = self.transport_failure.lock().unwrap();
        *guard = Some(message.into());
    }

    /// Ideas submitted so far
    pub fn submitted_ideas(&self) -> Vec<String> {
        self.ideas.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResearchBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock Backend"
    }

    async fn research(
        &self,
        idea: &str,
        sink: &mut (dyn FnMut(ResearchEvent) + Send),
    ) -> Result<DecodeStats, StreamError> {
        let request = ResearchRequest::new(idea)?;
        self.ideas.lock().unwrap().push(request.idea);

        let mut body: Vec<Result<Vec<u8>, String>> =
            self.chunks.lock().unwrap().iter().cloned().map(Ok).collect();
        let failure = self.transport_failure.lock().unwrap().clone();
        if let Some(message) = failure {
            body.push(Err(message));
        }

        decode_stream_with(stream::iter(body), self.options, sink).await
    }
}

/// Build a `progress` line
pub fn progress_line(step: &str, message: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({"type": "progress", "step": step, "message": message})
    )
}

/// Build a `result` line from raw paper records and an analysis payload
pub fn result_line(papers: serde_json::Value, analysis: serde_json::Value) -> String {
    format!(
        "{}\n",
        serde_json::json!({"type": "result", "data": {"papers": papers, "analysis": analysis}})
    )
}

/// Build an `error` line
pub fn error_line(message: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({"type": "error", "message": message})
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_backend_replays_events() {
        let body = format!(
            "{}{}",
            progress_line("searching", "Searching arXiv..."),
            result_line(json!([{"url": "http://x/1"}]), json!({"summary": "ok"}))
        );
        let (a, b) = body.as_bytes().split_at(17);
        let backend = MockBackend::with_chunks([a, b]);

        let mut events = Vec::new();
        let stats = backend
            .research("neural rendering", &mut |e: ResearchEvent| events.push(e))
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(stats.events, 2);
        assert_eq!(backend.submitted_ideas(), vec!["neural rendering"]);
    }

    #[tokio::test]
    async fn test_mock_backend_transport_failure() {
        let backend = MockBackend::with_chunks([progress_line("analyzing", "Parsing idea...")]);
        backend.fail_transport_after_chunks("connection reset");

        let mut events = Vec::new();
        let err = backend
            .research("idea", &mut |e: ResearchEvent| events.push(e))
            .await
            .unwrap_err();

        assert_eq!(events.len(), 1);
        assert_eq!(err, StreamError::Transport("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_mock_backend_producer_error() {
        let backend = MockBackend::with_chunks([error_line("quota exceeded")]);
        let err = backend.research("idea", &mut |_: ResearchEvent| {}).await.unwrap_err();
        assert_eq!(err, StreamError::Producer("quota exceeded".to_string()));
    }

    #[test]
    fn test_mock_backend_rejects_blank_idea() {
        let backend = MockBackend::with_chunks([progress_line("searching", "unused")]);
        let mut sink = |_: ResearchEvent| {};

        tokio_test::assert_err!(tokio_test::block_on(backend.research(" \t", &mut sink)));
        assert!(backend.submitted_ideas().is_empty());

        tokio_test::assert_ok!(tokio_test::block_on(backend.research("ok", &mut sink)));
        assert_eq!(backend.submitted_ideas(), vec!["ok"]);
    }
}
