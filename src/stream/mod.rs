//! Streaming event decoder for the research backend.
//!
//! The backend answers a research request with newline-delimited JSON: one
//! object per line, discriminated by `type`:
//!
//! ```text
//! {"type":"progress","step":"analyzing","message":"Parsing idea..."}
//! {"type":"progress","step":"searching","message":"Searching arXiv..."}
//! {"type":"result","data":{"papers":[...],"analysis":{...}}}
//! ```
//!
//! or `{"type":"error","message":"..."}` when the backend gives up. Network
//! chunks do not respect line boundaries, nor character boundaries; the
//! [`NdjsonDecoder`] reassembles whole lines and turns them into
//! [`ResearchEvent`](crate::models::ResearchEvent)s.
//!
//! # Example
//!
//! ```rust
//! use arxiv_mind::stream::decode_chunks;
//!
//! let chunks = [
//!     "{\"type\":\"progress\",\"step\":\"sear",
//!     "ching\",\"message\":\"Searching\"}\n",
//! ];
//! let mut events = Vec::new();
//! decode_chunks(chunks, |event| events.push(event)).unwrap();
//! assert_eq!(events.len(), 1);
//! ```

mod decoder;
mod line;
mod session;
mod utf8;

pub use decoder::{DecodeStats, DecoderOptions, DecoderState, NdjsonDecoder};
pub use line::{parse_line, ParsedLine, DEFAULT_ERROR_MESSAGE};
pub use session::{
    decode_chunks, decode_chunks_with, decode_stream, decode_stream_with, event_stream,
};
pub use utf8::{IncompleteSequence, Utf8StreamDecoder};

/// Fatal outcomes of a decode session
///
/// Malformed individual lines are not errors; they are logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Connection failed or dropped mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("Backend error: {status} {reason}")]
    Status { status: u16, reason: String },

    /// The byte stream ended inside a multi-byte character
    #[error("Decode error: {0}")]
    Decode(String),

    /// The backend sent an `error` line
    #[error("{0}")]
    Producer(String),

    /// A `result` line could not be parsed (strict mode only)
    #[error("Malformed result: {0}")]
    MalformedResult(String),

    /// The request was rejected before anything was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}
