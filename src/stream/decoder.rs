//! Push/pull NDJSON decoder state machine.

use std::collections::VecDeque;

use tracing::{debug, warn};

use super::line::{parse_line, ParsedLine};
use super::utf8::Utf8StreamDecoder;
use super::StreamError;
use crate::models::ResearchEvent;

/// Longest line excerpt written to the log for a discarded line
const LOG_PREVIEW_CHARS: usize = 120;

/// Decoder behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Fail the session when a `result` line cannot be parsed instead of
    /// silently dropping it. Progress lines are always dropped silently.
    pub strict_results: bool,
}

impl DecoderOptions {
    pub fn strict_results(mut self, strict: bool) -> Self {
        self.strict_results = strict;
        self
    }
}

/// Observable decoder state
///
/// `LineReady` and `FlushResidual` only exist inside a single `push` or
/// `finish` call, so they are never observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing buffered; waiting for the next chunk
    AwaitingData,
    /// A partial line (or partial character) is buffered
    Buffering,
    /// End-of-stream processed successfully
    Done,
    /// An `error` line or fatal fault ended the session
    Failed,
}

/// Counters for one decode session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub chunks: usize,
    pub bytes: usize,
    pub lines: usize,
    pub blank_lines: usize,
    pub events: usize,
    pub malformed_lines: usize,
    pub ignored_lines: usize,
}

/// Turns byte chunks into whole [`ResearchEvent`]s
///
/// Feed chunks with [`push`](Self::push), signal end-of-stream with
/// [`finish`](Self::finish) and drain results with
/// [`next_event`](Self::next_event). Events come out in line order; a fatal
/// failure is yielded once, after every event that preceded it.
#[derive(Debug)]
pub struct NdjsonDecoder {
    options: DecoderOptions,
    utf8: Utf8StreamDecoder,
    buffer: String,
    ready: VecDeque<ResearchEvent>,
    failure: Option<StreamError>,
    finished: bool,
    failed: bool,
    stats: DecodeStats,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            utf8: Utf8StreamDecoder::new(),
            buffer: String::new(),
            ready: VecDeque::new(),
            failure: None,
            finished: false,
            failed: false,
            stats: DecodeStats::default(),
        }
    }

    pub fn options(&self) -> DecoderOptions {
        self.options
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn state(&self) -> DecoderState {
        if self.failed {
            DecoderState::Failed
        } else if self.finished {
            DecoderState::Done
        } else if self.buffer.is_empty() && self.utf8.pending_len() == 0 {
            DecoderState::AwaitingData
        } else {
            DecoderState::Buffering
        }
    }

    /// Whether the session has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        self.failed || self.finished
    }

    /// Feed the next chunk. Ignored once the session is terminal.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.is_terminal() {
            return;
        }
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len();

        self.utf8.decode(chunk, &mut self.buffer);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return;
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        for line in complete[..last_newline].split('\n') {
            self.handle_line(line);
            if self.failed {
                break;
            }
        }
    }

    /// Signal end-of-stream, flushing any residual line.
    pub fn finish(&mut self) {
        if self.is_terminal() {
            return;
        }
        if let Err(err) = self.utf8.finish() {
            self.fail(StreamError::Decode(err.to_string()));
            return;
        }

        let residual = std::mem::take(&mut self.buffer);
        if !residual.is_empty() {
            self.handle_line(&residual);
        }
        if !self.failed {
            self.finished = true;
            debug!(
                events = self.stats.events,
                lines = self.stats.lines,
                malformed = self.stats.malformed_lines,
                "Research stream finished"
            );
        }
    }

    /// Next decoded item, if any is ready.
    ///
    /// Returns `Some(Err(..))` exactly once when the session failed, after all
    /// events decoded before the failure.
    pub fn next_event(&mut self) -> Option<Result<ResearchEvent, StreamError>> {
        if let Some(event) = self.ready.pop_front() {
            return Some(Ok(event));
        }
        self.failure.take().map(Err)
    }

    /// Drain everything currently ready
    pub fn drain(&mut self) -> impl Iterator<Item = Result<ResearchEvent, StreamError>> + '_ {
        std::iter::from_fn(move || self.next_event())
    }

    /// Abort the session from outside (transport fault)
    pub fn abort(&mut self, err: StreamError) {
        if !self.is_terminal() {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: StreamError) {
        debug!("Research stream failed: {}", err);
        self.failed = true;
        self.failure = Some(err);
        self.buffer.clear();
        self.utf8.reset();
    }

    fn handle_line(&mut self, line: &str) {
        self.stats.lines += 1;
        match parse_line(line) {
            ParsedLine::Blank => self.stats.blank_lines += 1,
            ParsedLine::Event(event) => {
                if let ResearchEvent::Progress { step, .. } = &event {
                    if !step.is_known() {
                        debug!("Unrecognised progress step '{}'", step.as_str());
                    }
                }
                self.stats.events += 1;
                self.ready.push_back(event);
            }
            ParsedLine::Failure(message) => self.fail(StreamError::Producer(message)),
            ParsedLine::Ignored { kind } => {
                self.stats.ignored_lines += 1;
                debug!("Ignoring stream line with type {:?}", kind);
            }
            ParsedLine::Malformed { error, result_line } => {
                self.stats.malformed_lines += 1;
                warn!(
                    error = %error,
                    line = %preview(line),
                    "Discarding malformed stream line"
                );
                if result_line && self.options.strict_results {
                    self.fail(StreamError::MalformedResult(error));
                }
            }
        }
    }
}

fn preview(line: &str) -> String {
    let line = line.trim();
    if line.chars().count() <= LOG_PREVIEW_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
