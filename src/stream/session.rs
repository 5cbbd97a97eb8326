//! Decode sessions over whole byte streams.
//!
//! Three entry points share one [`NdjsonDecoder`]:
//!
//! - [`decode_stream`]: drive an async byte stream to completion, handing each
//!   event to a sink
//! - [`event_stream`]: the same session as a lazy [`Stream`] of events
//! - [`decode_chunks`]: synchronous form for captured bodies

use futures_util::stream::{self, Stream, StreamExt};

use super::decoder::{DecodeStats, DecoderOptions, NdjsonDecoder};
use super::StreamError;
use crate::models::ResearchEvent;

fn deliver<F>(decoder: &mut NdjsonDecoder, sink: &mut F) -> Result<(), StreamError>
where
    F: FnMut(ResearchEvent),
{
    while let Some(item) = decoder.next_event() {
        sink(item?);
    }
    Ok(())
}

/// Decode an async byte stream, passing every event to `sink` in order.
///
/// Resolves with the session counters at end-of-stream, or fails on the first
/// fatal fault: a transport error from the stream itself, an `error` line, or
/// a character cut off by the end of the stream. Events decoded before the
/// fault are still delivered.
pub async fn decode_stream<S, B, E, F>(byte_stream: S, sink: F) -> Result<DecodeStats, StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(ResearchEvent),
{
    decode_stream_with(byte_stream, DecoderOptions::default(), sink).await
}

/// [`decode_stream`] with explicit decoder options
pub async fn decode_stream_with<S, B, E, F>(
    byte_stream: S,
    options: DecoderOptions,
    mut sink: F,
) -> Result<DecodeStats, StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(ResearchEvent),
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    let mut decoder = NdjsonDecoder::with_options(options);

    while let Some(chunk) = byte_stream.next().await {
        match chunk {
            Ok(bytes) => decoder.push(bytes.as_ref()),
            Err(err) => decoder.abort(StreamError::Transport(err.to_string())),
        }
        deliver(&mut decoder, &mut sink)?;
    }

    decoder.finish();
    deliver(&mut decoder, &mut sink)?;
    Ok(decoder.stats())
}

/// Lazily decode a byte stream into a stream of events.
///
/// The returned stream yields `Ok` events in order and ends either after the
/// last event or right after yielding a single `Err`.
pub fn event_stream<S, B, E>(
    byte_stream: S,
    options: DecoderOptions,
) -> impl Stream<Item = Result<ResearchEvent, StreamError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    stream::unfold(
        Some((byte_stream, NdjsonDecoder::with_options(options))),
        |state| async move {
            let (mut byte_stream, mut decoder) = state?;
            loop {
                if let Some(item) = decoder.next_event() {
                    let next = if item.is_ok() {
                        Some((byte_stream, decoder))
                    } else {
                        None
                    };
                    return Some((item, next));
                }
                if decoder.is_terminal() {
                    return None;
                }
                match byte_stream.next().await {
                    Some(Ok(bytes)) => decoder.push(bytes.as_ref()),
                    Some(Err(err)) => decoder.abort(StreamError::Transport(err.to_string())),
                    None => decoder.finish(),
                }
            }
        },
    )
}

/// Decode an in-memory sequence of chunks.
pub fn decode_chunks<I, B, F>(chunks: I, sink: F) -> Result<DecodeStats, StreamError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
    F: FnMut(ResearchEvent),
{
    decode_chunks_with(chunks, DecoderOptions::default(), sink)
}

/// [`decode_chunks`] with explicit decoder options
pub fn decode_chunks_with<I, B, F>(
    chunks: I,
    options: DecoderOptions,
    mut sink: F,
) -> Result<DecodeStats, StreamError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
    F: FnMut(ResearchEvent),
{
    let mut decoder = NdjsonDecoder::with_options(options);
    for chunk in chunks {
        decoder.push(chunk.as_ref());
        deliver(&mut decoder, &mut sink)?;
    }
    decoder.finish();
    deliver(&mut decoder, &mut sink)?;
    Ok(decoder.stats())
}
