//! Incremental UTF-8 decoding across chunk boundaries.

use std::borrow::Cow;

/// A multi-byte sequence was still incomplete when the stream ended
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stream ended inside a multi-byte character ({} dangling byte(s))", .bytes.len())]
pub struct IncompleteSequence {
    pub bytes: Vec<u8>,
}

/// Stateful UTF-8 decoder
///
/// A trailing incomplete sequence is held back until the next chunk completes
/// it. Bytes that can never form valid UTF-8 are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decode `chunk`, appending complete characters to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        if self.pending.is_empty() {
            self.decode_slice(chunk, out);
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            self.decode_slice(&joined, out);
        }
    }

    fn decode_slice(&mut self, mut rest: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Cow::Borrowed(text) = String::from_utf8_lossy(&rest[..valid]) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + invalid..];
                        }
                        None => {
                            self.pending = rest[valid..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Signal end-of-stream.
    ///
    /// Fails if a character was cut off by the end of the stream.
    pub fn finish(&mut self) -> Result<(), IncompleteSequence> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(IncompleteSequence {
                bytes: std::mem::take(&mut self.pending),
            })
        }
    }

    /// Drop any held-back bytes
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
