//! Line-oriented decoding of the agent event stream.
//!
//! The transport hands over arbitrary byte chunks. [`FrameDecoder`] keeps a
//! single pending buffer, emits only complete `data:` lines, and carries the
//! trailing partial line over to the next chunk. [`decode_frames`] wraps a
//! byte stream into a lazy stream of frame payloads.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};
use memchr::memchr;
use tracing::debug;

pub const FRAME_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Payload(String),
    Done,
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the end sentinel has been seen. Further input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(relative_pos) = memchr(b'\n', &self.buffer[start..]) {
            let newline_index = start + relative_pos;
            let frame = decode_line(&self.buffer[start..newline_index]);
            start = newline_index + 1;

            if let Some(frame) = frame {
                let is_done = frame == Frame::Done;
                frames.push(frame);
                if is_done {
                    self.done = true;
                    self.buffer.clear();
                    return frames;
                }
            }
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        frames
    }

    /// Flushes an unterminated final line once the transport has closed.
    pub fn finish(&mut self) -> Vec<Frame> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }
        let frame = decode_line(&self.buffer);
        self.buffer.clear();
        if frame == Some(Frame::Done) {
            self.done = true;
        }
        frame.into_iter().collect()
    }
}

fn decode_line(line: &[u8]) -> Option<Frame> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(err) => {
            debug!("discarding non-UTF-8 stream line: {err}");
            return None;
        }
    };

    let payload = text.strip_prefix(FRAME_PREFIX)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    if payload.trim() == DONE_SENTINEL {
        return Some(Frame::Done);
    }
    if payload.is_empty() {
        return None;
    }
    Some(Frame::Payload(payload.to_string()))
}

struct FrameState<S> {
    inner: S,
    decoder: FrameDecoder,
    pending: VecDeque<String>,
    exhausted: bool,
}

impl<S> FrameState<S> {
    fn enqueue(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            match frame {
                Frame::Payload(payload) => self.pending.push_back(payload),
                Frame::Done => {
                    self.exhausted = true;
                    break;
                }
            }
        }
    }
}

/// Turns a chunked byte stream into a lazy, ordered stream of frame payloads.
///
/// The sequence ends at the `[DONE]` sentinel or when the byte stream ends.
/// A transport error is yielded once and ends the sequence.
pub fn decode_frames<S, B, E>(inner: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = FrameState {
        inner,
        decoder: FrameDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.exhausted {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(chunk.as_ref());
                    state.enqueue(frames);
                }
                Some(Err(err)) => {
                    state.exhausted = true;
                    return Some((Err(err), state));
                }
                None => {
                    let frames = state.decoder.finish();
                    state.exhausted = true;
                    state.enqueue(frames);
                }
            }
        }
    })
}
