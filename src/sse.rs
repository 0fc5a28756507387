//! Server-sent event framing for the chat response stream.
//!
//! The chat server does not speak strict SSE.  State-change events are written
//! as `event: {json}` with no line terminator, so the next `data: {json}` lands
//! on the same line.  Processing therefore happens in three steps:
//!
//! 1. [`LineFramer`] turns arbitrary byte buffers into complete text lines.
//! 2. [`FramingPolicy`] cuts each line into candidate fragments.
//! 3. [`decode_line`] keeps the fragments that look like JSON objects and
//!    decodes them into [`StreamChunk`]s, reporting the rest as dropped.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::STREAM_BYTES;
use crate::{Error, Result, StreamChunk};

/// The marker that introduces a data payload.
pub const DATA_PREFIX: &str = "data: ";

///////////////////////////////////////////// LineFramer ////////////////////////////////////////////

/// Incremental line splitter.
///
/// Bytes are buffered until a `\n` arrives.  A line is decoded as UTF-8 only
/// once it is complete, so a multi-byte character split across two reads is
/// reassembled correctly.  A trailing `\r` is stripped.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a buffer and returns every line it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = bytes;
        while let Some(newline) = rest.iter().position(|b| *b == b'\n') {
            self.buffer.extend_from_slice(&rest[..newline]);
            lines.push(self.take_line());
            rest = &rest[newline + 1..];
        }
        self.buffer.extend_from_slice(rest);
        lines
    }

    /// Flushes the final unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn take_line(&mut self) -> String {
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        line
    }
}

//////////////////////////////////////////// FramingPolicy ///////////////////////////////////////////

/// How a line is cut into fragments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramingPolicy {
    /// Split the line on every `data: `, wherever it occurs.  Recovers events
    /// the server concatenated onto one line.  Lines without any prefix are a
    /// single fragment.
    #[default]
    Permissive,
    /// The line must start with `data: `; the remainder is the only fragment.
    /// Lines that do not start with the prefix yield nothing.
    Strict,
}

impl FramingPolicy {
    /// Cuts `line` into candidate fragments.  Empty pieces are skipped.
    pub fn fragments<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            FramingPolicy::Permissive => line
                .split(DATA_PREFIX)
                .filter(|part| !part.is_empty())
                .collect(),
            FramingPolicy::Strict => line
                .strip_prefix(DATA_PREFIX)
                .filter(|part| !part.is_empty())
                .into_iter()
                .collect(),
        }
    }
}

////////////////////////////////////////////// Fragment //////////////////////////////////////////////

/// Why a fragment was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The fragment does not start with `{`.
    NotJson,
    /// The fragment starts with `{` but is not a decodable chunk.
    Malformed,
}

/// The outcome of decoding one fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A decoded chunk, ready for dispatch.
    Chunk(StreamChunk),
    /// A discarded fragment.
    Dropped(DropReason),
}

/// Decodes a single fragment.
pub fn decode_fragment(fragment: &str) -> Fragment {
    if !fragment.starts_with('{') {
        return Fragment::Dropped(DropReason::NotJson);
    }
    match StreamChunk::decode_leading(fragment) {
        Ok(chunk) => Fragment::Chunk(chunk),
        Err(_) => Fragment::Dropped(DropReason::Malformed),
    }
}

/// Frames and decodes one line, in order.
pub fn decode_line(line: &str, policy: FramingPolicy) -> Vec<Fragment> {
    policy
        .fragments(line)
        .into_iter()
        .map(decode_fragment)
        .collect()
}

/////////////////////////////////////////////// Stream ///////////////////////////////////////////////

struct LineState<S> {
    stream: S,
    framer: LineFramer,
    ready: VecDeque<String>,
    finished: bool,
}

/// Turns a byte stream from an HTTP response into a stream of lines.
///
/// The stream ends when the byte stream ends.  A read error is yielded once and
/// ends the stream; any partial line buffered at that point is discarded.
pub fn process_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineState {
        stream: byte_stream,
        framer: LineFramer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.ready.pop_front() {
                return Some((Ok(line), state));
            }
            if state.finished {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    let lines = state.framer.push(&bytes);
                    state.ready.extend(lines);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(Error::streaming(
                            format!("error reading stream from server: {e}"),
                            Some(Box::new(e)),
                        )),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    if let Some(line) = state.framer.finish() {
                        state.ready.push_back(line);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkType;
    use std::io;

    #[test]
    fn framer_emits_complete_lines() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"one\ntwo\n"), vec!["one", "two"]);
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn framer_joins_lines_split_across_buffers() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: {\"type\":\"con").is_empty());
        assert_eq!(framer.pending(), 18);
        assert_eq!(
            framer.push(b"tent\",\"content\":\"A\"}\n"),
            vec![r#"data: {"type":"content","content":"A"}"#]
        );
    }

    #[test]
    fn framer_strips_carriage_returns() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"a\r\n\r\nb\r"), vec!["a", ""]);
        assert_eq!(framer.push(b"\n"), vec!["b"]);
    }

    #[test]
    fn framer_reassembles_split_utf8() {
        let text = "héllo\n".as_bytes();
        let mut framer = LineFramer::new();
        // Split inside the two-byte 'é'.
        assert!(framer.push(&text[..2]).is_empty());
        assert_eq!(framer.push(&text[2..]), vec!["héllo"]);
    }

    #[test]
    fn framer_flushes_unterminated_tail() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"data: {}").is_empty());
        assert_eq!(framer.finish(), Some("data: {}".to_string()));
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn permissive_splits_concatenated_events() {
        let line = r#"data: {"type":"content","content":"A"}data: {"type":"content","content":"B"}"#;
        assert_eq!(
            FramingPolicy::Permissive.fragments(line),
            vec![
                r#"{"type":"content","content":"A"}"#,
                r#"{"type":"content","content":"B"}"#
            ]
        );
        assert_eq!(
            decode_line(line, FramingPolicy::Permissive),
            vec![
                Fragment::Chunk(StreamChunk::content("A")),
                Fragment::Chunk(StreamChunk::content("B")),
            ]
        );
    }

    #[test]
    fn permissive_keeps_event_prefix_as_junk() {
        let line = r#"event: {"type":"event","content":"run started"}data: {"type":"content","content":"A"}"#;
        assert_eq!(
            decode_line(line, FramingPolicy::Permissive),
            vec![
                Fragment::Dropped(DropReason::NotJson),
                Fragment::Chunk(StreamChunk::content("A")),
            ]
        );
    }

    #[test]
    fn permissive_accepts_unprefixed_json() {
        assert_eq!(
            decode_line(r#"{"type":"done","threadId":"t"}"#, FramingPolicy::Permissive),
            vec![Fragment::Chunk(StreamChunk::done("t"))]
        );
    }

    #[test]
    fn strict_requires_prefix() {
        assert!(
            FramingPolicy::Strict
                .fragments(r#"{"type":"content","content":"A"}"#)
                .is_empty()
        );
        assert!(FramingPolicy::Strict.fragments("event: ping").is_empty());
        assert_eq!(
            decode_line(
                r#"data: {"type":"content","content":"A"}data: {"type":"content","content":"B"}"#,
                FramingPolicy::Strict
            ),
            vec![Fragment::Chunk(StreamChunk::content("A"))]
        );
    }

    #[test]
    fn non_json_and_malformed_fragments_are_dropped() {
        assert_eq!(
            decode_fragment("event:ping"),
            Fragment::Dropped(DropReason::NotJson)
        );
        assert_eq!(
            decode_fragment(r#" {"type":"content"}"#),
            Fragment::Dropped(DropReason::NotJson)
        );
        assert_eq!(
            decode_fragment(r#"{"type":"content","content":"#),
            Fragment::Dropped(DropReason::Malformed)
        );
        assert_eq!(
            decode_fragment("{}"),
            Fragment::Dropped(DropReason::Malformed)
        );
    }

    #[test]
    fn unknown_types_still_decode() {
        let Fragment::Chunk(chunk) = decode_fragment(r#"{"type":"thinking","content":"hmm"}"#)
        else {
            panic!("expected a chunk");
        };
        assert_eq!(chunk.chunk_type, ChunkType::Other("thinking".to_string()));
    }

    #[tokio::test]
    async fn process_lines_across_chunks() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"content\",")),
            Ok(Bytes::from_static(b"\"content\":\"Hi\"}\n\ndata: {\"type\":\"done\"")),
            Ok(Bytes::from_static(b",\"threadid\":\"abc123\"}")),
        ];
        let lines: Vec<Result<String>> = process_lines(stream::iter(chunks)).collect().await;
        let lines: Vec<String> = lines.into_iter().map(|l| l.unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                r#"data: {"type":"content","content":"Hi"}"#.to_string(),
                String::new(),
                r#"data: {"type":"done","threadid":"abc123"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn process_lines_surfaces_read_error() {
        let chunks: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"content\",\"content\":\"A\"}\npartial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never read\n")),
        ];
        let mut lines = Box::pin(process_lines(stream::iter(chunks)));

        let first = lines.next().await.unwrap().unwrap();
        assert_eq!(first, r#"data: {"type":"content","content":"A"}"#);

        let err = lines.next().await.unwrap().unwrap_err();
        assert!(err.is_streaming());
        assert!(err.to_string().contains("reset"));

        assert!(lines.next().await.is_none());
    }
}
