//! Conversation state and the per-turn stream dispatch.
//!
//! [`Session`] holds the only state that survives between turns: the thread
//! id handed out by the server.  The caller owns it and passes it into every
//! turn; nothing here is global.

use std::time::Instant;

use futures::StreamExt;

use crate::client::ChatClient;
use crate::error::Result;
use crate::observability::{
    SESSION_THREAD_CHANGES, STREAM_CHUNKS, STREAM_DROPPED_FRAGMENTS, STREAM_DURATION,
    STREAM_ERRORS, STREAM_IGNORED_CHUNKS, STREAM_LINES,
};
use crate::render::Renderer;
use crate::sse::{DropReason, FramingPolicy, Fragment, decode_line};
use crate::types::{ChatRequest, ChunkType, StreamChunk};

/// Per-turn accounting of what the stream contained.
///
/// Dropped fragments are never shown to the user; these counts are the only
/// place they surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Non-empty lines read from the response body.
    pub lines: u64,
    /// Fragments that decoded into a chunk.
    pub chunks: u64,
    /// Chunks of type `content`.
    pub content_chunks: u64,
    /// Decoded chunks whose type this client does not act on.
    pub ignored_chunks: u64,
    /// Fragments that did not start with `{`.
    pub dropped_not_json: u64,
    /// Fragments that started with `{` but failed to decode.
    pub dropped_malformed: u64,
    /// Whether a `done` chunk changed the thread id.
    pub thread_changed: bool,
}

impl TurnSummary {
    /// Total fragments discarded during the turn.
    pub fn dropped(&self) -> u64 {
        self.dropped_not_json + self.dropped_malformed
    }

    fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::NotJson => self.dropped_not_json += 1,
            DropReason::Malformed => self.dropped_malformed += 1,
        }
    }
}

/// The conversation a chat client is in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    thread_id: Option<String>,
}

impl Session {
    /// Creates a session with no thread.  The first request starts one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that resumes `thread_id`.  Empty ids are ignored.
    pub fn with_thread_id(thread_id: Option<String>) -> Self {
        Self {
            thread_id: thread_id.filter(|id| !id.is_empty()),
        }
    }

    /// Returns the current thread id, if any.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Forgets the thread so the next request starts a new conversation.
    pub fn clear(&mut self) {
        self.thread_id = None;
    }

    /// Builds the request for one turn.
    pub fn request_for(&self, message: &str) -> ChatRequest {
        ChatRequest::new(message).with_thread_id(self.thread_id.clone())
    }

    /// Applies the id carried by a `done` chunk.  Returns true if it changed.
    ///
    /// A missing or empty id clears the thread.
    pub fn apply_done(&mut self, thread_id: Option<String>) -> bool {
        let next = thread_id.filter(|id| !id.is_empty());
        if next == self.thread_id {
            return false;
        }
        tracing::info!(
            previous = self.thread_id.as_deref().unwrap_or(""),
            current = next.as_deref().unwrap_or(""),
            "conversation thread changed"
        );
        SESSION_THREAD_CHANGES.click();
        self.thread_id = next;
        true
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Builds the request from `user_input` and the current thread id
    /// 2. POSTs it and waits for a `200 OK`
    /// 3. Renders `content` chunks as they arrive
    /// 4. Adopts the thread id of any `done` chunk
    ///
    /// Nothing is rendered if the request fails.  If the stream fails part way
    /// the text already shown stays, the response is finished, and the error
    /// is returned.  Thread changes seen before the failure are kept.
    pub async fn send_streaming(
        &mut self,
        client: &ChatClient,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnSummary> {
        let request = self.request_for(user_input);
        let lines = client.open_stream(&request).await?;
        futures::pin_mut!(lines);

        let started = Instant::now();
        renderer.start_response();

        let mut summary = TurnSummary::default();
        let mut outcome = Ok(());
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => self.dispatch_line(&line, client.framing(), renderer, &mut summary),
                Err(err) => {
                    STREAM_ERRORS.click();
                    outcome = Err(err);
                    break;
                }
            }
        }

        renderer.finish_response();
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        outcome.map(|()| summary)
    }

    /// Frames one line and dispatches every fragment on it, in order.
    pub fn dispatch_line(
        &mut self,
        line: &str,
        framing: FramingPolicy,
        renderer: &mut dyn Renderer,
        summary: &mut TurnSummary,
    ) {
        if line.is_empty() {
            return;
        }
        summary.lines += 1;
        STREAM_LINES.click();

        for fragment in decode_line(line, framing) {
            match fragment {
                Fragment::Chunk(chunk) => self.dispatch_chunk(chunk, renderer, summary),
                Fragment::Dropped(reason) => {
                    summary.record_drop(reason);
                    STREAM_DROPPED_FRAGMENTS.click();
                    tracing::debug!(?reason, line, "dropped stream fragment");
                }
            }
        }
    }

    fn dispatch_chunk(
        &mut self,
        chunk: StreamChunk,
        renderer: &mut dyn Renderer,
        summary: &mut TurnSummary,
    ) {
        summary.chunks += 1;
        STREAM_CHUNKS.click();
        match chunk.chunk_type {
            ChunkType::Content => {
                summary.content_chunks += 1;
                if let Some(text) = chunk.content.as_deref() {
                    renderer.print_text(text);
                }
            }
            ChunkType::Done => {
                if self.apply_done(chunk.thread_id) {
                    summary.thread_changed = true;
                }
            }
            ChunkType::Other(chunk_type) => {
                summary.ignored_chunks += 1;
                STREAM_IGNORED_CHUNKS.click();
                tracing::debug!(%chunk_type, "ignored stream chunk");
            }
        }
    }
}
