use serde::{Deserialize, Serialize};

/// The JSON body POSTed to the chat endpoint for one turn.
///
/// `threadId` is only present once the server has handed out a thread; the
/// first turn of a conversation carries `content` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message, already trimmed.
    pub content: String,

    /// The conversation to continue, if any.
    #[serde(rename = "threadId", default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    /// Create a request that starts a new conversation.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            thread_id: None,
        }
    }

    /// Continue the given thread.  Empty ids are treated as no thread.
    pub fn with_thread_id(mut self, thread_id: Option<String>) -> Self {
        self.thread_id = thread_id.filter(|id| !id.is_empty());
        self
    }
}
