use serde::{Deserialize, Serialize};

/// The `type` tag of a [`StreamChunk`].
///
/// Only `content` and `done` drive the client.  Everything else the server
/// emits (`start`, `event`, `error`, ...) is kept verbatim in `Other` so it can
/// be counted and logged, then ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChunkType {
    /// A piece of assistant text to print immediately.
    Content,
    /// The terminal chunk of a turn, carrying the thread id.
    Done,
    /// Any other tag.
    Other(String),
}

impl ChunkType {
    /// The tag as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            ChunkType::Content => "content",
            ChunkType::Done => "done",
            ChunkType::Other(other) => other,
        }
    }
}

impl From<String> for ChunkType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "content" => ChunkType::Content,
            "done" => ChunkType::Done,
            _ => ChunkType::Other(tag),
        }
    }
}

impl From<ChunkType> for String {
    fn from(chunk_type: ChunkType) -> Self {
        match chunk_type {
            ChunkType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded JSON payload from the response stream.
///
/// Fields the client has no use for (`timestamp`, `requestId`, `error`) are
/// skipped during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// The discriminator.
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    /// Assistant text; meaningful for [`ChunkType::Content`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Conversation id; meaningful for [`ChunkType::Done`].
    ///
    /// The server writes `threadId`; `threadid` is accepted as well.
    #[serde(
        rename = "threadid",
        alias = "threadId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thread_id: Option<String>,
}

impl StreamChunk {
    /// Create a content chunk.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            chunk_type: ChunkType::Content,
            content: Some(text.into()),
            thread_id: None,
        }
    }

    /// Create a done chunk.
    pub fn done(thread_id: impl Into<String>) -> Self {
        Self {
            chunk_type: ChunkType::Done,
            content: None,
            thread_id: Some(thread_id.into()),
        }
    }

    /// Decode the JSON object at the start of `fragment`.
    ///
    /// Anything after the closing brace is ignored, so a payload followed on
    /// the same line by `event: {...}` still decodes.  This is looser than a
    /// whole-input JSON decode, which would drop `{...}junk` as malformed.
    pub fn decode_leading(fragment: &str) -> serde_json::Result<Self> {
        let mut values = serde_json::Deserializer::from_str(fragment).into_iter::<Self>();
        match values.next() {
            Some(result) => result,
            None => serde_json::from_str(fragment),
        }
    }
}
