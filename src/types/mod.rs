// Public modules
pub mod chat_request;
pub mod stream_chunk;

// Re-exports
pub use chat_request::ChatRequest;
pub use stream_chunk::{ChunkType, StreamChunk};
