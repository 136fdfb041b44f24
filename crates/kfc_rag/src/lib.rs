//! Streaming question answering over the reading shelf.

pub mod frames;
pub mod message;
pub mod session;
pub mod streams;

pub use frames::{JsonLineDecoder, SseDecoder};
pub use message::{StreamMessage, StreamRequest};
pub use session::{ErrorState, RagSession, SessionState};
pub use streams::{
    create_stream_service, DatasetRagStream, MessageSink, MockRagStream, MockStreamDelays,
    RagStreamService, RagflowDirectStream, StreamKind,
};
