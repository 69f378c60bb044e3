pub mod accumulator;
pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use accumulator::ToolCallAccumulator;
pub use client::{ChatApi, ChatClient, ChatOptions, ChatOutcome};
pub use models::RequestBody;
pub use streaming::{SseConsumer, StreamEvent};
