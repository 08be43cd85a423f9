//! Judge module - asks an LLM to rank candidate locations for a scene

pub mod ai;

// Re-export main types for convenience
pub use ai::backend_impl::{CommandTransport, ReplayTransport};
pub use ai::prompts::{compose_prompt, PromptComposer, SYSTEM_PROMPT};
pub use ai::reply_parser::{parse_reply, parse_reply_with, ReplyMarker};
pub use ai::transport::{LlmTransport, SubmitOptions, TransportError};
