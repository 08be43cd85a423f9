//! Collaborator interface for submitting prompts to an LLM

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use dynbg_types::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to start LLM command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("LLM command exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("LLM command timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid LLM command line: {0}")]
    InvalidCommand(String),

    #[error("LLM IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM returned an empty reply")]
    EmptyReply,
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Per-call options forwarded to the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Deliver the prompt as a bare instruction, outside any chat framing
    pub strict_instruction_mode: bool,
}

impl SubmitOptions {
    pub fn strict() -> Self {
        Self {
            strict_instruction_mode: true,
        }
    }
}

/// Submit a system prompt plus a user prompt and receive the raw reply.
///
/// Implementations must reject on failure rather than hang; any timeout is
/// theirs to enforce.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn submit_prompt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: SubmitOptions,
    ) -> Result<String, TransportError>;

    fn name(&self) -> &str;
}
