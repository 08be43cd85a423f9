//! Transport implementations
//!
//! `CommandTransport` runs an LLM command-line tool (e.g. `claude -p`,
//! `gemini`), writes the prompt on stdin and reads the reply from stdout.
//! `ReplayTransport` answers every prompt with a fixed reply.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::transport::{LlmTransport, SubmitOptions, TransportError};

/// LlmTransport backed by an external command
#[derive(Debug, Clone)]
pub struct CommandTransport {
    program: String,
    args: Vec<String>,
    system_prompt_flag: Option<String>,
    timeout: Option<Duration>,
}

impl CommandTransport {
    /// Parse a shell-style command line such as `claude -p --model sonnet`
    pub fn from_command_line(line: &str) -> Result<Self, TransportError> {
        let parts =
            shell_words::split(line).map_err(|e| TransportError::InvalidCommand(e.to_string()))?;
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| TransportError::InvalidCommand("empty command".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            system_prompt_flag: None,
            timeout: None,
        })
    }

    /// Pass the system prompt as `<flag> <prompt>` instead of on stdin
    pub fn with_system_prompt_flag(mut self, flag: Option<String>) -> Self {
        self.system_prompt_flag = flag.filter(|f| !f.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        shell_words::join(parts)
    }

    fn stdin_payload(&self, system_prompt: &str, user_prompt: &str) -> String {
        if self.system_prompt_flag.is_some() {
            user_prompt.to_string()
        } else {
            format!("{}\n\n{}", system_prompt.trim(), user_prompt.trim())
        }
    }

    async fn run(&self, system_prompt: &str, payload: String) -> Result<String, TransportError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(flag) = &self.system_prompt_flag {
            cmd.arg(flag).arg(system_prompt);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
            command: self.command_line(),
            source,
        })?;

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if let Err(e) = written {
            // The tool may exit without reading all of stdin
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }

        if !output.status.success() {
            return Err(TransportError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(TransportError::EmptyReply);
        }
        Ok(reply)
    }
}

#[async_trait]
impl LlmTransport for CommandTransport {
    async fn submit_prompt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: SubmitOptions,
    ) -> Result<String, TransportError> {
        tracing::debug!(
            command = %self.command_line(),
            strict = options.strict_instruction_mode,
            "submitting prompt"
        );
        let payload = self.stdin_payload(system_prompt, user_prompt);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(system_prompt, payload))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.run(system_prompt, payload).await,
        }
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// LlmTransport that returns the same reply for every prompt
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    reply: String,
}

impl ReplayTransport {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl LlmTransport for ReplayTransport {
    async fn submit_prompt(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _options: SubmitOptions,
    ) -> Result<String, TransportError> {
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
