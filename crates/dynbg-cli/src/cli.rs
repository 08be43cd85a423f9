//! CLI definition using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use dynbg_judge::ReplyMarker;
use dynbg_types::{MessageRole, OutputFormat};

#[derive(Parser)]
#[command(name = "dynbg")]
#[command(author = "yuuji")]
#[command(version)]
#[command(about = "Switch the chat background to match the scene, judged by an LLM")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/dynbg/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one full evaluation cycle for a chat message
    Evaluate {
        /// Latest user message
        #[arg(long, short = 'u')]
        user: String,

        /// Latest character reply
        #[arg(long, short = 'c')]
        character: Option<String>,

        /// Role of the settled message (defaults to character when --character is given)
        #[arg(long, value_enum)]
        role: Option<MessageRole>,

        /// Character tag, repeatable (e.g. bg:outdoor)
        #[arg(long = "character-tag", short = 't')]
        character_tags: Vec<String>,

        /// The chat has a pinned background
        #[arg(long)]
        locked: bool,

        /// Use this reply instead of calling the LLM command
        #[arg(long)]
        reply: Option<String>,
    },

    /// Show whether a text passes the lexical trigger gate
    Gate {
        /// Scene text
        text: String,

        /// Trigger tier level (0-2). Uses config value if not specified.
        #[arg(long, short = 'l')]
        level: Option<u8>,
    },

    /// List the backgrounds eligible under the tag filter
    Catalog {
        /// Character tag, repeatable (e.g. bg:outdoor)
        #[arg(long = "character-tag", short = 't')]
        character_tags: Vec<String>,
    },

    /// Print the judge prompts for a scene
    Prompt {
        /// Scene text
        scene: String,

        /// Character tag, repeatable (e.g. bg:outdoor)
        #[arg(long = "character-tag", short = 't')]
        character_tags: Vec<String>,
    },

    /// Parse a judge reply into ranked scores
    Parse {
        /// Raw reply text
        reply: String,

        /// Reply marker (top5, single). Uses config value if not specified.
        #[arg(long, short = 'm')]
        marker: Option<ReplyMarker>,
    },

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Enable/disable background switching
    #[arg(long)]
    pub set_enabled: Option<bool>,

    /// Enable/disable the fade transition
    #[arg(long)]
    pub set_fade: Option<bool>,

    /// Set fade duration in milliseconds
    #[arg(long)]
    pub set_fade_ms: Option<u64>,

    /// Set match threshold (0.0-1.0)
    #[arg(long)]
    pub set_threshold: Option<f64>,

    /// Restore the default match threshold
    #[arg(long)]
    pub reset_threshold: bool,

    /// Set trigger tier level (0-2)
    #[arg(long)]
    pub set_level: Option<u8>,

    /// Set tag filter as a comma-separated list ("" clears it)
    #[arg(long)]
    pub set_tags: Option<String>,

    /// Set reply marker (top5, single)
    #[arg(long)]
    pub set_marker: Option<ReplyMarker>,

    /// Offer the judge an explicit "unknown" answer
    #[arg(long)]
    pub set_unknown_sentinel: Option<bool>,

    /// Set LLM command line (e.g. "claude -p")
    #[arg(long)]
    pub set_command: Option<String>,

    /// Set flag passing the system prompt as an argument ("" sends it on stdin)
    #[arg(long)]
    pub set_system_prompt_flag: Option<String>,

    /// Set LLM command timeout in seconds
    #[arg(long)]
    pub set_timeout: Option<u64>,

    /// Set background image directory
    #[arg(long)]
    pub set_catalog_dir: Option<PathBuf>,

    /// Set background label file
    #[arg(long)]
    pub set_catalog_file: Option<PathBuf>,

    /// Set stage state directory
    #[arg(long)]
    pub set_state_dir: Option<PathBuf>,

    /// Set default output format
    #[arg(long)]
    pub set_output: Option<OutputFormat>,

    /// Reset to defaults
    #[arg(long)]
    pub reset: bool,
}
