//! Value types shared by every layer of the background matcher

use serde::{Deserialize, Serialize};

/// Who authored a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Character,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Character => write!(f, "character"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// A single rendered chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn character(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Character, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }
}

/// A raw catalog entry as delivered by a catalog source.
///
/// `handle` identifies the background towards the stage (usually a file name);
/// `label` is the human title that may embed `[tag]` groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLabel {
    pub handle: String,
    pub label: String,
}

impl RawLabel {
    pub fn new(handle: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            label: label.into(),
        }
    }

    /// Entry whose handle is the label itself
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            handle: label.clone(),
            label,
        }
    }
}

/// One selectable background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateOption {
    /// Opaque handle passed back to the stage when applying
    pub handle: String,
    /// Label with all `[tag]` groups removed, trimmed
    pub display_name: String,
    /// Lower-cased tags in left-to-right order, without duplicates
    pub tags: Vec<String>,
}

impl CandidateOption {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.display_name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// A validated `name:score` pair from the judge reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub name: String,
    /// Finite, within `[0, 100]`
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }

    /// Score normalised to `[0, 1]` for threshold comparison
    pub fn ratio(&self) -> f64 {
        self.score / 100.0
    }
}

/// Outcome of the decision step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum DecisionResult {
    NoAction,
    Commit(CandidateOption),
    FallbackCommit(CandidateOption),
}

impl DecisionResult {
    /// The background to apply, if any
    pub fn target(&self) -> Option<&CandidateOption> {
        match self {
            DecisionResult::NoAction => None,
            DecisionResult::Commit(target) | DecisionResult::FallbackCommit(target) => Some(target),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DecisionResult::NoAction => "no action",
            DecisionResult::Commit(_) => "commit",
            DecisionResult::FallbackCommit(_) => "fallback commit",
        }
    }
}
