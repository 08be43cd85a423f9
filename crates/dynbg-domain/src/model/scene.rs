//! Scene text assembled from the chat history

use dynbg_types::{ChatMessage, MessageRole};

/// Text the gate and the judge evaluate for one cycle.
///
/// The latest user utterance comes first. For character events the latest
/// non-user, non-system utterance follows, separated by a single space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneText(String);

impl SceneText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Build the scene for an event of `role` from the rendered history.
    pub fn from_history(history: &[ChatMessage], role: MessageRole) -> Self {
        let last_user = history
            .iter()
            .rev()
            .find(|msg| msg.role == MessageRole::User)
            .map(|msg| msg.text.as_str())
            .unwrap_or("");

        let last_character = if role == MessageRole::Character {
            history
                .iter()
                .rev()
                .find(|msg| msg.role == MessageRole::Character)
                .map(|msg| msg.text.as_str())
                .unwrap_or("")
        } else {
            ""
        };

        Self(format!("{} {}", last_user, last_character))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for SceneText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
