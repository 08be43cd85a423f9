//! Collaborator traits the domain depends on but does not implement

use std::time::Duration;

use dynbg_types::{CandidateOption, RawLabel, Result};

/// Source of raw background labels, re-read on every evaluation
pub trait CatalogSource: Send + Sync {
    fn list_raw_labels(&self) -> Result<Vec<RawLabel>>;
}

/// Visual transition requested together with a background change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    /// Fade out, switch after this delay, fade back in
    pub fade: Option<Duration>,
}

impl Transition {
    pub fn instant() -> Self {
        Self { fade: None }
    }

    pub fn faded(duration: Duration) -> Self {
        Self {
            fade: Some(duration),
        }
    }
}

/// The UI surface that shows backgrounds and warnings
pub trait BackgroundStage: Send + Sync {
    /// Identifier of the currently active background (empty when none)
    fn current_background(&self) -> String;

    fn apply_background(&self, option: &CandidateOption, transition: Transition) -> Result<()>;

    fn report_warning(&self, message: &str);
}
