//! Decision policy turning judge scores into a background action
//!
//! First match or nothing: the highest-ranked entry that names a catalog
//! option decides. If it is below threshold no lower entry is tried.

use dynbg_types::{CandidateOption, DecisionResult, ScoredCandidate};

/// Location name the judge may use for "no physical setting"
pub const UNKNOWN_SENTINEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEngine {
    threshold: f64,
    sentinel: Option<String>,
}

impl DecisionEngine {
    /// `threshold` is compared against `score / 100`
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            sentinel: None,
        }
    }

    /// Treat `sentinel` as an explicit "no match" answer
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = Some(sentinel.into());
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn is_sentinel(&self, name: &str) -> bool {
        self.sentinel
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(name.trim()))
    }

    pub fn decide(
        &self,
        scored: &[ScoredCandidate],
        catalog: &[CandidateOption],
        current_background: &str,
        fallback: Option<&CandidateOption>,
    ) -> DecisionResult {
        let mut ranked = scored.to_vec();
        // Vec::sort_by is stable, equal scores keep the judge's order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        for entry in &ranked {
            if self.is_sentinel(&entry.name)
                && !catalog.iter().any(|option| option.name_matches(&entry.name))
            {
                tracing::debug!(score = entry.score, "judge ranked the scene as unknown");
                return DecisionResult::NoAction;
            }

            let Some(matched) = catalog.iter().find(|option| option.name_matches(&entry.name))
            else {
                tracing::warn!(name = %entry.name, "judge named a background that is not in the catalog");
                continue;
            };

            if entry.ratio() < self.threshold {
                tracing::debug!(
                    name = %matched.display_name,
                    score = entry.score,
                    threshold = self.threshold,
                    "top match scored below threshold"
                );
                return DecisionResult::NoAction;
            }

            if is_already_active(matched, current_background) {
                tracing::debug!(name = %matched.display_name, "matched background is already set");
                return DecisionResult::NoAction;
            }

            return DecisionResult::Commit(matched.clone());
        }

        match fallback {
            Some(option) => {
                tracing::debug!(name = %option.display_name, "falling back to direct name match");
                DecisionResult::FallbackCommit(option.clone())
            }
            None => DecisionResult::NoAction,
        }
    }
}

/// The active background id is a file-like name, so `name.` marks it as set.
fn is_already_active(option: &CandidateOption, current_background: &str) -> bool {
    current_background.contains(&format!("{}.", option.display_name))
}

/// Decide with a plain threshold and no sentinel
pub fn decide(
    scored: &[ScoredCandidate],
    catalog: &[CandidateOption],
    threshold: f64,
    current_background: &str,
    fallback: Option<&CandidateOption>,
) -> DecisionResult {
    DecisionEngine::new(threshold).decide(scored, catalog, current_background, fallback)
}
