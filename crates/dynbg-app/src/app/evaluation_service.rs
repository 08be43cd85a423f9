//! Evaluation Service - one scene-to-background cycle per settled chat message
//!
//! This service orchestrates the complete cycle:
//! 1. Drop the event if disabled, already in flight, locked or debounced
//! 2. Build the candidate catalog (warn once if it is empty)
//! 3. Assemble the scene text and run the lexical gate
//! 4. Compose the judge prompt and await the LLM reply
//! 5. Parse the reply and decide
//! 6. Apply the chosen background through the stage
//!
//! At most one cycle runs at a time. Events arriving while a cycle is in
//! flight are dropped, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use dynbg_domain::model::{SceneText, TagFilter};
use dynbg_domain::repository::{BackgroundStage, CatalogSource, Transition};
use dynbg_domain::service::{
    build_catalog, DecisionEngine, TriggerDetector, TriggerVerdict, UNKNOWN_SENTINEL,
};
use dynbg_judge::{parse_reply_with, LlmTransport, PromptComposer, ReplyMarker, SubmitOptions};
use dynbg_types::{ChatMessage, DecisionResult, MessageRole, ScoredCandidate};

use crate::config::{Config, DEFAULT_MATCH_THRESHOLD};

/// Settings read by every cycle
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub enabled: bool,
    pub match_threshold: f64,
    pub regex_word_level: u8,
    /// Configured tag filter, character `bg:` tags are added per event
    pub tags: Vec<String>,
    pub fade: Option<Duration>,
    pub reply_marker: ReplyMarker,
    pub unknown_sentinel: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            regex_word_level: 0,
            tags: Vec::new(),
            fade: None,
            reply_marker: ReplyMarker::default(),
            unknown_sentinel: false,
        }
    }
}

impl From<&Config> for EvaluationSettings {
    fn from(config: &Config) -> Self {
        Self {
            enabled: config.enabled,
            match_threshold: config.match_threshold,
            regex_word_level: config.regex_word_level,
            tags: config.tags.clone(),
            fade: config.fade_duration(),
            reply_marker: config.reply_marker,
            unknown_sentinel: config.unknown_sentinel,
        }
    }
}

/// A settled chat message
#[derive(Debug, Clone)]
pub struct SceneEvent {
    /// Who produced the rendered message
    pub role: MessageRole,
    /// Chat history up to and including the rendered message
    pub history: Vec<ChatMessage>,
    /// Tags of the active character; `bg:` tags join the tag filter
    pub character_tags: Vec<String>,
    /// The chat has a pinned background
    pub background_locked: bool,
}

impl SceneEvent {
    pub fn new(role: MessageRole, history: Vec<ChatMessage>) -> Self {
        Self {
            role,
            history,
            character_tags: Vec::new(),
            background_locked: false,
        }
    }

    pub fn with_character_tags(mut self, tags: Vec<String>) -> Self {
        self.character_tags = tags;
        self
    }

    pub fn with_background_locked(mut self, locked: bool) -> Self {
        self.background_locked = locked;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    /// Another cycle is awaiting the judge
    Pending,
    BackgroundLocked,
    /// The previous cycle changed the background and this event is its echo
    Debounced,
    IgnoredRole,
    EmptyScene,
    NoTrigger,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::Disabled => "disabled",
            SkipReason::Pending => "another evaluation is in flight",
            SkipReason::BackgroundLocked => "background is locked for this chat",
            SkipReason::Debounced => "background changed on the previous message",
            SkipReason::IgnoredRole => "system messages are not evaluated",
            SkipReason::EmptyScene => "scene text is empty",
            SkipReason::NoTrigger => "no movement or location trigger",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Skipped { reason: SkipReason },
    /// No eligible background; the warning was reported to the stage
    EmptyCatalog { message: String },
    Decided { decision: DecisionResult },
    TransportFailed { error: String },
    /// Catalog source or stage failure
    Failed { error: String },
}

/// What one cycle saw and did
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub id: Uuid,
    pub role: MessageRole,
    pub evaluated_at: DateTime<Utc>,
    pub scene: String,
    pub verdict: Option<TriggerVerdict>,
    pub scores: Vec<ScoredCandidate>,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn new(id: Uuid, role: MessageRole) -> Self {
        Self {
            id,
            role,
            evaluated_at: Utc::now(),
            scene: String::new(),
            verdict: None,
            scores: Vec::new(),
            outcome: CycleOutcome::Skipped {
                reason: SkipReason::NoTrigger,
            },
        }
    }
}

/// Released on drop, so every exit path clears the in-flight flag
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrates evaluation cycles against the three collaborators
pub struct SceneEvaluator {
    catalog: Arc<dyn CatalogSource>,
    stage: Arc<dyn BackgroundStage>,
    transport: Arc<dyn LlmTransport>,
    settings: EvaluationSettings,
    detector: TriggerDetector,
    composer: PromptComposer,
    engine: DecisionEngine,
    in_flight: AtomicBool,
    changed_last_cycle: AtomicBool,
}

impl SceneEvaluator {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        stage: Arc<dyn BackgroundStage>,
        transport: Arc<dyn LlmTransport>,
        settings: EvaluationSettings,
    ) -> Self {
        let mut composer = PromptComposer::new(settings.reply_marker);
        let mut engine = DecisionEngine::new(settings.match_threshold);
        if settings.unknown_sentinel {
            composer = composer.with_sentinel(UNKNOWN_SENTINEL);
            engine = engine.with_sentinel(UNKNOWN_SENTINEL);
        }

        Self {
            catalog,
            stage,
            transport,
            settings,
            detector: TriggerDetector::new(),
            composer,
            engine,
            in_flight: AtomicBool::new(false),
            changed_last_cycle: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether the last completed cycle changed the background
    pub fn changed_last_cycle(&self) -> bool {
        self.changed_last_cycle.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    /// Run one cycle for a settled message. Never fails: collaborator errors
    /// are logged and reported in the returned outcome.
    pub async fn on_message_settled(&self, event: SceneEvent) -> CycleReport {
        self.run_cycle(Uuid::new_v4(), event).await
    }

    #[tracing::instrument(name = "cycle", skip_all, fields(id = %id, role = %event.role))]
    async fn run_cycle(&self, id: Uuid, event: SceneEvent) -> CycleReport {
        let mut report = CycleReport::new(id, event.role);
        report.outcome = self.evaluate(&event, &mut report).await;
        match &report.outcome {
            CycleOutcome::Skipped { reason } => tracing::debug!(%reason, "cycle skipped"),
            CycleOutcome::Decided { decision } => tracing::info!(
                action = decision.label(),
                target = decision.target().map(|t| t.display_name.as_str()),
                "cycle decided"
            ),
            _ => {}
        }
        report
    }

    async fn evaluate(&self, event: &SceneEvent, report: &mut CycleReport) -> CycleOutcome {
        let skip = |reason| CycleOutcome::Skipped { reason };

        if !self.settings.enabled {
            return skip(SkipReason::Disabled);
        }

        let Some(_guard) = self.try_acquire() else {
            return skip(SkipReason::Pending);
        };

        if event.background_locked {
            return skip(SkipReason::BackgroundLocked);
        }

        match event.role {
            MessageRole::System => return skip(SkipReason::IgnoredRole),
            MessageRole::Character => {
                if self.changed_last_cycle.swap(false, Ordering::AcqRel) {
                    return skip(SkipReason::Debounced);
                }
            }
            MessageRole::User => self.changed_last_cycle.store(false, Ordering::Release),
        }

        // Catalog
        let raw_labels = match self.catalog.list_raw_labels() {
            Ok(labels) => labels,
            Err(e) => {
                tracing::error!(error = %e, "failed to list backgrounds");
                return CycleOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };
        let filter = TagFilter::new(&self.settings.tags, &event.character_tags);
        let catalog = match build_catalog(&raw_labels, &filter) {
            Ok(catalog) => catalog,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(%message, "empty catalog");
                self.stage.report_warning(&message);
                return CycleOutcome::EmptyCatalog { message };
            }
        };

        // Gate
        let scene = SceneText::from_history(&event.history, event.role);
        report.scene = scene.as_str().trim().to_string();
        if scene.is_blank() {
            return skip(SkipReason::EmptyScene);
        }
        let verdict = self
            .detector
            .evaluate(scene.as_str(), self.settings.regex_word_level, &catalog);
        let triggered = verdict.should_evaluate();
        report.verdict = Some(verdict);
        if !triggered {
            return skip(SkipReason::NoTrigger);
        }

        // Judge
        let names: Vec<&str> = catalog.iter().map(|o| o.display_name.as_str()).collect();
        let prompt = self.composer.compose(&names, scene.as_str());
        tracing::debug!(transport = self.transport.name(), candidates = names.len(), "asking judge");

        let reply = match self
            .transport
            .submit_prompt(self.composer.system_prompt(), &prompt, SubmitOptions::strict())
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "judge call failed");
                return CycleOutcome::TransportFailed {
                    error: e.to_string(),
                };
            }
        };
        tracing::debug!(%reply, "judge replied");

        let mut scores = parse_reply_with(&reply, self.settings.reply_marker);
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        report.scores = scores;

        // Decide
        let current = self.stage.current_background();
        let fallback = report.verdict.as_ref().and_then(|v| v.default_option.as_ref());
        let decision = self
            .engine
            .decide(&report.scores, &catalog, &current, fallback);

        if let Some(target) = decision.target() {
            let transition = self
                .settings
                .fade
                .map(Transition::faded)
                .unwrap_or_else(Transition::instant);
            if let Err(e) = self.stage.apply_background(target, transition) {
                tracing::error!(error = %e, background = %target.handle, "failed to apply background");
                return CycleOutcome::Failed {
                    error: e.to_string(),
                };
            }
            self.changed_last_cycle.store(true, Ordering::Release);
        }

        CycleOutcome::Decided { decision }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.fade_enabled = false;
        config.unknown_sentinel = true;
        config.set_match_threshold(0.8).unwrap();

        let settings = EvaluationSettings::from(&config);
        assert_eq!(settings.fade, None);
        assert!(settings.unknown_sentinel);
        assert_eq!(settings.match_threshold, 0.8);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = CycleOutcome::Skipped {
            reason: SkipReason::NoTrigger,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "no_trigger");
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let flag = AtomicBool::new(true);
        {
            let _guard = InFlightGuard(&flag);
        }
        assert!(!flag.load(Ordering::Acquire));
    }
}
