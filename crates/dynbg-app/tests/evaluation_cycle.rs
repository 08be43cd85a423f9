//! Evaluation cycle tests against in-memory collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use dynbg_app::app::{CycleOutcome, EvaluationSettings, SceneEvaluator, SceneEvent, SkipReason};
use dynbg_domain::repository::{BackgroundStage, CatalogSource, Transition};
use dynbg_judge::{LlmTransport, SubmitOptions, TransportError};
use dynbg_types::{CandidateOption, ChatMessage, DecisionResult, MessageRole, RawLabel, Result};

// ============================================================================
// Fakes
// ============================================================================

struct MemoryCatalog(Vec<RawLabel>);

impl CatalogSource for MemoryCatalog {
    fn list_raw_labels(&self) -> Result<Vec<RawLabel>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct RecordingStage {
    current: Mutex<String>,
    applied: Mutex<Vec<(CandidateOption, Transition)>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingStage {
    fn with_current(current: &str) -> Self {
        Self {
            current: Mutex::new(current.to_string()),
            ..Self::default()
        }
    }

    fn applied(&self) -> Vec<(CandidateOption, Transition)> {
        self.applied.lock().unwrap().clone()
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl BackgroundStage for RecordingStage {
    fn current_background(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn apply_background(&self, option: &CandidateOption, transition: Transition) -> Result<()> {
        *self.current.lock().unwrap() = option.handle.clone();
        self.applied.lock().unwrap().push((option.clone(), transition));
        Ok(())
    }

    fn report_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }
}

/// Replies from a script; the last reply repeats once the script runs out
struct ScriptedTransport {
    replies: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
    last: String,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn replying(reply: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            last: reply.to_string(),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_once_then(reply: &str) -> Self {
        let transport = Self::replying(reply);
        transport
            .replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::EmptyReply));
        transport
    }

    fn gated(reply: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(reply)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn submit_prompt(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _options: SubmitOptions,
    ) -> std::result::Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let scripted = self.replies.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.last.clone()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn labels() -> Vec<RawLabel> {
    vec![
        RawLabel::new("wine cellar.jpg", "wine cellar [indoor]"),
        RawLabel::new("central park.jpg", "central park [outdoor]"),
    ]
}

struct Harness {
    evaluator: SceneEvaluator,
    stage: Arc<RecordingStage>,
    transport: Arc<ScriptedTransport>,
}

fn harness_with(
    labels: Vec<RawLabel>,
    stage: RecordingStage,
    transport: ScriptedTransport,
    settings: EvaluationSettings,
) -> Harness {
    let stage = Arc::new(stage);
    let transport = Arc::new(transport);
    let evaluator = SceneEvaluator::new(
        Arc::new(MemoryCatalog(labels)),
        stage.clone(),
        transport.clone(),
        settings,
    );
    Harness {
        evaluator,
        stage,
        transport,
    }
}

fn harness(reply: &str) -> Harness {
    harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::replying(reply),
        EvaluationSettings::default(),
    )
}

fn user_event(text: &str) -> SceneEvent {
    SceneEvent::new(MessageRole::User, vec![ChatMessage::user(text)])
}

fn character_event(user: &str, character: &str) -> SceneEvent {
    SceneEvent::new(
        MessageRole::Character,
        vec![ChatMessage::user(user), ChatMessage::character(character)],
    )
}

fn committed_name(outcome: &CycleOutcome) -> Option<&str> {
    match outcome {
        CycleOutcome::Decided {
            decision: DecisionResult::Commit(option),
        } => Some(option.display_name.as_str()),
        _ => None,
    }
}

const ENTER_CELLAR: &str = "We walk down the stairs into the wine cellar.";

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_commit_applies_background() {
    let h = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::replying("<TOP_5_RESULTS>wine cellar:95,central park:10</TOP_5_RESULTS>"),
        EvaluationSettings {
            fade: Some(Duration::from_millis(1000)),
            ..EvaluationSettings::default()
        },
    );

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert_eq!(committed_name(&report.outcome), Some("wine cellar"));
    assert_eq!(report.scores.len(), 2);
    assert_eq!(report.scores[0].name, "wine cellar");
    let applied = h.stage.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].0.handle, "wine cellar.jpg");
    assert_eq!(applied[0].1, Transition::faded(Duration::from_millis(1000)));
    assert!(h.evaluator.changed_last_cycle());
    assert!(!h.evaluator.is_pending());
}

#[tokio::test]
async fn test_second_trigger_while_pending_is_dropped() {
    let gate = Arc::new(Notify::new());
    let h = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::gated("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>", gate.clone()),
        EvaluationSettings::default(),
    );

    let first = h.evaluator.on_message_settled(user_event(ENTER_CELLAR));
    let second = async {
        while !h.evaluator.is_pending() {
            tokio::task::yield_now().await;
        }
        let report = h
            .evaluator
            .on_message_settled(user_event("We leave for central park."))
            .await;
        gate.notify_one();
        report
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(committed_name(&first.outcome), Some("wine cellar"));
    assert_eq!(
        second.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::Pending
        }
    );
    assert_eq!(h.transport.calls(), 1);
    assert_eq!(h.stage.applied().len(), 1);
    assert!(!h.evaluator.is_pending());
}

#[tokio::test]
async fn test_empty_catalog_warns_once_and_never_asks() {
    let h = harness_with(
        vec![],
        RecordingStage::default(),
        ScriptedTransport::replying("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>"),
        EvaluationSettings::default(),
    );

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert!(matches!(report.outcome, CycleOutcome::EmptyCatalog { .. }));
    assert_eq!(h.stage.warnings().len(), 1);
    assert!(h.stage.warnings()[0].contains("No backgrounds to choose from"));
    assert!(h.stage.applied().is_empty());
    assert_eq!(h.transport.calls(), 0);
    assert!(!h.evaluator.is_pending());
}

#[tokio::test]
async fn test_tag_filter_that_excludes_everything_warns() {
    let h = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::replying("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>"),
        EvaluationSettings {
            tags: vec!["night".to_string()],
            ..EvaluationSettings::default()
        },
    );

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert!(matches!(report.outcome, CycleOutcome::EmptyCatalog { .. }));
    assert_eq!(h.stage.warnings().len(), 1);
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn test_below_threshold_is_no_action() {
    let h = harness("<TOP_5_RESULTS>wine cellar:40,central park:30</TOP_5_RESULTS>");

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Decided {
            decision: DecisionResult::NoAction
        }
    );
    assert!(h.stage.applied().is_empty());
    assert!(!h.evaluator.changed_last_cycle());
}

#[tokio::test]
async fn test_already_active_background_is_not_reapplied() {
    let h = harness_with(
        labels(),
        RecordingStage::with_current("wine cellar.jpg"),
        ScriptedTransport::replying("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>"),
        EvaluationSettings::default(),
    );

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Decided {
            decision: DecisionResult::NoAction
        }
    );
    assert!(h.stage.applied().is_empty());
}

#[tokio::test]
async fn test_unparseable_reply_falls_back_to_named_background() {
    let h = harness("Sorry, I cannot help with that.");

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert!(report.scores.is_empty());
    match &report.outcome {
        CycleOutcome::Decided {
            decision: DecisionResult::FallbackCommit(option),
        } => assert_eq!(option.display_name, "wine cellar"),
        other => panic!("expected fallback commit, got {:?}", other),
    }
    assert_eq!(h.stage.applied().len(), 1);
}

#[tokio::test]
async fn test_transport_failure_releases_the_guard() {
    let h = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::failing_once_then("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>"),
        EvaluationSettings::default(),
    );

    let failed = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;
    assert!(matches!(failed.outcome, CycleOutcome::TransportFailed { .. }));
    assert!(!h.evaluator.is_pending());
    assert!(h.stage.applied().is_empty());

    let retried = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;
    assert_eq!(committed_name(&retried.outcome), Some("wine cellar"));
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn test_character_echo_after_change_is_debounced() {
    let h = harness("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>");

    let first = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;
    assert_eq!(committed_name(&first.outcome), Some("wine cellar"));

    let echo = h
        .evaluator
        .on_message_settled(character_event(ENTER_CELLAR, "She follows you inside."))
        .await;
    assert_eq!(
        echo.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::Debounced
        }
    );
    assert_eq!(h.transport.calls(), 1);

    let next = h
        .evaluator
        .on_message_settled(character_event(ENTER_CELLAR, "She follows you inside."))
        .await;
    assert!(matches!(next.outcome, CycleOutcome::Decided { .. }));
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn test_character_scene_includes_reply_text() {
    let h = harness("<TOP_5_RESULTS>central park:90</TOP_5_RESULTS>");

    let report = h
        .evaluator
        .on_message_settled(character_event("Let's go.", "They head to central park."))
        .await;

    assert_eq!(report.scene, "Let's go. They head to central park.");
    assert_eq!(committed_name(&report.outcome), Some("central park"));
}

#[tokio::test]
async fn test_disabled_and_locked_skip_everything() {
    let disabled = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::replying("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>"),
        EvaluationSettings {
            enabled: false,
            ..EvaluationSettings::default()
        },
    );
    let report = disabled.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::Disabled
        }
    );
    assert_eq!(disabled.transport.calls(), 0);

    let locked = harness("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>");
    let report = locked
        .evaluator
        .on_message_settled(user_event(ENTER_CELLAR).with_background_locked(true))
        .await;
    assert_eq!(
        report.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::BackgroundLocked
        }
    );
    assert_eq!(locked.transport.calls(), 0);
    assert!(!locked.evaluator.is_pending());
}

#[tokio::test]
async fn test_small_talk_does_not_trigger() {
    let h = harness("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>");

    let report = h
        .evaluator
        .on_message_settled(user_event("Hello there, how are you?"))
        .await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::NoTrigger
        }
    );
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn test_character_bg_tags_narrow_the_catalog() {
    let h = harness("<TOP_5_RESULTS>wine cellar:100,central park:80</TOP_5_RESULTS>");

    let event = user_event("We walk outside.")
        .with_character_tags(vec!["BG:Outdoor".to_string(), "villain".to_string()]);
    let report = h.evaluator.on_message_settled(event).await;

    // wine cellar is filtered out, so the judge's top pick is skipped
    assert_eq!(committed_name(&report.outcome), Some("central park"));
}

#[tokio::test]
async fn test_unknown_sentinel_blocks_fallback() {
    let h = harness_with(
        labels(),
        RecordingStage::default(),
        ScriptedTransport::replying("<TOP_5_RESULTS>unknown:90,wine cellar:70</TOP_5_RESULTS>"),
        EvaluationSettings {
            unknown_sentinel: true,
            ..EvaluationSettings::default()
        },
    );

    let report = h.evaluator.on_message_settled(user_event(ENTER_CELLAR)).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Decided {
            decision: DecisionResult::NoAction
        }
    );
    assert!(h.stage.applied().is_empty());
}

#[tokio::test]
async fn test_system_messages_are_ignored() {
    let h = harness("<TOP_5_RESULTS>wine cellar:95</TOP_5_RESULTS>");
    let event = SceneEvent::new(MessageRole::System, vec![ChatMessage::system(ENTER_CELLAR)]);

    let report = h.evaluator.on_message_settled(event).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::IgnoredRole
        }
    );
}
