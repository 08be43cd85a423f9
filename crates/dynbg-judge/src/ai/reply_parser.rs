//! Reply parsing for the judge output
//!
//! The reply is untrusted text. Formatting noise is tolerated (missing closing
//! tag, trailing commas, stray prose), numeric validity is not: a score that is
//! not a finite number in `[0, 100]` drops its entry instead of being clamped.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use dynbg_types::ScoredCandidate;

/// Marker pair delimiting the result line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMarker {
    /// `<TOP_5_RESULTS>a:90,b:40,...</TOP_5_RESULTS>`
    #[default]
    Top5,
    /// `<RESULT>a:90</RESULT>`
    Single,
}

impl ReplyMarker {
    pub fn tag(self) -> &'static str {
        match self {
            ReplyMarker::Top5 => "TOP_5_RESULTS",
            ReplyMarker::Single => "RESULT",
        }
    }

    pub fn open(self) -> String {
        format!("<{}>", self.tag())
    }

    pub fn close(self) -> String {
        format!("</{}>", self.tag())
    }

    /// Number of `name:score` pairs the judge is asked for
    pub fn max_results(self) -> usize {
        match self {
            ReplyMarker::Top5 => 5,
            ReplyMarker::Single => 1,
        }
    }

    fn patterns(self) -> &'static MarkerPatterns {
        match self {
            ReplyMarker::Top5 => &TOP5_PATTERNS,
            ReplyMarker::Single => &SINGLE_PATTERNS,
        }
    }
}

impl std::fmt::Display for ReplyMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyMarker::Top5 => write!(f, "top5"),
            ReplyMarker::Single => write!(f, "single"),
        }
    }
}

impl std::str::FromStr for ReplyMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top5" | "top_5_results" => Ok(ReplyMarker::Top5),
            "single" | "result" => Ok(ReplyMarker::Single),
            other => Err(format!("unknown reply marker: {} (expected top5 or single)", other)),
        }
    }
}

struct MarkerPatterns {
    /// First well-formed open/close span, inner text captured
    span: Regex,
    /// Any lone open or close marker
    tag: Regex,
}

impl MarkerPatterns {
    fn compile(tag: &str) -> Self {
        Self {
            span: Regex::new(&format!(r"(?is)<{0}>(.*?)</{0}>", tag))
                .expect("marker span pattern must compile"),
            tag: Regex::new(&format!(r"(?i)</?{}>", tag)).expect("marker pattern must compile"),
        }
    }
}

static TOP5_PATTERNS: LazyLock<MarkerPatterns> =
    LazyLock::new(|| MarkerPatterns::compile(ReplyMarker::Top5.tag()));

static SINGLE_PATTERNS: LazyLock<MarkerPatterns> =
    LazyLock::new(|| MarkerPatterns::compile(ReplyMarker::Single.tag()));

/// Parse a reply using the default `<TOP_5_RESULTS>` markers
pub fn parse_reply(raw: &str) -> Vec<ScoredCandidate> {
    parse_reply_with(raw, ReplyMarker::default())
}

/// Parse a reply delimited by `marker`.
///
/// Never fails: malformed entries are dropped and the survivors are returned
/// in reply order (unsorted), at most `marker.max_results()` of them.
pub fn parse_reply_with(raw: &str, marker: ReplyMarker) -> Vec<ScoredCandidate> {
    let payload = extract_payload(raw, marker);
    let parsed: Vec<ScoredCandidate> = payload
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .filter_map(parse_pair)
        .collect();
    if parsed.len() > marker.max_results() {
        tracing::debug!(
            entries = parsed.len(),
            kept = marker.max_results(),
            "judge returned more entries than asked for"
        );
    }
    parsed.into_iter().take(marker.max_results()).collect()
}

fn extract_payload(raw: &str, marker: ReplyMarker) -> Cow<'_, str> {
    let patterns = marker.patterns();
    if let Some(inner) = patterns.span.captures(raw).and_then(|caps| caps.get(1)) {
        return Cow::Borrowed(inner.as_str());
    }
    patterns.tag.replace_all(raw, "")
}

fn parse_pair(piece: &str) -> Option<ScoredCandidate> {
    // Split on the last colon so a stray colon stays in the name
    let idx = piece.rfind(':')?;
    let name = piece[..idx].trim();
    let score_str = piece[idx + 1..].trim();
    if name.is_empty() || score_str.is_empty() {
        return None;
    }

    let score: f64 = score_str.parse().ok()?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        tracing::debug!(entry = piece, "dropping entry with invalid score");
        return None;
    }

    Some(ScoredCandidate::new(name, score))
}
