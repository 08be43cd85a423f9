//! Lexical gate deciding whether a scene is worth an LLM evaluation
//!
//! Two ordered pattern lists are kept: movement verbs and location nouns.
//! Index 0 holds the most precise patterns; higher tiers trade precision for
//! recall and are only enabled when the user raises the tier level.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use dynbg_types::CandidateOption;

/// Highest configurable tier level (three tiers per list)
pub const MAX_TIER_LEVEL: u8 = 2;

// ============================================================================
// Movement verbs
// ============================================================================

const MOVEMENT_COMMON: &str = r"(?i)\b(follow(?:s)?|enter(?:s)?|step(?:s)?|walk(?:s)?|arrive(?:s)?|reach(?:es)?|head(?:s)?|go(?:es)?|move(?:s)?|travel(?:s)?|return(?:s)?|approach(?:es)?|leave(?:s)?|exit(?:s)?|advance(?:s)?|proceed(?:s)?)\b";

const MOVEMENT_UNCOMMON: &str = r"(?i)\b(appear(?:s)?|disappear(?:s)?|cross(?:es)?|depart(?:s)?|stride(?:s)?|march(?:es)?|rush(?:es)?|dash(?:es)?|jog(?:s)?|sprint(?:s)?|wander(?:s)?|roam(?:s)?|climb(?:s)?|jump(?:s)?|leap(?:s)?|fly|flies|flew|teleport(?:s)?|warp(?:s)?|float(?:s)?|hover(?:s)?|stroll(?:s)?|saunter(?:s)?)\b";

const MOVEMENT_RARE: &str = r"(?i)\b(drift(?:s)?|slip(?:s)?|sneak(?:s)?|creep(?:s)?|tiptoe(?:s)?|stumble(?:s)?|descend(?:s)?|ascend(?:s)?|crawl(?:s)?|prowl(?:s)?|limp(?:s)?|shuffle(?:s)?|trudge(?:s)?|stagger(?:s)?|vanish(?:es)?|materialize(?:s)?)\b";

// ============================================================================
// Location nouns
// ============================================================================

const LOCATION_COMMON: &str = r"(?i)\b(room|hallway|corridor|bedroom|kitchen|bathroom|doorway|house|apartment|street|city|town|village|forest|woods|cave|beach|park|garden|shop|restaurant|cafe|bar|pub|library|station|platform)\b";

const LOCATION_UNCOMMON: &str = r"(?i)\b(mountain|mountains|river|lake|ocean|desert|island|castle|palace|temple|shrine|church|ruins|tower|mansion|lab|laboratory|warehouse|studio|gym|arena|theater|club|rooftop|alley|spaceship|ship|cabin|deck|bridge|base|outpost|camp|inn|tavern)\b";

const LOCATION_RARE: &str = r"(?i)\b(fortress|dungeon|nether|abyss|void|underworld|dreamscape|pocket\s+dimension|astral\s+plane|shadow\s+realm|floating\s+island|sky\s+city|citadel|sanctum|crypt|enchanted\s+grove|forbidden\s+zone)\b";

static MOVEMENT_TIERS: LazyLock<PatternTiers> = LazyLock::new(|| {
    PatternTiers::compile(&[MOVEMENT_COMMON, MOVEMENT_UNCOMMON, MOVEMENT_RARE])
});

static LOCATION_TIERS: LazyLock<PatternTiers> = LazyLock::new(|| {
    PatternTiers::compile(&[LOCATION_COMMON, LOCATION_UNCOMMON, LOCATION_RARE])
});

/// Ordered list of pattern tiers, most restrictive first
#[derive(Debug, Clone)]
pub struct PatternTiers {
    tiers: Vec<Regex>,
}

impl PatternTiers {
    fn compile(patterns: &[&str]) -> Self {
        let tiers = patterns
            .iter()
            .map(|p| Regex::new(p).expect("tier pattern must compile"))
            .collect();
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Test the inclusive prefix `[0, level]`; levels past the end use every tier.
    pub fn matches_up_to(&self, text: &str, level: u8) -> bool {
        self.tiers
            .iter()
            .take(level as usize + 1)
            .any(|re| re.is_match(text))
    }
}

/// Result of gating one scene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerVerdict {
    pub movement: bool,
    pub location: bool,
    /// First catalog option whose name appears verbatim in the scene
    pub default_option: Option<CandidateOption>,
}

impl TriggerVerdict {
    pub fn should_evaluate(&self) -> bool {
        self.movement || self.location || self.default_option.is_some()
    }
}

/// Lexical trigger detector over the built-in movement and location tiers
#[derive(Debug, Clone)]
pub struct TriggerDetector {
    movement: &'static PatternTiers,
    location: &'static PatternTiers,
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerDetector {
    pub fn new() -> Self {
        Self {
            movement: &MOVEMENT_TIERS,
            location: &LOCATION_TIERS,
        }
    }

    pub fn movement_tiers(&self) -> &PatternTiers {
        self.movement
    }

    pub fn location_tiers(&self) -> &PatternTiers {
        self.location
    }

    /// Pattern-only gate for `text` at `level`
    pub fn matches_patterns(&self, text: &str, level: u8) -> bool {
        let folded = text.to_lowercase();
        self.movement.matches_up_to(&folded, level) || self.location.matches_up_to(&folded, level)
    }

    /// Case-insensitive substring lookup of catalog names in the scene
    pub fn find_default_option(
        &self,
        text: &str,
        catalog: &[CandidateOption],
    ) -> Option<CandidateOption> {
        let folded = text.to_lowercase();
        catalog
            .iter()
            .find(|option| {
                let title = option.display_name.to_lowercase();
                !title.is_empty() && folded.contains(&title)
            })
            .cloned()
    }

    /// Full gate: substring lookup first, then both pattern lists
    pub fn evaluate(&self, text: &str, level: u8, catalog: &[CandidateOption]) -> TriggerVerdict {
        let default_option = self.find_default_option(text, catalog);
        if let Some(option) = &default_option {
            tracing::debug!(name = %option.display_name, "scene names a background directly");
        }
        let folded = text.to_lowercase();
        TriggerVerdict {
            movement: self.movement.matches_up_to(&folded, level),
            location: self.location.matches_up_to(&folded, level),
            default_option,
        }
    }

    pub fn should_evaluate(&self, text: &str, level: u8, catalog: &[CandidateOption]) -> bool {
        self.evaluate(text, level, catalog).should_evaluate()
    }
}
