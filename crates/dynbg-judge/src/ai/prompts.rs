//! Prompts for the location-matching judge
//!
//! The task prompt is a few-shot block: two worked scenes with their expected
//! result line, then the live scene and candidate list. The worked examples
//! fix the output grammar the reply parser relies on:
//! one line, `<MARKER>name:score,...</MARKER>`, scores 0-100.

use std::sync::LazyLock;

use super::reply_parser::ReplyMarker;

const SCENE_PLACEHOLDER: &str = "{sceneText}";
const LIST_PLACEHOLDER: &str = "{locationList}";

// ============================================================================
// Worked examples
// ============================================================================

struct WorkedExample {
    scene: &'static str,
    locations: &'static [&'static str],
    ranking: &'static [(&'static str, u8)],
}

const WORKED_EXAMPLES: &[WorkedExample] = &[
    WorkedExample {
        scene: "They ran into a wine cellar and was surprised to see the korean art style and goth decor.",
        locations: &[
            "wine cellar",
            "korean tea room",
            "goth chamber",
            "central park",
            "pink bedroom",
            "haunted house",
            "gold course",
        ],
        ranking: &[
            ("wine cellar", 100),
            ("korean tea room", 30),
            ("goth chamber", 20),
            ("central park", 0),
            ("pink bedroom", 0),
        ],
    },
    WorkedExample {
        scene: "Drift into void",
        locations: &[
            "wine cellar",
            "korean tea room",
            "goth chamber",
            "central park",
            "haunted house",
            "gold course",
        ],
        ranking: &[
            ("haunted house", 10),
            ("wine cellar", 0),
            ("korean tea room", 0),
            ("goth chamber", 0),
            ("central park", 0),
        ],
    },
];

fn result_line(marker: ReplyMarker, ranking: &[(&str, u8)]) -> String {
    let body = ranking
        .iter()
        .take(marker.max_results())
        .map(|(name, score)| format!("{}:{}", name, score))
        .collect::<Vec<_>>()
        .join(",");
    format!("{}{}{}", marker.open(), body, marker.close())
}

// ============================================================================
// System prompt
// ============================================================================

fn build_system_prompt(marker: ReplyMarker) -> String {
    let open = marker.open();
    let close = marker.close();
    let (goal, shape) = match marker {
        ReplyMarker::Top5 => (
            "Return the top 5 locations.",
            "name:score,name:score,name:score,name:score,name:score",
        ),
        ReplyMarker::Single => ("Return the single best location.", "name:score"),
    };

    format!(
        concat!(
            "You are a precise location-matching evaluator. Your job is to rate how well each ",
            "location in the <LOCATION_LIST> matches the physical setting where the characters ",
            "are located, as described in the <SCENE_CONTEXT>.\n",
            "{goal}\n\n",
            "Rules:\n",
            "- Start your entire response immediately with {open} - the very first characters must be {open}\n",
            "- End your entire response with {close} - the very last characters must be {close}\n",
            "- Nothing before {open}, nothing after {close}\n",
            "- No code blocks, no backticks, no markdown, no explanations, no newlines outside the tags, no other text whatsoever\n",
            "- Use exact location names from <LOCATION_LIST>, no changes\n",
            "- Scores 0-100 (100 = perfect match for character location)\n",
            "- Rate only the locations in the current <LOCATION_LIST>\n\n",
            "Output format must be exactly one continuous line like this:\n",
            "{open}{shape}{close}\n\n",
            "Your complete response must consist only of that single line.\n"
        ),
        goal = goal,
        open = open,
        close = close,
        shape = shape,
    )
}

/// System prompt for the default `<TOP_5_RESULTS>` profile
pub static SYSTEM_PROMPT: LazyLock<String> =
    LazyLock::new(|| build_system_prompt(ReplyMarker::Top5));

static SINGLE_SYSTEM_PROMPT: LazyLock<String> =
    LazyLock::new(|| build_system_prompt(ReplyMarker::Single));

// ============================================================================
// Task template
// ============================================================================

fn build_task_template(marker: ReplyMarker) -> String {
    let total = WORKED_EXAMPLES.len() + 1;
    let mut template = String::new();

    for (i, example) in WORKED_EXAMPLES.iter().enumerate() {
        template.push_str(&format!(
            "--- TASK {}/{} ---\n<SCENE_CONTEXT>\n{}\n</SCENE_CONTEXT>\n<LOCATION_LIST>\n{}\n</LOCATION_LIST>\nOutput: {}\n\n",
            i + 1,
            total,
            example.scene,
            example.locations.join("\n"),
            result_line(marker, example.ranking),
        ));
    }

    template.push_str(&format!(
        "--- TASK {total}/{total} ---\n<SCENE_CONTEXT>\n{SCENE_PLACEHOLDER}\n</SCENE_CONTEXT>\n<LOCATION_LIST>\n{LIST_PLACEHOLDER}\n</LOCATION_LIST>\n\nOutput: \n"
    ));
    template
}

static TOP5_TASK_TEMPLATE: LazyLock<String> =
    LazyLock::new(|| build_task_template(ReplyMarker::Top5));

static SINGLE_TASK_TEMPLATE: LazyLock<String> =
    LazyLock::new(|| build_task_template(ReplyMarker::Single));

/// Substitute both placeholders in one pass so inserted text is never rescanned.
fn fill_template(template: &str, scene_text: &str, location_list: &str) -> String {
    let mut out = String::with_capacity(template.len() + scene_text.len() + location_list.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(SCENE_PLACEHOLDER) {
            out.push_str(scene_text);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(LIST_PLACEHOLDER) {
            out.push_str(location_list);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Prompt builders
// ============================================================================

/// Builds judge prompts for one reply-marker profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptComposer {
    marker: ReplyMarker,
    sentinel: Option<String>,
}

impl PromptComposer {
    pub fn new(marker: ReplyMarker) -> Self {
        Self {
            marker,
            sentinel: None,
        }
    }

    /// Append `sentinel` to every location list as the "no setting" answer
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = Some(sentinel.into());
        self
    }

    pub fn marker(&self) -> ReplyMarker {
        self.marker
    }

    pub fn system_prompt(&self) -> &'static str {
        match self.marker {
            ReplyMarker::Top5 => SYSTEM_PROMPT.as_str(),
            ReplyMarker::Single => SINGLE_SYSTEM_PROMPT.as_str(),
        }
    }

    fn task_template(&self) -> &'static str {
        match self.marker {
            ReplyMarker::Top5 => TOP5_TASK_TEMPLATE.as_str(),
            ReplyMarker::Single => SINGLE_TASK_TEMPLATE.as_str(),
        }
    }

    /// Render the task prompt for `scene_text` over `catalog_names`
    pub fn compose<S: AsRef<str>>(&self, catalog_names: &[S], scene_text: &str) -> String {
        let mut names: Vec<&str> = catalog_names.iter().map(AsRef::as_ref).collect();
        if let Some(sentinel) = &self.sentinel {
            names.push(sentinel);
        }

        let mut prompt = String::new();
        if let Some(sentinel) = &self.sentinel {
            prompt.push_str(&format!(
                "If the scene does not describe a physical setting that any listed location fits, rank `{}` first.\n\n",
                sentinel
            ));
        }
        prompt.push_str(&fill_template(
            self.task_template(),
            scene_text,
            &names.join("\n"),
        ));
        prompt
    }
}

/// Build the default-profile task prompt
pub fn compose_prompt<S: AsRef<str>>(catalog_names: &[S], scene_text: &str) -> String {
    PromptComposer::default().compose(catalog_names, scene_text)
}
