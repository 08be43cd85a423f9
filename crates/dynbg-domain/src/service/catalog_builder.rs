//! Candidate catalog building
//!
//! Raw labels may embed bracketed tags, e.g. `wine cellar [indoor] [night]`.
//! Tags are collected lower-cased and removed from the display name.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use dynbg_types::{CandidateOption, RawLabel};

use crate::model::TagFilter;

static TAG_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+?)\]").expect("tag pattern must compile"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("No backgrounds to choose from. Please add some images to the backgrounds folder.")]
    Empty { before_filter: usize },

    #[error("No backgrounds to choose from: none of the {before_filter} backgrounds carries a tag in [{tags}]. Remove tags in settings or tag more backgrounds.")]
    FilteredOut { before_filter: usize, tags: String },
}

/// Parse a single raw label into an option.
///
/// Returns `None` when neither a name nor a tag remains.
pub fn parse_label(raw: &RawLabel) -> Option<CandidateOption> {
    let mut tags: Vec<String> = Vec::new();
    for caps in TAG_GROUP.captures_iter(&raw.label) {
        let tag = caps[1].trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let display_name = TAG_GROUP.replace_all(&raw.label, " ").trim().to_string();

    if display_name.is_empty() && tags.is_empty() {
        return None;
    }

    Some(CandidateOption {
        handle: raw.handle.clone(),
        display_name,
        tags,
    })
}

/// Parse every label and keep the options admitted by `filter`.
pub fn build_catalog(
    raw_labels: &[RawLabel],
    filter: &TagFilter,
) -> Result<Vec<CandidateOption>, CatalogError> {
    let parsed: Vec<CandidateOption> = raw_labels.iter().filter_map(parse_label).collect();
    let before_filter = parsed.len();

    if before_filter == 0 {
        return Err(CatalogError::Empty { before_filter });
    }

    let eligible: Vec<CandidateOption> = parsed
        .into_iter()
        .filter(|option| filter.admits(option))
        .collect();

    if eligible.is_empty() {
        return Err(CatalogError::FilteredOut {
            before_filter,
            tags: filter.tags().join(", "),
        });
    }

    tracing::debug!(
        total = before_filter,
        eligible = eligible.len(),
        "catalog built"
    );
    Ok(eligible)
}
