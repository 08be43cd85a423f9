//! Tag policy applied to the candidate catalog

use dynbg_types::CandidateOption;

/// Prefix marking a character tag as a background tag
pub const CHARACTER_TAG_PREFIX: &str = "bg:";

/// Ordered set of lower-case tags.
///
/// Empty means pass-through; otherwise an option is eligible iff it carries
/// at least one of the tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    pub fn pass_through() -> Self {
        Self::default()
    }

    /// Union of configured tags and the character's `bg:` tags
    pub fn new<C, T>(configured: C, character_tags: T) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let mut filter = Self::default();
        for tag in configured {
            filter.insert(tag.as_ref());
        }
        for tag in character_tags {
            let lower = tag.as_ref().trim().to_lowercase();
            if let Some(stripped) = lower.strip_prefix(CHARACTER_TAG_PREFIX) {
                filter.insert(stripped);
            }
        }
        filter
    }

    /// Parse a comma-separated tag list as typed in settings
    pub fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn insert(&mut self, tag: &str) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn is_pass_through(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn admits(&self, option: &CandidateOption) -> bool {
        self.is_pass_through() || self.tags.iter().any(|tag| option.has_tag(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(tags: &[&str]) -> CandidateOption {
        CandidateOption {
            handle: "x.jpg".to_string(),
            display_name: "x".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_filter_admits_everything() {
        let filter = TagFilter::pass_through();
        assert!(filter.admits(&option(&[])));
        assert!(filter.admits(&option(&["fantasy"])));
    }

    #[test]
    fn test_union_match() {
        let filter = TagFilter::new(["Fantasy", "  "], Vec::<String>::new());
        assert_eq!(filter.tags(), ["fantasy"]);
        assert!(filter.admits(&option(&["modern", "fantasy"])));
        assert!(!filter.admits(&option(&["modern"])));
        assert!(!filter.admits(&option(&[])));
    }

    #[test]
    fn test_character_tags_need_prefix() {
        let filter = TagFilter::new(["scifi"], ["BG:Space", "villain", "bg:scifi"]);
        assert_eq!(filter.tags(), ["scifi", "space"]);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            TagFilter::parse_list(" fantasy, ,modern ,"),
            vec!["fantasy".to_string(), "modern".to_string()]
        );
    }
}
