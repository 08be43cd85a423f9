//! Configuration management for dynbg
//!
//! Config stored at: ~/.config/dynbg/config.json
//!
//! Every key is optional. Legacy key spellings are accepted on load and the
//! canonical spelling is written back on save.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use dynbg_domain::model::TagFilter;
use dynbg_domain::service::MAX_TIER_LEVEL;
use dynbg_judge::ReplyMarker;
use dynbg_types::{ConfigError, OutputFormat, Result};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Master switch; a disabled config skips every cycle
    pub enabled: bool,

    pub fade_enabled: bool,

    pub fade_duration_ms: u64,

    /// Minimum `score / 100` for a commit, in [0, 1]
    pub match_threshold: f64,

    /// Highest trigger tier consulted, 0..=2
    pub regex_word_level: u8,

    /// Configured tag filter (empty = every background is eligible)
    pub tags: Vec<String>,

    pub reply_marker: ReplyMarker,

    /// Offer the judge an explicit "unknown" answer
    pub unknown_sentinel: bool,

    /// LLM command line, split shell-style
    pub command: String,

    /// Flag passing the system prompt as an argument (e.g. `--system-prompt`)
    pub system_prompt_flag: Option<String>,

    pub timeout_secs: Option<u64>,

    /// Directory of background images
    pub catalog_dir: Option<PathBuf>,

    /// Text file with one background label per line
    pub catalog_file: Option<PathBuf>,

    /// Where the active background state is kept
    pub state_dir: Option<PathBuf>,

    pub output_format: OutputFormat,
}

fn default_fade_duration_ms() -> u64 {
    1000
}

fn default_command() -> String {
    "claude -p".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            fade_enabled: true,
            fade_duration_ms: default_fade_duration_ms(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            regex_word_level: 0,
            tags: Vec::new(),
            reply_marker: ReplyMarker::default(),
            unknown_sentinel: false,
            command: default_command(),
            system_prompt_flag: None,
            timeout_secs: None,
            catalog_dir: None,
            catalog_file: None,
            state_dir: None,
            output_format: OutputFormat::default(),
        }
    }
}

fn valid_threshold(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Keys of a config object, consumed field by field.
///
/// A key whose value has the wrong type is reported and skipped.
struct Fields {
    map: Map<String, Value>,
    warnings: Vec<String>,
}

impl Fields {
    /// First usable value among `keys`, canonical spelling first
    fn take<T: DeserializeOwned>(&mut self, keys: &[&str]) -> Option<T> {
        for key in keys {
            let Some(value) = self.map.remove(*key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            match serde_json::from_value(value) {
                Ok(parsed) => return Some(parsed),
                Err(e) => self.warnings.push(format!("ignoring {}: {}", key, e)),
            }
        }
        None
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("dynbg");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the stage state directory path
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }

        let state_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("dynbg");
        Ok(state_dir)
    }

    /// Load config from the default path, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let (config, warnings) = Self::from_json(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        for warning in warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }
        Ok(config)
    }

    /// Read a config object, returning one message per value that was replaced.
    ///
    /// Only text that is not a JSON object is an error.
    pub fn from_json(content: &str) -> std::result::Result<(Self, Vec<String>), serde_json::Error> {
        let map: Map<String, Value> = serde_json::from_str(content)?;
        let mut fields = Fields {
            map,
            warnings: Vec::new(),
        };
        let defaults = Config::default();

        let regex_word_level = match fields.take::<i64>(&["regex_word_level", "regex-word-level"]) {
            Some(level) if (0..=i64::from(MAX_TIER_LEVEL)).contains(&level) => level as u8,
            Some(level) => {
                fields.warnings.push(format!(
                    "regex_word_level {} is outside 0..={}, using 0",
                    level, MAX_TIER_LEVEL
                ));
                0
            }
            None => defaults.regex_word_level,
        };

        let mut config = Config {
            enabled: fields
                .take(&["enabled", "is-enabled", "is_enabled"])
                .unwrap_or(defaults.enabled),
            fade_enabled: fields
                .take(&["fade_enabled", "is-fading-enabled"])
                .unwrap_or(defaults.fade_enabled),
            fade_duration_ms: fields
                .take(&["fade_duration_ms"])
                .unwrap_or(defaults.fade_duration_ms),
            match_threshold: fields
                .take(&["match_threshold", "match-threshold"])
                .unwrap_or(defaults.match_threshold),
            regex_word_level,
            tags: fields.take(&["tags"]).unwrap_or(defaults.tags),
            reply_marker: fields
                .take(&["reply_marker"])
                .unwrap_or(defaults.reply_marker),
            unknown_sentinel: fields
                .take(&["unknown_sentinel"])
                .unwrap_or(defaults.unknown_sentinel),
            command: fields.take(&["command"]).unwrap_or(defaults.command),
            system_prompt_flag: fields.take(&["system_prompt_flag"]),
            timeout_secs: fields.take(&["timeout_secs"]),
            catalog_dir: fields.take(&["catalog_dir"]),
            catalog_file: fields.take(&["catalog_file"]),
            state_dir: fields.take(&["state_dir"]),
            output_format: fields
                .take(&["output_format"])
                .unwrap_or(defaults.output_format),
        };

        let mut warnings = fields.warnings;
        warnings.extend(config.sanitize());
        Ok((config, warnings))
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveError(format!("{}: {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Replace out-of-range values with defaults, returning one message per fix
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !valid_threshold(self.match_threshold) {
            warnings.push(format!(
                "match_threshold {} is outside [0, 1], using {}",
                self.match_threshold, DEFAULT_MATCH_THRESHOLD
            ));
            self.match_threshold = DEFAULT_MATCH_THRESHOLD;
        }

        if self.regex_word_level > MAX_TIER_LEVEL {
            warnings.push(format!(
                "regex_word_level {} is above {}, using 0",
                self.regex_word_level, MAX_TIER_LEVEL
            ));
            self.regex_word_level = 0;
        }

        let tags = TagFilter::new(&self.tags, std::iter::empty::<&str>());
        if tags.tags() != self.tags.as_slice() {
            self.tags = tags.tags().to_vec();
        }

        warnings
    }

    pub fn set_match_threshold(&mut self, value: f64) -> Result<()> {
        if !valid_threshold(value) {
            return Err(ConfigError::InvalidValue {
                key: "match_threshold",
                value: value.to_string(),
                expected: "a number between 0 and 1",
            }
            .into());
        }
        self.match_threshold = value;
        Ok(())
    }

    pub fn reset_match_threshold(&mut self) {
        self.match_threshold = DEFAULT_MATCH_THRESHOLD;
    }

    pub fn set_regex_word_level(&mut self, value: u8) -> Result<()> {
        if value > MAX_TIER_LEVEL {
            return Err(ConfigError::InvalidValue {
                key: "regex_word_level",
                value: value.to_string(),
                expected: "0, 1 or 2",
            }
            .into());
        }
        self.regex_word_level = value;
        Ok(())
    }

    /// Set the tag filter from a comma-separated list
    pub fn set_tags(&mut self, list: &str) {
        let parsed = TagFilter::parse_list(list);
        self.tags = TagFilter::new(&parsed, std::iter::empty::<&str>())
            .tags()
            .to_vec();
    }

    pub fn set_timeout_secs(&mut self, value: u64) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_secs",
                value: value.to_string(),
                expected: "a positive number of seconds",
            }
            .into());
        }
        self.timeout_secs = Some(value);
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Fade used for commits, `None` when fading is off
    pub fn fade_duration(&self) -> Option<Duration> {
        self.fade_enabled
            .then(|| Duration::from_millis(self.fade_duration_ms))
    }
}

fn or_none(value: Option<&Path>) -> String {
    value
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dynamic Background Configuration")?;
        writeln!(f, "================================")?;
        writeln!(f)?;
        writeln!(f, "Enabled:            {}", self.enabled)?;
        writeln!(f, "Fade:               {}", self.fade_enabled)?;
        writeln!(f, "Fade duration:      {} ms", self.fade_duration_ms)?;
        writeln!(f, "Match threshold:    {}", self.match_threshold)?;
        writeln!(f, "Regex word level:   {}", self.regex_word_level)?;
        writeln!(
            f,
            "Tags:               {}",
            if self.tags.is_empty() {
                "(all backgrounds)".to_string()
            } else {
                self.tags.join(", ")
            }
        )?;
        writeln!(f, "Reply marker:       {}", self.reply_marker)?;
        writeln!(f, "Unknown sentinel:   {}", self.unknown_sentinel)?;
        writeln!(f, "LLM command:        {}", self.command)?;
        writeln!(
            f,
            "System prompt flag: {}",
            self.system_prompt_flag.as_deref().unwrap_or("(stdin)")
        )?;
        writeln!(
            f,
            "Timeout:            {}",
            self.timeout_secs
                .map(|s| format!("{} s", s))
                .unwrap_or_else(|| "(none)".to_string())
        )?;
        writeln!(f, "Catalog dir:        {}", or_none(self.catalog_dir.as_deref()))?;
        writeln!(f, "Catalog file:       {}", or_none(self.catalog_file.as_deref()))?;
        writeln!(
            f,
            "State dir:          {}",
            self.state_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Output format:      {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:        {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.enabled);
        assert_eq!(config.match_threshold, 0.6);
        assert_eq!(config.regex_word_level, 0);
        assert_eq!(config.reply_marker, ReplyMarker::Top5);
    }

    #[test]
    fn test_legacy_keys_are_accepted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"is-enabled": false, "is-fading-enabled": false, "match-threshold": 0.8, "regex-word-level": 2}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.enabled);
        assert!(!config.fade_enabled);
        assert_eq!(config.match_threshold, 0.8);
        assert_eq!(config.regex_word_level, 2);
        assert_eq!(config.fade_duration(), None);
    }

    #[test]
    fn test_out_of_range_values_fall_back_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"match_threshold": 1.5, "regex_word_level": 7, "tags": [" Indoor ", "indoor", ""]}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(config.regex_word_level, 0);
        assert_eq!(config.tags, vec!["indoor".to_string()]);
    }

    #[test]
    fn test_both_enabled_spellings_in_one_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"is_enabled": true, "is-fading-enabled": true, "match_threshold": 0.6, "regex-word-level": 1, "is-enabled": false}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.regex_word_level, 1);
    }

    #[test]
    fn test_level_outside_u8_falls_back_on_load() {
        for level in ["-1", "300"] {
            let (config, warnings) =
                Config::from_json(&format!(r#"{{"regex_word_level": {}, "tags": ["night"]}}"#, level))
                    .unwrap();
            assert_eq!(config.regex_word_level, 0);
            assert_eq!(config.tags, vec!["night".to_string()]);
            assert_eq!(warnings.len(), 1, "{:?}", warnings);
        }
    }

    #[test]
    fn test_wrong_value_type_keeps_other_keys() {
        let (config, warnings) = Config::from_json(
            r#"{"enabled": "yes", "match-threshold": 0.9, "reply_marker": "json", "timeout_secs": null}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.match_threshold, 0.9);
        assert_eq!(config.reply_marker, ReplyMarker::Top5);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.set_match_threshold(0.75).unwrap();
        config.set_tags("indoor, Night ,,");
        config.reply_marker = ReplyMarker::Single;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.match_threshold, 0.75);
        assert_eq!(loaded.tags, vec!["indoor".to_string(), "night".to_string()]);
        assert_eq!(loaded.reply_marker, ReplyMarker::Single);
    }

    #[test]
    fn test_setters_reject_invalid_values() {
        let mut config = Config::default();
        assert!(config.set_match_threshold(-0.1).is_err());
        assert!(config.set_match_threshold(f64::NAN).is_err());
        assert!(config.set_regex_word_level(3).is_err());
        assert!(config.set_timeout_secs(0).is_err());
        assert_eq!(config, Config::default());

        config.set_match_threshold(0.0).unwrap();
        config.reset_match_threshold();
        assert_eq!(config.match_threshold, DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn test_fade_and_timeout_durations() {
        let mut config = Config::default();
        assert_eq!(config.fade_duration(), Some(Duration::from_millis(1000)));
        assert_eq!(config.timeout(), None);
        config.set_timeout_secs(30).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }
}
