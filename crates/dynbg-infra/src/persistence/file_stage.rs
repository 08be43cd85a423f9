//! Background stage persisted as a JSON state file

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dynbg_domain::repository::{BackgroundStage, Transition};
use dynbg_types::{CandidateOption, Result};

const STATE_FILE: &str = "active_background.json";

/// Contents of the state file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// Handle of the active background
    pub active: String,
    pub display_name: String,
    pub applied_at: DateTime<Utc>,
    /// Fade duration used for the switch, if any
    #[serde(default)]
    pub fade_ms: Option<u64>,
}

/// File-based implementation of BackgroundStage
///
/// The active background is stored in `<state_dir>/active_background.json`.
/// Warnings go to stderr and the log.
pub struct FileBackgroundStage {
    state_path: PathBuf,
}

impl FileBackgroundStage {
    /// Create the state directory if needed
    pub fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        fs::create_dir_all(state_dir)?;
        Ok(Self {
            state_path: state_dir.join(STATE_FILE),
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Load the saved state, `None` when nothing was applied yet
    pub fn state(&self) -> Result<Option<StageState>> {
        if !self.state_path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.state_path)?);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    fn persist(&self, state: &StageState) -> Result<()> {
        // Write then rename so readers never see a half-written file
        let tmp_path = self.state_path.with_extension("json.tmp");
        {
            let writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(writer, state)?;
        }
        fs::rename(&tmp_path, &self.state_path)?;
        Ok(())
    }
}

impl StageState {
    /// File-like id of the active background: display name plus the handle's
    /// extension (`image` for handles without one), e.g. `wine cellar.jpg`
    pub fn active_id(&self) -> String {
        let extension = Path::new(&self.active)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("image");
        format!("{}.{}", self.display_name, extension)
    }
}

impl BackgroundStage for FileBackgroundStage {
    fn current_background(&self) -> String {
        match self.state() {
            Ok(state) => state.map(|s| s.active_id()).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %self.state_path.display(), error = %e, "unreadable stage state, treating as empty");
                String::new()
            }
        }
    }

    fn apply_background(&self, option: &CandidateOption, transition: Transition) -> Result<()> {
        let state = StageState {
            active: option.handle.clone(),
            display_name: option.display_name.clone(),
            applied_at: Utc::now(),
            fade_ms: transition.fade.map(|d| d.as_millis() as u64),
        };
        self.persist(&state)?;
        tracing::info!(
            background = %option.handle,
            fade_ms = ?state.fade_ms,
            "background applied"
        );
        Ok(())
    }

    fn report_warning(&self, message: &str) {
        tracing::warn!("{}", message);
        eprintln!("Warning: {}", message);
    }
}
