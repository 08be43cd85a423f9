//! Collaborator wiring from configuration

use std::sync::Arc;

use dynbg_domain::repository::CatalogSource;
use dynbg_infra::{DirectoryCatalogSource, FileBackgroundStage, LabelFileCatalogSource};
use dynbg_judge::{CommandTransport, LlmTransport};
use dynbg_types::{Error, Result};

use crate::app::{EvaluationSettings, SceneEvaluator};
use crate::config::Config;

/// Open the configured catalog source (directory first, then label file)
pub fn open_catalog_source(config: &Config) -> Result<Arc<dyn CatalogSource>> {
    if let Some(dir) = &config.catalog_dir {
        return Ok(Arc::new(DirectoryCatalogSource::new(dir)));
    }
    if let Some(file) = &config.catalog_file {
        return Ok(Arc::new(LabelFileCatalogSource::new(file)));
    }
    Err(Error::Catalog(
        "no background source configured, set catalog_dir or catalog_file".to_string(),
    ))
}

/// Open the file-based background stage under the state directory
pub fn open_stage(config: &Config) -> Result<FileBackgroundStage> {
    FileBackgroundStage::open(config.state_dir()?)
}

/// Build the command-line LLM transport
pub fn open_transport(config: &Config) -> Result<CommandTransport> {
    let transport = CommandTransport::from_command_line(&config.command)?
        .with_system_prompt_flag(config.system_prompt_flag.clone())
        .with_timeout(config.timeout());
    Ok(transport)
}

/// Wire an evaluator with the configured collaborators
pub fn open_evaluator(config: &Config) -> Result<SceneEvaluator> {
    let transport = open_transport(config)?;
    open_evaluator_with(config, Arc::new(transport))
}

/// Wire an evaluator around a caller-supplied transport
pub fn open_evaluator_with(
    config: &Config,
    transport: Arc<dyn LlmTransport>,
) -> Result<SceneEvaluator> {
    let catalog = open_catalog_source(config)?;
    let stage = Arc::new(open_stage(config)?);
    Ok(SceneEvaluator::new(
        catalog,
        stage,
        transport,
        EvaluationSettings::from(config),
    ))
}
