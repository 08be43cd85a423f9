//! Persistence implementations
//!
//! File-based implementations of the `CatalogSource` and `BackgroundStage`
//! collaborator traits.

mod directory_catalog;
mod file_stage;
mod label_file_catalog;

pub use directory_catalog::DirectoryCatalogSource;
pub use file_stage::{FileBackgroundStage, StageState};
pub use label_file_catalog::LabelFileCatalogSource;
