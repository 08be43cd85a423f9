//! Infrastructure layer - file-system implementations of the domain collaborators

pub mod persistence;

pub use persistence::{DirectoryCatalogSource, FileBackgroundStage, LabelFileCatalogSource, StageState};
