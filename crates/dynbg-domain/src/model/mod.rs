//! Domain model types

pub mod scene;
pub mod tag_filter;

pub use scene::SceneText;
pub use tag_filter::TagFilter;
