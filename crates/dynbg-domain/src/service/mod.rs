//! Domain services

pub mod catalog_builder;
pub mod decision_engine;
pub mod trigger_detector;

pub use catalog_builder::{build_catalog, parse_label, CatalogError};
pub use decision_engine::{decide, DecisionEngine, UNKNOWN_SENTINEL};
pub use trigger_detector::{PatternTiers, TriggerDetector, TriggerVerdict, MAX_TIER_LEVEL};
