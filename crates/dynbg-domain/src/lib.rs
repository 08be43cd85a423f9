//! Domain layer: scene gating, catalog building and the decision policy

pub mod model;
pub mod repository;
pub mod service;
