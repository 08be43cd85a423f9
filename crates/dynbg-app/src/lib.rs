//! Application service layer - config, evaluation cycle, wiring

pub mod app;
pub mod config;
pub mod repository;
