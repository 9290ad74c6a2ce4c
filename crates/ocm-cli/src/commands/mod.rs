//! CLI command implementations

pub mod attributes;
pub mod config;
