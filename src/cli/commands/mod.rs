//! Command implementations

pub mod cdm;
pub mod completions;
pub mod config;
pub mod hbm;
pub mod table;
