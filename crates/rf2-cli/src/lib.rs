//! CLI library components for the RF2 release builder.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
