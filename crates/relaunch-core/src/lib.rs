pub mod checks;
pub mod config;
pub mod control;
pub mod deployment;
pub mod error;
pub mod observed;
pub mod orchestrator;
pub mod supervisor;
pub mod topology;
pub mod unit;

pub use error::{RelaunchError, Result};
