use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelaunchError {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("must be run as '{expected}' (currently '{actual}')")]
    WrongUser { expected: String, actual: String },

    #[error("pre-flight check failed: {command} (exit {code})")]
    CheckFailed { command: String, code: i32 },

    #[error("command failed: {command} (exit {code})")]
    CommandFailed { command: String, code: i32 },

    #[error("supervisor control binary not found: {0}")]
    SupervisorNotFound(String),

    #[error("supervisor call failed: {command} (exit {code})\n{output}")]
    SupervisorFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("unparseable supervisor status line: {0}")]
    StatusParse(String),

    #[error("control channel not found: {0}")]
    ControlChannelMissing(PathBuf),

    #[error("deployment pointer error: {0}")]
    Pointer(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RelaunchError>;
