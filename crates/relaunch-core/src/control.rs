//! Host-level signals that bypass the supervisor: the web tier's reload
//! control channel and the SSO companion bounce.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelaunchError, Result};

/// Command byte asking the web-tier master to chain-reload its workers.
pub const CHAIN_RELOAD: u8 = b'c';

// ---------------------------------------------------------------------------
// ControlChannel
// ---------------------------------------------------------------------------

/// Master FIFO of the running web tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlChannel {
    path: PathBuf,
}

impl ControlChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the single reload byte. The file is never created here: a
    /// missing channel means nothing is listening.
    pub fn send(&self, command: u8) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RelaunchError::ControlChannelMissing(self.path.clone())
                }
                _ => RelaunchError::Io(e),
            })?;
        file.write_all(&[command])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Companion
// ---------------------------------------------------------------------------

/// A process killed after the web tier comes back; its own service manager
/// respawns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
    pub process: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

// ---------------------------------------------------------------------------
// HostSignals
// ---------------------------------------------------------------------------

pub trait HostSignals {
    fn chain_reload(&mut self, channel: &ControlChannel) -> Result<()>;

    fn bounce(&mut self, companion: &Companion) -> Result<()>;
}

/// Signals delivered to processes on this machine.
#[derive(Debug, Default)]
pub struct LocalHost;

impl HostSignals for LocalHost {
    fn chain_reload(&mut self, channel: &ControlChannel) -> Result<()> {
        channel.send(CHAIN_RELOAD)
    }

    fn bounce(&mut self, companion: &Companion) -> Result<()> {
        let mut cmd = Command::new("pkill");
        cmd.args(["-x", companion.process.as_str()]);
        if let Some(user) = &companion.user {
            cmd.args(["-u", user.as_str()]);
        }
        debug!("pkill -x {}", companion.process);
        let status = cmd.stdin(Stdio::null()).status()?;
        // pkill exits 1 when nothing matched, which leaves nothing to bounce.
        match status.code() {
            Some(0) | Some(1) => Ok(()),
            code => Err(RelaunchError::CommandFailed {
                command: format!("pkill -x {}", companion.process),
                code: code.unwrap_or(-1),
            }),
        }
    }
}
