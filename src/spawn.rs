use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::ForemanError;

/// Seam between the master and the operating system: launch a unit pass as
/// a background process. The master never reads child output.
pub trait Spawn: Send + Sync {
    fn spawn_detached(&self, argv: &[String]) -> Result<(), ForemanError>;
}

/// Process-backed spawner. Children run the configured binary (normally
/// the current executable, whose CLI exposes the `unit` subcommand) with
/// stdin/stdout/stderr closed, fire-and-forget.
pub struct OsSpawn {
    binary: PathBuf,
}

impl OsSpawn {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl Spawn for OsSpawn {
    fn spawn_detached(&self, argv: &[String]) -> Result<(), ForemanError> {
        tracing::debug!(binary = %self.binary.display(), ?argv, "Spawning unit");

        Command::new(&self.binary)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(())
    }
}
