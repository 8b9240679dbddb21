//! Startup reset of the session scratch directory.
//!
//! Nothing survives between runs: the scratch directory (remote sample cache)
//! is wiped once when the process starts, never again after that.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::AppError;

/// A reset that runs at most once.
#[derive(Debug, Default)]
pub struct SessionReset {
    done: AtomicBool,
}

impl SessionReset {
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Empty `dir` on the first call; later calls return `Ok(false)`.
    pub fn run(&self, dir: &Path) -> Result<bool, AppError> {
        if self.done.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        clear_dir(dir)?;
        Ok(true)
    }
}

static STARTUP: SessionReset = SessionReset::new();

/// Process-wide startup reset.
pub fn reset_session_store(dir: &Path) -> Result<bool, AppError> {
    STARTUP.run(dir)
}

fn clear_dir(dir: &Path) -> Result<(), AppError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| {
            AppError::config(format!("Failed to clear session directory '{}': {e}", dir.display()))
        })?;
    }
    fs::create_dir_all(dir).map_err(|e| {
        AppError::config(format!("Failed to create session directory '{}': {e}", dir.display()))
    })?;
    debug!(dir = %dir.display(), "session directory reset");
    Ok(())
}
