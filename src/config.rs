//! Run configuration.
//!
//! Optional TOML file mirroring the CLI flags; explicit flags win over
//! file values. Parsing is strict: unknown keys are rejected so a typo
//! fails fast instead of silently falling back to a default.
//!
//! # TOML Example
//!
//! ```toml
//! algorithm = 3
//! quantum = 4
//! workload = "processes.txt"
//! log_path = "scheduler.log"
//! perf_path = "scheduler.perf"
//! tick_millis = 0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Upper bound for the per-tick wall-clock pause.
pub const MAX_TICK_MILLIS: u64 = 10_000;

fn default_log_path() -> PathBuf {
    PathBuf::from("scheduler.log")
}

fn default_perf_path() -> PathBuf {
    PathBuf::from("scheduler.perf")
}

/// Run configuration — loaded from a TOML file and merged with CLI
/// flags before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Algorithm code: 1 = HPF, 2 = SRTN, 3 = RR.
    pub algorithm: Option<u8>,
    /// RR time quantum in ticks.
    pub quantum: Option<u64>,
    /// Workload input file.
    pub workload: Option<PathBuf>,
    /// Event log output path.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Metrics output path.
    #[serde(default = "default_perf_path")]
    pub perf_path: PathBuf,
    /// Wall-clock pause per tick in milliseconds. 0 runs flat out.
    #[serde(default)]
    pub tick_millis: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algorithm: None,
            quantum: None,
            workload: None,
            log_path: default_log_path(),
            perf_path: default_perf_path(),
            tick_millis: 0,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `SimError::Config` for an unreadable file, invalid TOML,
    /// or an unknown key.
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| SimError::Config(format!("{}: {e}", path.display())))
    }

    /// Validate field bounds after the CLI merge.
    pub fn validate(&self) -> SimResult<()> {
        if self.tick_millis > MAX_TICK_MILLIS {
            return Err(SimError::Config(format!(
                "tick_millis={} out of range [0, {MAX_TICK_MILLIS}]",
                self.tick_millis
            )));
        }
        if let Some(0) = self.quantum {
            return Err(SimError::Config(
                "quantum must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
