//! Crate error type.
//!
//! Every failure in the simulator is fatal: it is reported once and
//! mapped to a non-zero exit in `main`. There are no retries and no
//! partial-failure paths — given identical inputs the simulation is
//! deterministic, so an error always means bad input or a bug.

use thiserror::Error;

/// Error type for simulator construction and execution.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid program configuration (bad algorithm code, missing or
    /// non-positive quantum, unreadable config or workload file).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed workload input line.
    #[error("workload parse error at line {line}: {reason}")]
    WorkloadParse {
        /// 1-based line number in the input file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Two workload descriptors share the same process id.
    #[error("duplicate process id {0} in workload")]
    DuplicateId(u32),

    /// Internal invariant violated. Unrecoverable — indicates a
    /// scheduler implementation bug, not bad input.
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),

    /// Event log or metrics file write failure.
    #[error("sink write error: {0}")]
    Sink(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
