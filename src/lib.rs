//! # schedsim Library
//!
//! Discrete-event CPU scheduler simulator core.
//!
//! The engine replays a finite workload of processes under one of three
//! classical policies — non-preemptive Highest Priority First, Shortest
//! Remaining Time Next, or Round Robin — over a virtual clock, and emits
//! a per-transition event log plus final performance metrics.
//!
//! # Module Structure
//!
//! - [`clock`] - virtual tick counter
//! - [`workload`] - descriptor parsing, arrival cursor, random generation
//! - [`table`] - process records and lifecycle accounting
//! - [`ready`] - policy selection and policy-specific ready structures
//! - [`engine`] - dispatcher state machine and tick loop
//! - [`accounting`] - per-tick counters and metric aggregation
//! - [`sink`] - event log and metrics file writers
//! - [`config`] - optional TOML run configuration
//! - [`error`] - crate error type
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    schedsim (single crate)                 │
//! │  ┌──────────┐    ┌────────────────┐    ┌────────────────┐  │
//! │  │ Workload │───►│  Engine        │◄──►│  ReadyQueue    │  │
//! │  │ (cursor) │    │  (tick loop)   │    │  (ids only)    │  │
//! │  └──────────┘    └───────┬────────┘    └────────────────┘  │
//! │                          │ owns                            │
//! │                          ▼                                 │
//! │        ┌──────────────┐     ┌────────────────────┐         │
//! │        │ ProcessTable │     │ EventLog / Metrics │         │
//! │        │ (records)    │     │ (flushed sinks)    │         │
//! │        └──────────────┘     └────────────────────┘         │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod accounting;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ready;
pub mod sink;
pub mod table;
pub mod workload;

// Re-export key types for convenience
pub use crate::accounting::Metrics;
pub use crate::engine::Engine;
pub use crate::error::{SimError, SimResult};
pub use crate::ready::Policy;
pub use crate::workload::Workload;
