//! Process table.
//!
//! Sole owner of every record admitted into the simulation. Ready
//! structures and the dispatcher refer to records by id only and read
//! the live record through the table, so no stale snapshot of
//! `remaining_time` can circulate between containers.
//!
//! The table is insert-only: records are never removed, and a FINISHED
//! record is immutable except for summary reads.

use std::collections::HashMap;

use crate::error::{SimError, SimResult};
use crate::workload::ProcessSpec;

/// Lifecycle state of a process record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcState {
    /// Admitted and runnable, waiting in a ready structure.
    Ready,
    /// Currently holding the CPU.
    Running,
    /// Preempted after having run; waits like Ready.
    Stopped,
    /// Completed. Terminal.
    Finished,
}

impl ProcState {
    /// True for the states that accrue waiting time.
    #[inline]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Ready | Self::Stopped)
    }
}

/// Mutable lifecycle record for one admitted process.
#[derive(Debug, Clone)]
pub struct ProcRecord {
    /// Immutable descriptor the record was admitted from.
    pub spec: ProcessSpec,
    /// Ticks of CPU still owed. Equals `spec.runtime` at admission,
    /// 0 at finish; decremented by exactly one per tick spent Running.
    pub remaining_time: u64,
    /// Current lifecycle state.
    pub state: ProcState,
    /// Ticks spent Ready or Stopped since arrival.
    pub waiting_time: u64,
    /// Tick of the first dispatch; `None` before.
    pub start_time: Option<u64>,
    /// Tick of completion; `None` before.
    pub finish_time: Option<u64>,
    /// Tick the current or latest running segment began.
    pub last_run_time: Option<u64>,
    /// Set once the process has been stopped mid-run.
    pub preempted: bool,
}

impl ProcRecord {
    fn new(spec: ProcessSpec) -> Self {
        Self {
            spec,
            remaining_time: spec.runtime,
            state: ProcState::Ready,
            waiting_time: 0,
            start_time: None,
            finish_time: None,
            last_run_time: None,
            preempted: false,
        }
    }

    /// Ticks of CPU consumed so far.
    #[inline]
    pub fn executed(&self) -> u64 {
        self.spec.runtime - self.remaining_time
    }

    /// Turnaround time. `None` until finished.
    #[inline]
    pub fn turnaround(&self) -> Option<u64> {
        self.finish_time.map(|f| f - self.spec.arrival_time)
    }

    /// Weighted turnaround (turnaround / runtime). `None` until finished.
    #[inline]
    pub fn weighted_turnaround(&self) -> Option<f64> {
        self.turnaround().map(|ta| ta as f64 / self.spec.runtime as f64)
    }
}

/// Insert-only table mapping process id to its record.
#[derive(Debug, Default)]
pub struct ProcessTable {
    records: Vec<ProcRecord>,
    index: HashMap<u32, usize>,
}

impl ProcessTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a descriptor, creating a Ready record.
    ///
    /// # Errors
    /// Returns `SimError::DuplicateId` if the id is already present.
    pub fn admit(&mut self, spec: ProcessSpec) -> SimResult<&ProcRecord> {
        if self.index.contains_key(&spec.id) {
            return Err(SimError::DuplicateId(spec.id));
        }
        let idx = self.records.len();
        self.records.push(ProcRecord::new(spec));
        self.index.insert(spec.id, idx);
        Ok(&self.records[idx])
    }

    /// Look up a record by id.
    pub fn get(&self, id: u32) -> Option<&ProcRecord> {
        self.index.get(&id).map(|&idx| &self.records[idx])
    }

    /// Look up a record by id, mutably.
    pub fn get_mut(&mut self, id: u32) -> Option<&mut ProcRecord> {
        self.index.get(&id).map(|&idx| &mut self.records[idx])
    }

    /// Iterate all records in admission order.
    pub fn iter_all(&self) -> impl Iterator<Item = &ProcRecord> {
        self.records.iter()
    }

    /// Number of records ever admitted.
    #[inline]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Number of Finished records.
    pub fn finished_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == ProcState::Finished)
            .count()
    }

    /// True when every admitted record is Finished. Vacuously true for
    /// an empty table.
    pub fn all_finished(&self) -> bool {
        self.records.iter().all(|r| r.state == ProcState::Finished)
    }

    /// Charge one tick of waiting to every Ready or Stopped record.
    /// Called exactly once per clock advance, nowhere else.
    pub(crate) fn charge_waiting(&mut self) {
        for rec in &mut self.records {
            if rec.state.is_waiting() {
                rec.waiting_time += 1;
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
