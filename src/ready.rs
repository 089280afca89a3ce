//! Scheduling policy and ready structures.
//!
//! Each policy selects runnable processes through its own container: a
//! priority min-heap for HPF, a remaining-time min-heap for SRTN, and a
//! FIFO queue for RR. All three hold process ids only; the process
//! table stays the single owner of the records, and the dispatcher
//! reads the live record on pop.
//!
//! Heap keys are snapshotted at insert time. That is sound because a
//! queued process's key fields never change while it waits: priority
//! and arrival are immutable, and `remaining_time` only decrements
//! while Running — and a Running process is never in the structure.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::error::{SimError, SimResult};
use crate::table::ProcRecord;

/// Scheduling policy, selected at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Non-preemptive Highest Priority First.
    Hpf,
    /// Shortest Remaining Time Next (preemptive).
    Srtn,
    /// Round Robin with the given time quantum in ticks.
    Rr {
        /// Maximum consecutive ticks a process runs before rotating.
        quantum: u64,
    },
}

impl Policy {
    /// Map the numeric CLI selector: 1 = HPF, 2 = SRTN, 3 = RR.
    ///
    /// # Errors
    /// Rejects unknown codes, RR without a quantum, and a zero quantum.
    pub fn from_code(code: u8, quantum: Option<u64>) -> SimResult<Self> {
        match code {
            1 => Ok(Self::Hpf),
            2 => Ok(Self::Srtn),
            3 => match quantum {
                Some(q) if q > 0 => Ok(Self::Rr { quantum: q }),
                Some(_) => Err(SimError::Config(
                    "round robin quantum must be positive".to_string(),
                )),
                None => Err(SimError::Config(
                    "round robin requires a time quantum".to_string(),
                )),
            },
            other => Err(SimError::Config(format!(
                "unknown algorithm code {other} (expected 1, 2 or 3)"
            ))),
        }
    }

    /// Short display name used in traces.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hpf => "HPF",
            Self::Srtn => "SRTN",
            Self::Rr { .. } => "RR",
        }
    }
}

/// Min-heap entry: `(primary key, arrival_time, id)`.
///
/// Lower primary key wins; ties break by earlier arrival, then lower id.
type HeapEntry = Reverse<(u64, u64, u32)>;

/// Ready structure for the active policy. Holds ids only.
#[derive(Debug)]
pub enum ReadyQueue {
    /// Min-heap keyed by `(priority, arrival_time, id)`.
    Hpf(BinaryHeap<HeapEntry>),
    /// Min-heap keyed by `(remaining_time, arrival_time, id)`.
    Srtn(BinaryHeap<HeapEntry>),
    /// FIFO of ids; arrivals and rotated processes enqueue at the tail.
    Rr(VecDeque<u32>),
}

impl ReadyQueue {
    /// Empty ready structure for the given policy.
    pub fn for_policy(policy: Policy) -> Self {
        match policy {
            Policy::Hpf => Self::Hpf(BinaryHeap::new()),
            Policy::Srtn => Self::Srtn(BinaryHeap::new()),
            Policy::Rr { .. } => Self::Rr(VecDeque::new()),
        }
    }

    /// Enqueue a record's id, deriving the key from the live record.
    pub fn insert(&mut self, rec: &ProcRecord) {
        match self {
            Self::Hpf(heap) => heap.push(Reverse((
                rec.spec.priority as u64,
                rec.spec.arrival_time,
                rec.spec.id,
            ))),
            Self::Srtn(heap) => heap.push(Reverse((
                rec.remaining_time,
                rec.spec.arrival_time,
                rec.spec.id,
            ))),
            Self::Rr(queue) => queue.push_back(rec.spec.id),
        }
    }

    /// Remove and return the next id in policy order.
    pub fn pop(&mut self) -> Option<u32> {
        match self {
            Self::Hpf(heap) | Self::Srtn(heap) => heap.pop().map(|entry| entry.0.2),
            Self::Rr(queue) => queue.pop_front(),
        }
    }

    /// Primary key of the head entry (priority for HPF, remaining time
    /// for SRTN). `None` for RR, whose order carries no key.
    pub fn peek_key(&self) -> Option<u64> {
        match self {
            Self::Hpf(heap) | Self::Srtn(heap) => heap.peek().map(|entry| entry.0.0),
            Self::Rr(_) => None,
        }
    }

    /// Number of queued ids.
    pub fn len(&self) -> usize {
        match self {
            Self::Hpf(heap) | Self::Srtn(heap) => heap.len(),
            Self::Rr(queue) => queue.len(),
        }
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
