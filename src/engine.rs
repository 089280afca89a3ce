//! Dispatcher, state machine, and tick loop.
//!
//! The engine is single-threaded and cooperatively driven: one
//! [`Engine::step`] covers exactly one tick. Within a step the ordering
//! is fixed — admissions, then preemption checks, then dispatch, then
//! the clock advance that consumes one unit of work — because it
//! determines observable log order and metric values whenever an
//! arrival coincides with another process's finish.
//!
//! ## Step anatomy
//!
//! 1. Admit every workload entry due at the current tick (ascending id).
//! 2. RR only: preempt the running process if its quantum is spent.
//!    The rotated id lands behind arrivals admitted this tick.
//! 3. `reconsider()` — SRTN preemption check, dispatch if the CPU is free.
//! 4. Advance the clock, charge waiting time, consume one unit from the
//!    running process; finalize it when its remaining time reaches zero.
//!
//! A process that finishes is not replaced within the same step: the
//! next step's admissions run first, so a process arriving exactly at
//! the finish tick is considered before the CPU is handed over (and
//! before any idle tick could be charged).

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::accounting::{Accounting, Metrics};
use crate::clock::VirtualClock;
use crate::error::{SimError, SimResult};
use crate::ready::{Policy, ReadyQueue};
use crate::sink::{EventLog, Transition};
use crate::table::{ProcState, ProcessTable};
use crate::workload::Workload;

/// Discrete-event scheduler engine.
///
/// Owns the clock, the process table, the active ready structure, and
/// the event log. Generic over the log's writer so tests can capture
/// output in memory.
pub struct Engine<W: Write> {
    policy: Policy,
    clock: VirtualClock,
    workload: Workload,
    table: ProcessTable,
    ready: ReadyQueue,
    /// Id of the record currently holding the CPU.
    running: Option<u32>,
    /// RR only: ticks left in the running process's quantum.
    quantum_left: u64,
    accounting: Accounting,
    log: EventLog<W>,
    abort: Option<Arc<AtomicBool>>,
    tick_pause: Option<Duration>,
}

impl<W: Write> Engine<W> {
    /// Create an engine over a workload with the given policy and log.
    pub fn new(policy: Policy, workload: Workload, log: EventLog<W>) -> Self {
        Self {
            policy,
            clock: VirtualClock::new(),
            workload,
            table: ProcessTable::new(),
            ready: ReadyQueue::for_policy(policy),
            running: None,
            quantum_left: 0,
            accounting: Accounting::new(),
            log,
            abort: None,
            tick_pause: None,
        }
    }

    /// Install an external abort flag. When set, [`Engine::run`] stops
    /// at the next tick boundary and metrics cover completed processes
    /// only.
    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    /// Pause wall-clock time after every tick, for observability.
    /// Correctness never depends on it.
    pub fn with_tick_pause(mut self, pause: Duration) -> Self {
        self.tick_pause = Some(pause);
        self
    }

    /// Active policy.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// The process table (read-only).
    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    /// Running counters (read-only).
    pub fn accounting(&self) -> &Accounting {
        &self.accounting
    }

    /// Consume the engine and return the event log.
    pub fn into_log(self) -> EventLog<W> {
        self.log
    }

    /// True once the workload is exhausted and every admitted record
    /// is Finished. Vacuously true for an empty workload.
    pub fn is_complete(&self) -> bool {
        self.workload.is_exhausted() && self.table.all_finished()
    }

    /// Aggregate metrics from the current counters and table.
    pub fn metrics(&self) -> Metrics {
        self.accounting
            .summarize(self.table.iter_all().map(|r| r.waiting_time))
    }

    /// Drive the simulation to completion (or until the abort flag is
    /// set) and return the final metrics.
    pub fn run(&mut self) -> SimResult<Metrics> {
        info!(
            policy = self.policy.name(),
            processes = self.workload.len(),
            "simulation starting"
        );
        while !self.is_complete() {
            if let Some(flag) = &self.abort {
                if flag.load(Ordering::SeqCst) {
                    info!(tick = self.clock.now(), "abort requested, stopping");
                    break;
                }
            }
            self.step()?;
            if let Some(pause) = self.tick_pause {
                std::thread::sleep(pause);
            }
        }
        info!(
            ticks = self.accounting.total_runtime,
            finished = self.accounting.finished_count(),
            idle = self.accounting.idle_time,
            "simulation complete"
        );
        Ok(self.metrics())
    }

    /// Execute exactly one tick of the simulation.
    pub fn step(&mut self) -> SimResult<()> {
        self.admit_due()?;
        self.expire_quantum()?;
        self.reconsider()?;
        self.advance()?;
        #[cfg(debug_assertions)]
        self.assert_invariants();
        Ok(())
    }

    // ─── Dispatcher operations ──────────────────────────────────────

    /// Admit every workload entry due at the current tick.
    fn admit_due(&mut self) -> SimResult<()> {
        let now = self.clock.now();
        while let Some(spec) = self.workload.next_due(now) {
            debug!(id = spec.id, tick = now, "process arrived");
            let rec = self.table.admit(spec)?;
            self.ready.insert(rec);
        }
        Ok(())
    }

    /// RR only: rotate the running process once its quantum is spent.
    fn expire_quantum(&mut self) -> SimResult<()> {
        let Policy::Rr { .. } = self.policy else {
            return Ok(());
        };
        if let Some(id) = self.running {
            if self.quantum_left == 0 {
                self.preempt(id)?;
            }
        }
        Ok(())
    }

    /// Policy-specific selection: dispatch when the CPU is free, and
    /// under SRTN preempt the running process when a strictly shorter
    /// ready process exists. An equal remaining time never preempts.
    fn reconsider(&mut self) -> SimResult<()> {
        match self.policy {
            Policy::Hpf | Policy::Rr { .. } => {
                if self.running.is_none() && !self.ready.is_empty() {
                    self.dispatch_next()?;
                }
            }
            Policy::Srtn => {
                if let Some(id) = self.running {
                    let running_rem = self
                        .table
                        .get(id)
                        .ok_or(SimError::Invariant("running id missing from table"))?
                        .remaining_time;
                    if let Some(shortest) = self.ready.peek_key() {
                        if shortest < running_rem {
                            self.preempt(id)?;
                            self.dispatch_next()?;
                        }
                    }
                } else if !self.ready.is_empty() {
                    self.dispatch_next()?;
                }
            }
        }
        Ok(())
    }

    /// Pop the ready structure and hand the CPU to the selected record.
    fn dispatch_next(&mut self) -> SimResult<()> {
        let id = self
            .ready
            .pop()
            .ok_or(SimError::Invariant("dispatch from empty ready structure"))?;
        let now = self.clock.now();
        let rec = self
            .table
            .get_mut(id)
            .ok_or(SimError::Invariant("ready id missing from table"))?;
        if rec.state != ProcState::Ready && rec.state != ProcState::Stopped {
            return Err(SimError::Invariant("dispatch of a non-waiting process"));
        }
        rec.state = ProcState::Running;
        rec.last_run_time = Some(now);
        let transition = if rec.start_time.is_none() {
            rec.start_time = Some(now);
            Transition::Started
        } else {
            Transition::Resumed
        };
        self.running = Some(id);
        if let Policy::Rr { quantum } = self.policy {
            self.quantum_left = quantum;
        }
        debug!(id, tick = now, "dispatched");
        let rec = self
            .table
            .get(id)
            .ok_or(SimError::Invariant("dispatched id missing from table"))?;
        self.log.record(now, rec, transition)?;
        Ok(())
    }

    /// Take the CPU away from `id` and put it back in the ready
    /// structure.
    fn preempt(&mut self, id: u32) -> SimResult<()> {
        let now = self.clock.now();
        let rec = self
            .table
            .get_mut(id)
            .ok_or(SimError::Invariant("preempted id missing from table"))?;
        if rec.state != ProcState::Running {
            return Err(SimError::Invariant("preempt of a non-running process"));
        }
        rec.state = ProcState::Stopped;
        rec.preempted = true;
        self.running = None;
        debug!(id, tick = now, "preempted");
        let rec = self
            .table
            .get(id)
            .ok_or(SimError::Invariant("preempted id missing from table"))?;
        self.log.record(now, rec, Transition::Stopped)?;
        self.ready.insert(rec);
        Ok(())
    }

    /// Advance the clock one tick: charge waiting, consume one unit of
    /// the running process's remaining time (or record an idle tick),
    /// and finalize on zero remaining.
    fn advance(&mut self) -> SimResult<()> {
        let busy = self.running.is_some();
        self.clock.advance();
        self.accounting.on_advance(busy);
        self.table.charge_waiting();

        if let Some(id) = self.running {
            let rec = self
                .table
                .get_mut(id)
                .ok_or(SimError::Invariant("running id missing from table"))?;
            if rec.remaining_time == 0 {
                return Err(SimError::Invariant("running process had no work left"));
            }
            rec.remaining_time -= 1;
            if rec.remaining_time == 0 {
                self.finalize(id)?;
            } else if let Policy::Rr { .. } = self.policy {
                self.quantum_left -= 1;
            }
        }
        Ok(())
    }

    /// Mark `id` finished at the current tick and collect its
    /// turnaround samples. The CPU stays free until the next step's
    /// `reconsider()`, which runs after that tick's admissions.
    fn finalize(&mut self, id: u32) -> SimResult<()> {
        let now = self.clock.now();
        let rec = self
            .table
            .get_mut(id)
            .ok_or(SimError::Invariant("finished id missing from table"))?;
        if rec.state != ProcState::Running {
            return Err(SimError::Invariant("finalize of a non-running process"));
        }
        rec.state = ProcState::Finished;
        rec.finish_time = Some(now);
        self.running = None;

        let rec = self
            .table
            .get(id)
            .ok_or(SimError::Invariant("finished id missing from table"))?;
        let ta = rec
            .turnaround()
            .ok_or(SimError::Invariant("finished record without finish time"))?;
        let wta = rec
            .weighted_turnaround()
            .ok_or(SimError::Invariant("finished record without finish time"))?;
        self.accounting.on_finish(ta, wta);
        info!(id, tick = now, ta, wta, "process finished");
        self.log.record(now, rec, Transition::Finished)?;
        Ok(())
    }

    // ─── Invariant checks (debug builds) ────────────────────────────

    /// Assert the tick-boundary invariants. Compiled out of release
    /// builds; a failure here means a scheduler bug, not bad input.
    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        let now = self.clock.now();
        let mut running_count = 0usize;
        let mut executed_sum = 0u64;

        for rec in self.table.iter_all() {
            assert!(
                rec.remaining_time <= rec.spec.runtime,
                "process {}: remaining exceeds runtime",
                rec.spec.id
            );
            executed_sum += rec.executed();
            match rec.state {
                ProcState::Running => running_count += 1,
                ProcState::Finished => {
                    let finish = rec.finish_time.expect("finished without finish_time");
                    let start = rec.start_time.expect("finished without start_time");
                    assert!(finish >= start && start >= rec.spec.arrival_time);
                    assert!(finish - rec.spec.arrival_time >= rec.spec.runtime);
                }
                ProcState::Ready | ProcState::Stopped => {}
            }
            if rec.state != ProcState::Finished {
                assert_eq!(
                    rec.waiting_time + rec.executed(),
                    now - rec.spec.arrival_time,
                    "process {}: waiting accounting drift",
                    rec.spec.id
                );
            }
        }

        assert!(running_count <= 1, "more than one running process");
        assert_eq!(
            executed_sum + self.accounting.idle_time,
            now,
            "executed + idle must equal the clock"
        );

        if let (Policy::Srtn, Some(id)) = (self.policy, self.running) {
            let running_rem = self.table.get(id).map(|r| r.remaining_time).unwrap_or(0);
            if let Some(shortest) = self.ready.peek_key() {
                assert!(
                    shortest >= running_rem,
                    "ready process shorter than the running one under SRTN"
                );
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ProcState;
    use crate::workload::ProcessSpec;

    fn spec(id: u32, arrival: u64, runtime: u64, priority: u8) -> ProcessSpec {
        ProcessSpec {
            id,
            arrival_time: arrival,
            runtime,
            priority,
            memsize: 0,
        }
    }

    fn run_to_completion(
        policy: Policy,
        specs: Vec<ProcessSpec>,
    ) -> (Metrics, String, Vec<(u32, u64, u64)>) {
        let workload = Workload::from_specs(specs).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let mut engine = Engine::new(policy, workload, log);
        let metrics = engine.run().unwrap();
        assert!(engine.is_complete());

        // (id, finish_time, waiting_time) per record, admission order.
        let summary = engine
            .table()
            .iter_all()
            .map(|r| (r.spec.id, r.finish_time.unwrap(), r.waiting_time))
            .collect();
        let text = String::from_utf8(engine.into_log().into_inner()).unwrap();
        (metrics, text, summary)
    }

    #[test]
    fn hpf_is_non_preemptive() {
        // A higher-priority arrival must wait for the running process.
        let (_, text, summary) = run_to_completion(
            Policy::Hpf,
            vec![spec(1, 0, 4, 5), spec(2, 1, 2, 1)],
        );
        assert!(!text.contains("stopped"));
        assert_eq!(summary, vec![(1, 4, 0), (2, 6, 3)]);
    }

    #[test]
    fn hpf_picks_highest_priority_among_ready() {
        // After process 1 finishes, 3 outranks 2 despite arriving later.
        let (_, _, summary) = run_to_completion(
            Policy::Hpf,
            vec![spec(1, 0, 3, 0), spec(2, 1, 2, 8), spec(3, 2, 2, 1)],
        );
        assert_eq!(summary, vec![(1, 3, 0), (2, 7, 4), (3, 5, 1)]);
    }

    #[test]
    fn srtn_preempts_on_strictly_shorter_arrival() {
        let (_, text, summary) = run_to_completion(
            Policy::Srtn,
            vec![spec(1, 0, 6, 5), spec(2, 2, 2, 5)],
        );
        assert!(text.contains("At time 2 process 1 stopped"));
        assert!(text.contains("At time 4 process 1 resumed"));
        assert_eq!(summary, vec![(1, 8, 2), (2, 4, 0)]);
    }

    #[test]
    fn srtn_tie_does_not_preempt() {
        // At t=2 both have remaining 2: the incumbent keeps the CPU.
        let (_, text, summary) = run_to_completion(
            Policy::Srtn,
            vec![spec(1, 0, 4, 0), spec(2, 2, 2, 0)],
        );
        assert!(!text.contains("stopped"));
        assert_eq!(summary, vec![(1, 4, 0), (2, 6, 2)]);
    }

    #[test]
    fn rr_rotates_in_quantum_slices() {
        let (_, _, summary) = run_to_completion(
            Policy::Rr { quantum: 2 },
            vec![spec(1, 0, 5, 0), spec(2, 0, 3, 0), spec(3, 0, 1, 0)],
        );
        assert_eq!(summary, vec![(1, 9, 4), (2, 8, 5), (3, 5, 4)]);
    }

    #[test]
    fn rr_single_process_rotates_in_place() {
        // Quantum expiry with an empty queue stops and resumes the
        // same process at the same tick; no waiting accrues.
        let (_, text, summary) =
            run_to_completion(Policy::Rr { quantum: 2 }, vec![spec(1, 0, 5, 0)]);
        assert!(text.contains("At time 2 process 1 stopped"));
        assert!(text.contains("At time 2 process 1 resumed"));
        assert_eq!(summary, vec![(1, 5, 0)]);
    }

    #[test]
    fn rr_expired_process_queues_behind_same_tick_arrival() {
        // Process 2 arrives exactly when process 1's quantum expires:
        // the arrival is admitted first, so it runs first.
        let (_, text, _) = run_to_completion(
            Policy::Rr { quantum: 2 },
            vec![spec(1, 0, 4, 0), spec(2, 2, 2, 0)],
        );
        let started_2 = text.find("At time 2 process 2 started").unwrap();
        let resumed_1 = text.find("At time 4 process 1 resumed").unwrap();
        assert!(started_2 < resumed_1);
    }

    #[test]
    fn idle_gap_is_charged_to_idle_time() {
        let workload = Workload::from_specs(vec![spec(1, 5, 2, 0)]).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let mut engine = Engine::new(Policy::Hpf, workload, log);
        let metrics = engine.run().unwrap();
        assert_eq!(engine.accounting().total_runtime, 7);
        assert_eq!(engine.accounting().idle_time, 5);
        assert!((metrics.cpu_utilization - 100.0 * 2.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn empty_workload_completes_immediately() {
        let workload = Workload::from_specs(Vec::new()).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let mut engine = Engine::new(Policy::Srtn, workload, log);
        let metrics = engine.run().unwrap();
        assert_eq!(engine.now(), 0);
        assert_eq!(metrics.cpu_utilization, 0.0);
        assert_eq!(metrics.avg_wta, 0.0);
    }

    #[test]
    fn abort_flag_stops_before_any_step() {
        let workload = Workload::from_specs(vec![spec(1, 0, 5, 0)]).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let flag = Arc::new(AtomicBool::new(true));
        let mut engine =
            Engine::new(Policy::Hpf, workload, log).with_abort_flag(Arc::clone(&flag));
        let metrics = engine.run().unwrap();
        assert_eq!(engine.now(), 0);
        assert!(!engine.is_complete());
        assert_eq!(metrics.avg_wta, 0.0);
    }

    #[test]
    fn abort_mid_run_reports_completed_only() {
        let workload =
            Workload::from_specs(vec![spec(1, 0, 2, 0), spec(2, 0, 9, 1)]).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let mut engine =
            Engine::new(Policy::Hpf, workload, log).with_abort_flag(Arc::clone(&flag));

        // Step until the first process finishes, then abort.
        while engine.table().finished_count() == 0 {
            engine.step().unwrap();
        }
        flag.store(true, Ordering::SeqCst);
        let metrics = engine.run().unwrap();

        assert_eq!(engine.accounting().finished_count(), 1);
        assert!((metrics.avg_wta - 1.0).abs() < 1e-9);
        // The break happens before the next step's dispatch, so the
        // survivor is still waiting.
        assert_eq!(engine.table().get(2).unwrap().state, ProcState::Ready);
    }

    #[test]
    fn step_state_is_observable() {
        let workload = Workload::from_specs(vec![spec(1, 0, 3, 0)]).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let mut engine = Engine::new(Policy::Hpf, workload, log);
        assert_eq!(engine.policy(), Policy::Hpf);

        engine.step().unwrap();
        assert_eq!(engine.now(), 1);
        let rec = engine.table().get(1).unwrap();
        assert_eq!(rec.state, ProcState::Running);
        assert_eq!(rec.remaining_time, 2);
        assert_eq!(rec.start_time, Some(0));
        assert_eq!(rec.last_run_time, Some(0));
    }

    #[test]
    fn preempted_flag_is_set_under_srtn() {
        let workload =
            Workload::from_specs(vec![spec(1, 0, 6, 5), spec(2, 2, 2, 5)]).unwrap();
        let log = EventLog::new(Vec::new()).unwrap();
        let mut engine = Engine::new(Policy::Srtn, workload, log);
        for _ in 0..3 {
            engine.step().unwrap();
        }
        assert!(engine.table().get(1).unwrap().preempted);
        assert!(!engine.table().get(2).unwrap().preempted);
    }
}
