//! Tick accounting and final metrics.
//!
//! Waiting time is charged in exactly one place (the tick advance, see
//! `ProcessTable::charge_waiting`) and only to non-running records;
//! this module owns the remaining counters: total runtime, idle time,
//! and the turnaround samples collected at finalize. Aggregation
//! guards the empty-run divisions: no finished processes reports WTA
//! stats of 0.00, and zero total runtime reports 0.00% utilization.

/// Running counters updated by the tick loop.
#[derive(Debug, Clone, Default)]
pub struct Accounting {
    /// Total ticks the clock has advanced, busy or idle.
    pub total_runtime: u64,
    /// Ticks during which no process held the CPU.
    pub idle_time: u64,
    turnarounds: Vec<u64>,
    weighted: Vec<f64>,
}

impl Accounting {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one clock advance. `busy` is whether a process ran
    /// during the tick.
    #[inline]
    pub fn on_advance(&mut self, busy: bool) {
        self.total_runtime += 1;
        if !busy {
            self.idle_time += 1;
        }
    }

    /// Record a finished process's turnaround samples, in finish order.
    pub fn on_finish(&mut self, turnaround: u64, weighted: f64) {
        self.turnarounds.push(turnaround);
        self.weighted.push(weighted);
    }

    /// Number of finished processes recorded so far.
    #[inline]
    pub fn finished_count(&self) -> usize {
        self.weighted.len()
    }

    /// Aggregate final metrics. `waiting` yields the waiting time of
    /// every admitted process (finished or not).
    pub fn summarize(&self, waiting: impl Iterator<Item = u64>) -> Metrics {
        let cpu_utilization = if self.total_runtime == 0 {
            0.0
        } else {
            100.0 * (self.total_runtime - self.idle_time) as f64 / self.total_runtime as f64
        };

        let n = self.weighted.len();
        let (avg_wta, std_wta) = if n == 0 {
            (0.0, 0.0)
        } else {
            let avg = self.weighted.iter().sum::<f64>() / n as f64;
            let var = self
                .weighted
                .iter()
                .map(|w| (w - avg) * (w - avg))
                .sum::<f64>()
                / n as f64;
            (avg, var.sqrt())
        };

        let waits: Vec<u64> = waiting.collect();
        let avg_waiting = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<u64>() as f64 / waits.len() as f64
        };

        Metrics {
            cpu_utilization,
            avg_wta,
            avg_waiting,
            std_wta,
        }
    }
}

/// Final performance metrics of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Busy fraction of total runtime, in percent.
    pub cpu_utilization: f64,
    /// Mean weighted turnaround over finished processes.
    pub avg_wta: f64,
    /// Mean waiting time over all admitted processes.
    pub avg_waiting: f64,
    /// Population standard deviation of weighted turnaround.
    pub std_wta: f64,
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn advance_counts_idle_and_busy() {
        let mut acc = Accounting::new();
        acc.on_advance(true);
        acc.on_advance(false);
        acc.on_advance(true);
        assert_eq!(acc.total_runtime, 3);
        assert_eq!(acc.idle_time, 1);
    }

    #[test]
    fn summarize_basic_run() {
        let mut acc = Accounting::new();
        for _ in 0..8 {
            acc.on_advance(true);
        }
        acc.on_advance(false);
        acc.on_advance(false);
        acc.on_finish(4, 1.0);
        acc.on_finish(6, 2.0);

        let m = acc.summarize([0u64, 3].into_iter());
        assert!(close(m.cpu_utilization, 80.0));
        assert!(close(m.avg_wta, 1.5));
        assert!(close(m.std_wta, 0.5));
        assert!(close(m.avg_waiting, 1.5));
        assert_eq!(acc.finished_count(), 2);
    }

    #[test]
    fn empty_run_reports_zeros() {
        let acc = Accounting::new();
        let m = acc.summarize(std::iter::empty());
        assert!(close(m.cpu_utilization, 0.0));
        assert!(close(m.avg_wta, 0.0));
        assert!(close(m.std_wta, 0.0));
        assert!(close(m.avg_waiting, 0.0));
    }

    #[test]
    fn single_sample_has_zero_deviation() {
        let mut acc = Accounting::new();
        acc.on_advance(true);
        acc.on_finish(5, 1.0);
        let m = acc.summarize([0u64].into_iter());
        assert!(close(m.cpu_utilization, 100.0));
        assert!(close(m.std_wta, 0.0));
    }
}
