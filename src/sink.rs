//! Event log and metrics sink.
//!
//! Both artifacts are append-only text files flushed on every write so
//! that a crash leaves a consistent prefix. Writers are generic over
//! `io::Write`, which lets tests capture output in memory and the
//! benches discard it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::accounting::Metrics;
use crate::error::SimResult;
use crate::table::ProcRecord;

/// Kind of state transition reported to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First dispatch of a process.
    Started,
    /// Re-dispatch after a preemption.
    Resumed,
    /// Preemption of the running process.
    Stopped,
    /// Completion.
    Finished,
}

impl Transition {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Resumed => "resumed",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
        }
    }
}

/// Append-only event log writing one line per state transition.
#[derive(Debug)]
pub struct EventLog<W: Write> {
    out: W,
}

impl EventLog<BufWriter<File>> {
    /// Create the log file at `path` and write the header line.
    pub fn create(path: &Path) -> SimResult<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> EventLog<W> {
    /// Wrap an arbitrary writer and emit the header line.
    pub fn new(mut out: W) -> SimResult<Self> {
        writeln!(out, "#At time x process y state arr w total z remain y wait k")?;
        out.flush()?;
        Ok(Self { out })
    }

    /// Append one transition line, flushed immediately.
    ///
    /// `finished` lines carry the turnaround and weighted turnaround
    /// of the record, WTA formatted to two decimals.
    pub fn record(&mut self, now: u64, rec: &ProcRecord, transition: Transition) -> SimResult<()> {
        write!(
            self.out,
            "At time {} process {} {} arr {} total {} remain {} wait {}",
            now,
            rec.spec.id,
            transition.as_str(),
            rec.spec.arrival_time,
            rec.spec.runtime,
            rec.remaining_time,
            rec.waiting_time
        )?;
        if transition == Transition::Finished {
            let ta = rec.turnaround().unwrap_or(0);
            let wta = rec.weighted_turnaround().unwrap_or(0.0);
            write!(self.out, " TA {ta} WTA {wta:.2}")?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    /// Consume the log and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Write the four-line metrics summary, floats to two decimals.
pub fn write_metrics<W: Write>(mut out: W, metrics: &Metrics) -> SimResult<()> {
    writeln!(out, "CPU utilization = {:.2}%", metrics.cpu_utilization)?;
    writeln!(out, "Avg WTA = {:.2}", metrics.avg_wta)?;
    writeln!(out, "Avg Waiting = {:.2}", metrics.avg_waiting)?;
    writeln!(out, "Std WTA = {:.2}", metrics.std_wta)?;
    out.flush()?;
    Ok(())
}

/// Create `path` and write the metrics summary into it.
pub fn write_metrics_file(path: &Path, metrics: &Metrics) -> SimResult<()> {
    let file = File::create(path)?;
    write_metrics(BufWriter::new(file), metrics)
}

// ─── Tests ──────────────────────────────────────────────────────────
