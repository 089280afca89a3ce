//! Workload source.
//!
//! Parses the `#`-commented tabular workload format, validates field
//! ranges, and yields descriptors to the engine as their arrival tick
//! becomes due. Also hosts the random workload generator used to
//! produce fixtures.
//!
//! # Input format
//!
//! UTF-8 text; lines starting with `#` and blank lines are skipped.
//! Data lines carry whitespace-separated integers
//! `id arrival runtime priority`, with an optional trailing `memsize`
//! column that is accepted and ignored.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{SimError, SimResult};

/// Maximum admissible priority value (lower value = higher priority).
pub const MAX_PRIORITY: u8 = 10;

/// Exclusive arrival-time bound used by the random generator.
pub const GEN_ARRIVAL_BOUND: u64 = 20;

/// Inclusive runtime bound used by the random generator.
pub const GEN_RUNTIME_MAX: u64 = 20;

/// Immutable process descriptor as read from the workload file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Unique positive process id.
    pub id: u32,
    /// Tick at which the process becomes known to the scheduler.
    pub arrival_time: u64,
    /// Total CPU ticks the process needs. At least 1.
    pub runtime: u64,
    /// Priority in `[0, 10]`; lower wins under HPF.
    pub priority: u8,
    /// Declared memory size. Accepted for format compatibility, unused.
    pub memsize: u64,
}

// ─── Workload ───────────────────────────────────────────────────────

/// Finite arrival-ordered sequence of process descriptors.
///
/// Descriptors are sorted by `(arrival_time, id)` at construction, so
/// draining due arrivals at a tick admits same-tick processes in
/// ascending id order.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    specs: Vec<ProcessSpec>,
    cursor: usize,
}

impl Workload {
    /// Build a workload from descriptors, validating ranges and
    /// rejecting duplicate ids.
    pub fn from_specs(mut specs: Vec<ProcessSpec>) -> SimResult<Self> {
        let mut seen = HashSet::with_capacity(specs.len());
        for spec in &specs {
            if spec.id == 0 {
                return Err(SimError::Config("process id must be positive".to_string()));
            }
            if spec.runtime == 0 {
                return Err(SimError::Config(format!(
                    "process {}: runtime must be >= 1",
                    spec.id
                )));
            }
            if spec.priority > MAX_PRIORITY {
                return Err(SimError::Config(format!(
                    "process {}: priority {} out of range [0, {}]",
                    spec.id, spec.priority, MAX_PRIORITY
                )));
            }
            if !seen.insert(spec.id) {
                return Err(SimError::DuplicateId(spec.id));
            }
        }
        specs.sort_by_key(|s| (s.arrival_time, s.id));
        Ok(Self { specs, cursor: 0 })
    }

    /// Parse a workload from text in the input format.
    pub fn parse_str(input: &str) -> SimResult<Self> {
        let mut specs = Vec::new();
        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            specs.push(parse_line(line, line_no)?);
        }
        Self::from_specs(specs)
    }

    /// Load and parse a workload file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("cannot read workload {}: {e}", path.display()))
        })?;
        Self::parse_str(&content)
    }

    /// Pop the next descriptor whose arrival tick is due at `now`.
    ///
    /// Returns `None` once no further descriptor has
    /// `arrival_time <= now`. Same-tick descriptors come out in
    /// ascending id order.
    pub fn next_due(&mut self, now: u64) -> Option<ProcessSpec> {
        let spec = *self.specs.get(self.cursor)?;
        if spec.arrival_time <= now {
            self.cursor += 1;
            Some(spec)
        } else {
            None
        }
    }

    /// True once every descriptor has been admitted.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.specs.len()
    }

    /// Total number of descriptors.
    #[inline]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True for a workload with no descriptors at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Parse one data line. `line` is already trimmed and non-comment.
fn parse_line(line: &str, line_no: usize) -> SimResult<ProcessSpec> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 && fields.len() != 5 {
        return Err(SimError::WorkloadParse {
            line: line_no,
            reason: format!("expected 4 or 5 fields, found {}", fields.len()),
        });
    }

    let id: u32 = parse_field(fields[0], "id", line_no)?;
    let arrival_time: u64 = parse_field(fields[1], "arrival", line_no)?;
    let runtime: u64 = parse_field(fields[2], "runtime", line_no)?;
    let priority: u8 = parse_field(fields[3], "priority", line_no)?;
    let memsize: u64 = if fields.len() == 5 {
        parse_field(fields[4], "memsize", line_no)?
    } else {
        0
    };

    if id == 0 {
        return Err(SimError::WorkloadParse {
            line: line_no,
            reason: "id must be positive".to_string(),
        });
    }
    if runtime == 0 {
        return Err(SimError::WorkloadParse {
            line: line_no,
            reason: "runtime must be >= 1".to_string(),
        });
    }
    if priority > MAX_PRIORITY {
        return Err(SimError::WorkloadParse {
            line: line_no,
            reason: format!("priority {priority} out of range [0, {MAX_PRIORITY}]"),
        });
    }

    Ok(ProcessSpec {
        id,
        arrival_time,
        runtime,
        priority,
        memsize,
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str, name: &str, line_no: usize) -> SimResult<T> {
    raw.parse().map_err(|_| SimError::WorkloadParse {
        line: line_no,
        reason: format!("invalid {name} value '{raw}'"),
    })
}

// ─── Random generator ───────────────────────────────────────────────

/// Generate `count` random descriptors with ids `1..=count`.
///
/// Ranges follow the original test generator: arrival in
/// `[0, 20)`, runtime in `[1, 20]`, priority in `[0, 10]`.
/// A seed makes the output reproducible.
pub fn generate(count: u32, seed: Option<u64>) -> Vec<ProcessSpec> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    (1..=count)
        .map(|id| ProcessSpec {
            id,
            arrival_time: rng.gen_range(0..GEN_ARRIVAL_BOUND),
            runtime: rng.gen_range(1..=GEN_RUNTIME_MAX),
            priority: rng.gen_range(0..=MAX_PRIORITY),
            memsize: 0,
        })
        .collect()
}

/// Write descriptors to `path` in the input format, header included.
pub fn write_file(path: &Path, specs: &[ProcessSpec]) -> SimResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "#id\tarrival\truntime\tpriority")?;
    for spec in specs {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            spec.id, spec.arrival_time, spec.runtime, spec.priority
        )?;
    }
    out.flush()?;
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tabular_input_with_comments() {
        let input = "#id\tarrival\truntime\tpriority\n\n1\t0\t5\t3\n2\t4\t2\t0\n";
        let mut workload = Workload::parse_str(input).unwrap();
        assert_eq!(workload.len(), 2);

        let first = workload.next_due(0).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.runtime, 5);
        assert_eq!(first.priority, 3);
        assert!(workload.next_due(0).is_none());

        let second = workload.next_due(4).unwrap();
        assert_eq!(second.id, 2);
        assert!(workload.is_exhausted());
    }

    #[test]
    fn accepts_optional_memsize_column() {
        let workload = Workload::parse_str("1\t0\t5\t3\t256\n").unwrap();
        assert_eq!(workload.len(), 1);
    }

    #[test]
    fn same_tick_arrivals_come_out_in_id_order() {
        // Deliberately out of id order in the file.
        let mut workload = Workload::parse_str("3 0 1 0\n1 0 1 0\n2 0 1 0\n").unwrap();
        let ids: Vec<u32> = std::iter::from_fn(|| workload.next_due(0).map(|s| s.id)).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_malformed_line() {
        let err = Workload::parse_str("1\t0\t5\n").unwrap_err();
        assert!(matches!(err, SimError::WorkloadParse { line: 1, .. }));
    }

    #[test]
    fn rejects_non_integer_field() {
        let err = Workload::parse_str("1\tzero\t5\t3\n").unwrap_err();
        assert!(matches!(err, SimError::WorkloadParse { line: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_priority() {
        let err = Workload::parse_str("1\t0\t5\t11\n").unwrap_err();
        assert!(matches!(err, SimError::WorkloadParse { line: 1, .. }));
    }

    #[test]
    fn rejects_zero_runtime() {
        let err = Workload::parse_str("1\t0\t0\t3\n").unwrap_err();
        assert!(matches!(err, SimError::WorkloadParse { line: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_id() {
        let err = Workload::parse_str("1\t0\t5\t3\n1\t2\t1\t0\n").unwrap_err();
        assert!(matches!(err, SimError::DuplicateId(1)));
    }

    #[test]
    fn error_reports_correct_line_number() {
        let err = Workload::parse_str("# header\n1\t0\t5\t3\nbogus line here x\n").unwrap_err();
        assert!(matches!(err, SimError::WorkloadParse { line: 3, .. }));
    }

    #[test]
    fn seeded_generation_is_reproducible_and_in_range() {
        let a = generate(50, Some(7));
        let b = generate(50, Some(7));
        assert_eq!(a, b);
        for (i, spec) in a.iter().enumerate() {
            assert_eq!(spec.id, i as u32 + 1);
            assert!(spec.arrival_time < GEN_ARRIVAL_BOUND);
            assert!((1..=GEN_RUNTIME_MAX).contains(&spec.runtime));
            assert!(spec.priority <= MAX_PRIORITY);
        }
    }

    #[test]
    fn generated_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processes.txt");
        let specs = generate(10, Some(1));
        write_file(&path, &specs).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#id\tarrival\truntime\tpriority\n"));

        let workload = Workload::load(&path).unwrap();
        assert_eq!(workload.len(), 10);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Workload::load(Path::new("/nonexistent/processes.txt")).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }
}
