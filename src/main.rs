//! # schedsim Binary
//!
//! CPU scheduler simulator: replays a workload of processes under a
//! classical scheduling policy and writes the event log and final
//! performance metrics.
//!
//! # Usage
//!
//! ```bash
//! # SRTN over a workload file
//! schedsim run -f processes.txt -a 2
//!
//! # RR with quantum 4, verbose tracing
//! schedsim run -f processes.txt -a 3 -q 4 -v
//!
//! # Generate a reproducible 20-process workload
//! schedsim gen -n 20 --seed 7 -o processes.txt
//! ```

#![deny(warnings)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use schedsim::config::RunConfig;
use schedsim::engine::Engine;
use schedsim::error::{SimError, SimResult};
use schedsim::ready::Policy;
use schedsim::sink::{self, EventLog};
use schedsim::workload::{self, Workload};

/// schedsim - discrete-event CPU scheduler simulator
#[derive(Parser, Debug)]
#[command(name = "schedsim")]
#[command(version)]
#[command(about = "Discrete-event CPU scheduler simulator (HPF / SRTN / RR)")]
#[command(long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a workload through the scheduler
    Run {
        /// Workload input file
        #[arg(short = 'f', long)]
        workload: Option<PathBuf>,

        /// Algorithm code: 1 = HPF, 2 = SRTN, 3 = RR
        #[arg(short, long)]
        algorithm: Option<u8>,

        /// Time quantum in ticks (RR only)
        #[arg(short, long)]
        quantum: Option<u64>,

        /// Optional TOML run configuration; flags override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Event log output path
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Metrics output path
        #[arg(long)]
        perf_file: Option<PathBuf>,

        /// Wall-clock milliseconds to pause per tick
        #[arg(long)]
        tick_millis: Option<u64>,
    },
    /// Generate a random workload file
    Gen {
        /// Number of processes
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,

        /// RNG seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Output path
        #[arg(short, long, default_value = "processes.txt")]
        output: PathBuf,
    },
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(e) = run(args) {
        error!("schedsim failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> SimResult<()> {
    match args.command {
        Command::Run {
            workload,
            algorithm,
            quantum,
            config,
            log_file,
            perf_file,
            tick_millis,
        } => cmd_run(
            workload, algorithm, quantum, config, log_file, perf_file, tick_millis,
        ),
        Command::Gen {
            count,
            seed,
            output,
        } => cmd_gen(count, seed, &output),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    workload: Option<PathBuf>,
    algorithm: Option<u8>,
    quantum: Option<u64>,
    config: Option<PathBuf>,
    log_file: Option<PathBuf>,
    perf_file: Option<PathBuf>,
    tick_millis: Option<u64>,
) -> SimResult<()> {
    let mut cfg = match config {
        Some(path) => RunConfig::load(&path)?,
        None => RunConfig::default(),
    };

    // CLI flags override config file values.
    if let Some(a) = algorithm {
        cfg.algorithm = Some(a);
    }
    if let Some(q) = quantum {
        cfg.quantum = Some(q);
    }
    if let Some(w) = workload {
        cfg.workload = Some(w);
    }
    if let Some(l) = log_file {
        cfg.log_path = l;
    }
    if let Some(p) = perf_file {
        cfg.perf_path = p;
    }
    if let Some(t) = tick_millis {
        cfg.tick_millis = t;
    }
    cfg.validate()?;

    let code = cfg
        .algorithm
        .ok_or_else(|| SimError::Config("no algorithm selected (use -a 1|2|3)".to_string()))?;
    let policy = Policy::from_code(code, cfg.quantum)?;

    let workload_path = cfg
        .workload
        .ok_or_else(|| SimError::Config("no workload file (use -f <file>)".to_string()))?;
    let workload = Workload::load(&workload_path)?;
    info!(
        policy = policy.name(),
        processes = workload.len(),
        file = %workload_path.display(),
        "workload loaded"
    );

    let log = EventLog::create(&cfg.log_path)?;

    let abort = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&abort);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .map_err(|e| SimError::Config(format!("cannot install signal handler: {e}")))?;
    }

    let mut engine = Engine::new(policy, workload, log).with_abort_flag(abort);
    if cfg.tick_millis > 0 {
        engine = engine.with_tick_pause(Duration::from_millis(cfg.tick_millis));
    }

    let metrics = engine.run()?;
    sink::write_metrics_file(&cfg.perf_path, &metrics)?;
    info!(
        log = %cfg.log_path.display(),
        perf = %cfg.perf_path.display(),
        "outputs written"
    );
    Ok(())
}

fn cmd_gen(count: u32, seed: Option<u64>, output: &Path) -> SimResult<()> {
    if count == 0 {
        return Err(SimError::Config(
            "number of processes must be positive".to_string(),
        ));
    }
    let specs = workload::generate(count, seed);
    workload::write_file(output, &specs)?;
    info!(count, output = %output.display(), "workload generated");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
