//! False-sharing cache simulator CLI.
//!
//! This binary replays a recorded memory access trace over a simulated
//! multi-core topology. It performs:
//! 1. **Replay:** Builds one private cache per core and delivers each core's operations on its own thread.
//! 2. **Reporting:** Prints the per-cache classification report and the ranked interference table, or JSON.
//! 3. **Conflict export:** Writes layout-repair records, resolving addresses through an optional symbol table.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fshare_core::common::{CacheType, ConfigError, TraceError};
use fshare_core::config::SimConfig;
use fshare_core::conflict::{self, CacheLineEntry};
use fshare_core::sim::trace::parse_number;
use fshare_core::sim::{Topology, TraceOp, load_trace};
use fshare_core::InterferenceCounts;

#[derive(Parser, Debug)]
#[command(
    name = "fsim",
    author,
    version,
    about = "Multi-core cache simulator for false-sharing detection",
    long_about = "Replay a memory access trace over per-core caches and report false sharing.\n\nTrace lines are `<core> <L|S|I> <addr> [size]`.\n\nExamples:\n  fsim run --trace app.trace\n  fsim run --trace app.trace --config cache.json --cores 8 --json\n  fsim run --trace app.trace --symbols app.syms --conflicts-out conflicts.txt"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace and report cache behaviour and interference.
    Run {
        /// Access trace to replay.
        #[arg(short, long)]
        trace: PathBuf,

        /// JSON simulator configuration (defaults apply to missing fields).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of simulated cores.
        #[arg(long)]
        cores: Option<usize>,

        /// Report caches as instruction caches (totals only).
        #[arg(long)]
        instruction: bool,

        /// Symbol table (`<name> <start> <size>` per line) used to name conflicting addresses.
        #[arg(long)]
        symbols: Option<PathBuf>,

        /// Write conflict records for layout repair to this file.
        #[arg(long)]
        conflicts_out: Option<PathBuf>,

        /// Print a JSON summary instead of text reports.
        #[arg(long)]
        json: bool,
    },
}

/// Everything that can stop a run.
#[derive(Debug, Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{}: {source}", path.display())]
    Trace { path: PathBuf, source: TraceError },

    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}: line {line}: {reason}", path.display())]
    Symbols {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to render summary: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            trace,
            config,
            cores,
            instruction,
            symbols,
            conflicts_out,
            json,
        } => cmd_run(&RunArgs {
            trace,
            config,
            cores,
            cache_type: if instruction {
                CacheType::Instruction
            } else {
                CacheType::Data
            },
            symbols,
            conflicts_out,
            json,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Options of the `run` subcommand.
struct RunArgs {
    trace: PathBuf,
    config: Option<PathBuf>,
    cores: Option<usize>,
    cache_type: CacheType,
    symbols: Option<PathBuf>,
    conflicts_out: Option<PathBuf>,
    json: bool,
}

/// Loads the configuration and trace, replays it, and prints the results.
fn cmd_run(args: &RunArgs) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    if let Some(cores) = args.cores {
        config.cores = cores;
    }

    let topology = Topology::from_config(&config)?;
    let ops = load_trace(&args.trace).map_err(|source| CliError::Trace {
        path: args.trace.clone(),
        source,
    })?;

    info!(
        trace = %args.trace.display(),
        cores = config.cores,
        operations = ops.len(),
        "replaying trace"
    );
    let replay = topology.run(&ops).map_err(|source| CliError::Trace {
        path: args.trace.clone(),
        source,
    })?;

    let interference = topology.interference_counts();

    if args.json {
        println!("{}", topology.summary_json()?);
    } else {
        print!("{}", topology.report(args.cache_type));
        println!(
            "Replayed {} operations, {} clean hits.\n",
            replay.operations, replay.hits
        );
        print_interference(&interference);
    }

    if let Some(out) = &args.conflicts_out {
        let symbols = match &args.symbols {
            Some(path) => load_symbols(path)?,
            None => Vec::new(),
        };
        let widths = access_widths(&ops);
        let conflicts = conflict::conflicts_from_interference(&interference, |addr| {
            resolve(&symbols, &widths, addr)
        });

        let file = File::create(out).map_err(|source| CliError::Io {
            path: out.clone(),
            source,
        })?;
        conflict::write_conflicts(BufWriter::new(file), &conflicts).map_err(|source| {
            CliError::Io {
                path: out.clone(),
                source,
            }
        })?;
        info!(records = conflicts.len(), out = %out.display(), "conflicts written");
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<SimConfig, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ConfigFile {
        path: path.to_owned(),
        source,
    })
}

/// Prints the interference table, most frequent pair first.
fn print_interference(counts: &InterferenceCounts) {
    if counts.is_empty() {
        println!("No interference detected.");
        return;
    }

    println!("Interference ({} pairs, {} collisions):", counts.len(), counts.total());
    println!("{:>18}  {:>18}  {:>8}  {:>12}", "lower", "upper", "distance", "count");
    for (key, count) in counts.ranked() {
        println!(
            "{:>#18x}  {:>#18x}  {:>8}  {:>12}",
            key.lower,
            key.upper,
            key.distance(),
            count
        );
    }
}

/// One entry of a symbol table.
#[derive(Debug)]
struct Symbol {
    name: String,
    start: u64,
    size: u64,
}

/// Reads a symbol table: `<name> <start> <size>` per line, `#` comments allowed.
fn load_symbols(path: &Path) -> Result<Vec<Symbol>, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;

    let mut symbols = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let fail = |reason: &str| CliError::Symbols {
            path: path.to_owned(),
            line: index + 1,
            reason: reason.to_owned(),
        };

        let fields: Vec<&str> = content.split_whitespace().collect();
        let [name, start, size] = fields.as_slice() else {
            return Err(fail("expected `<name> <start> <size>`"));
        };
        symbols.push(Symbol {
            name: (*name).to_owned(),
            start: parse_number(start).ok_or_else(|| fail("invalid start address"))?,
            size: parse_number(size).ok_or_else(|| fail("invalid size"))?,
        });
    }

    symbols.sort_by_key(|symbol| symbol.start);
    Ok(symbols)
}

/// Widest access seen at each address of the trace.
fn access_widths(ops: &[TraceOp]) -> HashMap<u64, u64> {
    let mut widths = HashMap::new();
    for op in ops {
        let width = u64::from(op.size.unwrap_or(1));
        let entry = widths.entry(op.addr).or_insert(width);
        *entry = (*entry).max(width);
    }
    widths
}

/// Names `addr` by the symbol containing it, or by the address itself when
/// no symbol table was given.
fn resolve(symbols: &[Symbol], widths: &HashMap<u64, u64>, addr: u64) -> Option<CacheLineEntry> {
    let size = widths.get(&addr).copied().unwrap_or(1);
    if symbols.is_empty() {
        return Some(CacheLineEntry {
            variable: format!("{addr:#x}"),
            offset: 0,
            size,
        });
    }

    let index = symbols.partition_point(|symbol| symbol.start <= addr);
    let symbol = symbols.get(index.checked_sub(1)?)?;
    (addr - symbol.start < symbol.size).then(|| CacheLineEntry {
        variable: symbol.name.clone(),
        offset: addr - symbol.start,
        size,
    })
}
