// crates/evrace-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use evrace_core::{io::write_auto, AnalysisOptions, TraceLog};
use evrace_graph::export::{to_dot, GraphExport};
use evrace_race::{
    analysis::LoadedTrace,
    dump::{dump_log, write_races},
    io::{write_report_auto, RaceDocument},
};
use evrace_trace::{
    generator::{generate_log, GenParams},
    io::{read_log_auto, write_log_auto},
};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "evrace",
    about = "Event-trace race detector",
    long_about = "Event-trace race detector.\n\nLoads recorded event traces, builds the happens-before graph and reports unordered conflicting memory accesses.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print every event and its commands (one block per input file).
    Dump {
        /// Trace files (binary, or `.json`/`.cbor` envelopes)
        #[arg(required = true)]
        traces: Vec<PathBuf>,
    },

    /// Detect races and print one line per race.
    Races {
        /// Trace file
        trace: PathBuf,

        /// Also write a report (JSON/CBOR by extension)
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Export the final happens-before graph.
    Graph {
        /// Trace file
        trace: PathBuf,

        /// Output path; `.dot` writes Graphviz, `.json`/`.cbor` an edge list
        #[arg(long, default_value = "graph.dot")]
        out: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Generate a deterministic synthetic trace.
    Simulate {
        /// Number of events
        #[arg(long, default_value_t = 32)]
        events: u32,

        /// Number of distinct variables (>0)
        #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
        vars: u32,

        /// Maximum memory accesses per event
        #[arg(long, default_value_t = 4)]
        max_accesses: u32,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output path (binary unless `.json`/`.cbor`)
        #[arg(long, default_value = "trace.evlog")]
        out: PathBuf,
    },

    /// Print trace, graph and detection statistics.
    Stats {
        /// Trace file
        trace: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = StatsFormat::Text)]
        format: StatsFormat,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum StatsFormat {
    Text,
    Json,
}

/// Analysis knobs shared by the analysing subcommands.
///
/// Precedence: defaults < `--config` TOML < `EVRACE_*` env < these flags.
#[derive(Args, Debug)]
struct AnalysisArgs {
    /// TOML options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the independent-exploration ordering pass
    #[arg(long)]
    no_exploration: bool,

    /// Disable timer delay ordering
    #[arg(long)]
    no_timers: bool,

    /// Detect variables in parallel
    #[arg(long)]
    parallel: bool,

    /// Keep one race per (variable, event pair)
    #[arg(long)]
    one_per_pair: bool,
}

impl AnalysisArgs {
    fn resolve(&self) -> Result<AnalysisOptions> {
        let mut opts = match &self.config {
            Some(path) => AnalysisOptions::load_toml(path)?,
            None => AnalysisOptions::default(),
        }
        .with_env();
        if self.no_exploration {
            opts.normalize.independent_exploration = false;
        }
        if self.no_timers {
            opts.timers.enabled = false;
        }
        if self.parallel {
            opts.race.parallel = true;
        }
        if self.one_per_pair {
            opts.race.one_per_event_pair = true;
        }
        Ok(opts)
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Dump { traces } => dump(&traces),
        Cmd::Races {
            trace,
            out,
            analysis,
        } => races(&trace, out.as_deref(), &analysis.resolve()?),
        Cmd::Graph {
            trace,
            out,
            analysis,
        } => graph(&trace, &out, &analysis.resolve()?),
        Cmd::Simulate {
            events,
            vars,
            max_accesses,
            seed,
            out,
        } => simulate(
            &GenParams {
                events,
                vars,
                max_accesses,
                seed,
                ..GenParams::default()
            },
            &out,
        ),
        Cmd::Stats {
            trace,
            format,
            analysis,
        } => stats(&trace, format, &analysis.resolve()?),
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn read_trace(path: &Path) -> Result<TraceLog> {
    read_log_auto(path).with_context(|| format!("loading trace {}", path.display()))
}

fn analyse(path: &Path, opts: &AnalysisOptions) -> Result<LoadedTrace> {
    let log = read_trace(path)?;
    info!(trace=%path.display(), events = log.trace.event_count(), "analysing");
    Ok(LoadedTrace::from_log(log, opts))
}

fn dump(traces: &[PathBuf]) -> Result<()> {
    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    for path in traces {
        let log = read_trace(path)?;
        dump_log(&log, &mut w).context("writing dump")?;
    }
    w.flush()?;
    Ok(())
}

fn races(path: &Path, out: Option<&Path>, opts: &AnalysisOptions) -> Result<()> {
    let t = analyse(path, opts)?;

    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    write_races(&t, &mut w).context("writing races")?;
    writeln!(w, "{} race(s) in {} event(s)", t.race_count(), t.event_count())?;
    w.flush()?;

    if let Some(out) = out {
        write_report_auto(out, &RaceDocument::from_trace(&t, Some(path)))
            .with_context(|| format!("writing report to {}", out.display()))?;
        info!(out=%out.display(), "report written");
    }
    Ok(())
}

fn graph(path: &Path, out: &Path, opts: &AnalysisOptions) -> Result<()> {
    let t = analyse(path, opts)?;
    let g = t.graph().graph();

    let is_dot = evrace_core::io::ext_lower(out).as_deref() == Some("dot");
    if is_dot {
        evrace_core::io::ensure_parent_dir(out)?;
        std::fs::write(out, to_dot(g)).with_context(|| format!("write {}", out.display()))?;
    } else {
        write_auto(out, &GraphExport::from(g), "graph export")?;
    }

    println!(
        "Graph: {} nodes, {} edges, {} dropped → {}",
        g.node_count(),
        g.edge_count(),
        g.dropped().count(),
        out.display()
    );
    Ok(())
}

fn simulate(params: &GenParams, out: &Path) -> Result<()> {
    info!(events = params.events, vars = params.vars, seed = params.seed, "generating synthetic trace");
    let log = generate_log(params).context("generating trace")?;
    write_log_auto(out, &log).with_context(|| format!("writing trace to {}", out.display()))?;
    println!(
        "Simulated trace: {} events, {} arcs → {}",
        log.trace.event_count(),
        log.trace.arcs().len(),
        out.display()
    );
    Ok(())
}

fn stats(path: &Path, format: StatsFormat, opts: &AnalysisOptions) -> Result<()> {
    let t = analyse(path, opts)?;
    let s = t.stats();
    match format {
        StatsFormat::Json => {
            let json = serde_json::to_string_pretty(s).context("serialize stats")?;
            println!("{json}");
        }
        StatsFormat::Text => {
            println!("events:       {}", s.trace.events);
            println!("commands:     {}", s.trace.commands);
            for (kind, n) in &s.trace.commands_by_kind {
                println!("  {kind:?}: {n}");
            }
            for (ty, n) in &s.trace.events_by_type {
                println!("  {ty}: {n}");
            }
            println!("arcs:         {} ({} timed)", s.trace.arcs, s.trace.timed_arcs);
            println!("seeded edges: {}", s.graph.seeded_edges);
            println!("dropped:      {}", s.graph.normalize.dropped);
            println!(
                "added edges:  exploration {}, script/resource {}, target {}, timers {}",
                s.graph.normalize.exploration_edges,
                s.graph.normalize.script_resource_edges,
                s.graph.normalize.target_edges,
                s.graph.timers.edges_added
            );
            println!("final edges:  {}", s.graph.final_edges);
            println!("races:        {}", s.races);
            println!("time:         graph {} µs, detect {} µs", s.graph_micros, s.detect_micros);
        }
    }
    Ok(())
}
