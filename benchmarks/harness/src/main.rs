//! evrace-bench-harness
//!
//! Run small end-to-end benchmarks (generate -> encode -> decode -> graph -> detect)
//! and append CSV rows into `benchmarks/reports/bench-<unix>.csv`.
//!
//! Usage examples:
//!   cargo run -p evrace-bench-harness -- --profile benchmarks/configs/profiles/small.toml
//!   cargo run -p evrace-bench-harness -- --profile benchmarks/configs/profiles/medium.toml --mode parallel

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Deserialize;

use evrace_core::{AnalysisOptions, RaceOptions};
use evrace_graph::build_happens_before;
use evrace_race::RaceDetector;
use evrace_trace::{
    decode::decode_log_bytes,
    encode::encode_log_to_vec,
    generator::{access_count, generate_log, GenParams},
};

#[derive(Debug, Deserialize)]
struct Profile {
    /// Events in the synthetic trace
    events: u32,
    /// Distinct variables
    vars: u32,
    /// Upper bound on accesses per event
    max_accesses: u32,
    /// Generator seed (each repeat adds its index)
    seed: u64,
    /// Repetitions of the whole pipeline
    repeats: u32,
}

#[derive(Clone, Copy, Debug)]
enum ModeSel {
    Sequential,
    Parallel,
}

fn parse_flag(name: &str, default: &str) -> String {
    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        if k == format!("--{name}") {
            return it.next().unwrap_or_else(|| default.to_string());
        }
    }
    default.to_string()
}

fn dur_us(d: Duration) -> u128 {
    d.as_micros()
}

fn main() -> Result<()> {
    let profile_path = PathBuf::from(parse_flag("profile", "benchmarks/configs/profiles/small.toml"));
    let mode_str = parse_flag("mode", "sequential");
    let mode = match mode_str.as_str() {
        "sequential" => ModeSel::Sequential,
        "parallel" => ModeSel::Parallel,
        other => anyhow::bail!("unknown --mode {other} (use sequential|parallel)"),
    };

    let profile_src = fs::read_to_string(&profile_path)
        .with_context(|| format!("read profile {}", profile_path.display()))?;
    let profile: Profile = toml::from_str(&profile_src).context("parse profile toml")?;
    println!(
        "Profile: events={}, vars={}, max_accesses={}, repeats={}, mode={mode_str}",
        profile.events, profile.vars, profile.max_accesses, profile.repeats
    );

    fs::create_dir_all("benchmarks/reports").context("create benchmarks/reports")?;

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let csv_path = PathBuf::from(format!("benchmarks/reports/bench-{ts}.csv"));
    let mut csv = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&csv_path)?;
    writeln!(csv, "timestamp,mode,events,vars,repeat,stage,us,extra")?;

    let mut opts = AnalysisOptions::default();
    opts.race = RaceOptions {
        parallel: matches!(mode, ModeSel::Parallel),
        ..RaceOptions::default()
    };

    for rep in 0..profile.repeats {
        let row_prefix = format!("{ts},{mode_str},{},{},{rep}", profile.events, profile.vars);

        // 1) generate trace
        let t0 = Instant::now();
        let log = generate_log(&GenParams {
            events: profile.events,
            vars: profile.vars,
            max_accesses: profile.max_accesses,
            seed: profile.seed + u64::from(rep),
            ..GenParams::default()
        })?;
        let t_gen = t0.elapsed();
        writeln!(
            csv,
            "{row_prefix},gen,{},accesses={}",
            dur_us(t_gen),
            access_count(&log)
        )?;

        // 2) encode to the binary layout
        let t0 = Instant::now();
        let bytes = encode_log_to_vec(&log)?;
        let t_enc = t0.elapsed();
        writeln!(csv, "{row_prefix},encode,{},bytes={}", dur_us(t_enc), bytes.len())?;

        // 3) decode it back
        let t0 = Instant::now();
        let decoded = decode_log_bytes(&bytes)?;
        let t_dec = t0.elapsed();
        writeln!(csv, "{row_prefix},decode,{},", dur_us(t_dec))?;

        // 4) build the happens-before graph
        let t0 = Instant::now();
        let (graph, gstats) = build_happens_before(&decoded.trace, &decoded.scopes, &opts);
        let t_graph = t0.elapsed();
        writeln!(
            csv,
            "{row_prefix},graph,{},edges={};dropped={}",
            dur_us(t_graph),
            gstats.final_edges,
            gstats.normalize.dropped
        )?;

        // 5) detect races
        let t0 = Instant::now();
        let races = RaceDetector::new(&decoded.trace, &graph, opts.race).detect();
        let t_detect = t0.elapsed();
        writeln!(
            csv,
            "{row_prefix},detect,{},races={}",
            dur_us(t_detect),
            races.len()
        )?;
    }

    println!("Wrote report → {}", csv_path.display());
    Ok(())
}
