//! Drift Replay
//!
//! Replays a JSONL stream of per-instrument channel values through the drift
//! engine and writes one JSON result per observation to stdout.
//!
//! Usage:
//!   drift-replay <INPUT> [OPTIONS]
//!
//! Options:
//!   --config <PATH>   TOML file with [engine] and [thresholds] tables
//!   --shards <N>      Number of instrument shards processed in parallel (default: 1)
//!   --only-drift      Only print ticks where drift was detected

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use drift_engine::DriftConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::record::{parse_line, Job};
use crate::runner::{run_serial, run_sharded, Summary};

mod record;
mod runner;

#[derive(Parser, Debug)]
#[command(name = "drift-replay")]
#[command(about = "Replays per-instrument channel streams through the drift engine")]
struct Args {
    /// JSONL file with one observation per line
    input: PathBuf,

    /// TOML config with [engine] and [thresholds] tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of instrument shards processed in parallel
    #[arg(long, default_value = "1")]
    shards: usize,

    /// Only print ticks where drift was detected
    #[arg(long)]
    only_drift: bool,
}

/// Reads every command from a JSONL stream.
///
/// Unreadable lines (I/O errors, invalid UTF-8) and malformed records are
/// skipped with a warning.
fn read_jobs<R: BufRead>(reader: R) -> Vec<Job> {
    let mut jobs = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line_result) in reader.lines().enumerate() {
        let line = match line_result {
            Ok(line) => line,
            Err(error) => {
                skipped += 1;
                warn!(line = line_no + 1, %error, "skipping unreadable line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(command) => jobs.push(Job {
                seq: jobs.len() as u64,
                command,
            }),
            Err(error) => {
                skipped += 1;
                warn!(line = line_no + 1, %error, "skipping record");
            }
        }
    }
    info!(records = jobs.len(), skipped, "input loaded");
    jobs
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("drift_replay=info".parse()?)
                .add_directive("drift_engine=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DriftConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => DriftConfig::default(),
    };
    info!(
        window = config.engine.window,
        alpha = config.engine.smoothing_alpha,
        eviction = ?config.engine.eviction,
        min_samples = config.thresholds.min_samples,
        shards = args.shards,
        "starting replay"
    );

    let file = File::open(&args.input)
        .with_context(|| format!("cannot open {}", args.input.display()))?;
    let jobs = read_jobs(BufReader::new(file));
    let resets = jobs
        .iter()
        .filter(|job| matches!(job.command, record::Command::Reset { .. }))
        .count() as u64;

    let outputs = if args.shards > 1 {
        run_sharded(&config, args.shards, jobs).await?
    } else {
        run_serial(&config, jobs)
    };

    let mut summary = Summary {
        resets,
        ..Summary::default()
    };
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for output in &outputs {
        summary.record(output);
        if args.only_drift && !output.result.drift_detected {
            continue;
        }
        serde_json::to_writer(&mut out, output)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!(
        observations = summary.observations,
        resets = summary.resets,
        soft = summary.soft,
        hard = summary.hard,
        "replay finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::record::Command;

    #[test]
    fn test_read_jobs_skips_invalid_utf8_line() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"instrument\": \"A\", \"channels\": {\"vol\": 1.0}}\n");
        input.extend_from_slice(b"\xff\xfe not text\n");
        input.extend_from_slice(b"{\"instrument\": \"B\", \"channels\": {\"vol\": 2.0}}\n");

        let jobs = read_jobs(Cursor::new(input));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].seq, 1);
        assert!(matches!(
            &jobs[1].command,
            Command::Observe { instrument, .. } if instrument == "B"
        ));
    }

    #[test]
    fn test_read_jobs_skips_malformed_and_blank_lines() {
        let input = "\nnot json\n{\"instrument\": \"A\", \"reset\": true}\n";
        let jobs = read_jobs(Cursor::new(input));
        assert_eq!(jobs.len(), 1);
        assert!(matches!(&jobs[0].command, Command::Reset { instrument } if instrument == "A"));
    }
}
