//! Serial and sharded replay of parsed jobs.
//!
//! Sharded mode gives every worker its own `DriftEngine` and routes each
//! instrument to exactly one worker, so per-instrument ordering is kept
//! without any shared state.

use anyhow::anyhow;
use drift_engine::{shard_for, DetectionThresholds, DriftConfig, DriftEngine, Severity};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info};

use crate::record::{Command, Job, OutputRecord};

/// Verdict counts over a replay.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub observations: u64,
    pub resets: u64,
    pub soft: u64,
    pub hard: u64,
}

impl Summary {
    pub fn record(&mut self, output: &OutputRecord) {
        self.observations += 1;
        match output.result.severity {
            Severity::Soft => self.soft += 1,
            Severity::Hard => self.hard += 1,
            Severity::None => {}
        }
    }
}

fn apply(
    engine: &mut DriftEngine,
    thresholds: &DetectionThresholds,
    job: Job,
) -> Option<OutputRecord> {
    match job.command {
        Command::Observe {
            instrument,
            channels,
        } => {
            let result = engine.observe(&instrument, channels, thresholds);
            Some(OutputRecord {
                seq: job.seq,
                instrument,
                result,
            })
        }
        Command::Reset { instrument } => {
            engine.reset_pair(&instrument);
            None
        }
    }
}

/// Replays `jobs` in order through a single engine.
pub fn run_serial(config: &DriftConfig, jobs: Vec<Job>) -> Vec<OutputRecord> {
    let mut engine = DriftEngine::new(config.engine.clone());
    jobs.into_iter()
        .filter_map(|job| apply(&mut engine, &config.thresholds, job))
        .collect()
}

/// Replays `jobs` across `shards` workers and returns outputs in input order.
pub async fn run_sharded(
    config: &DriftConfig,
    shards: usize,
    jobs: Vec<Job>,
) -> anyhow::Result<Vec<OutputRecord>> {
    let shards = shards.max(1);
    let (result_tx, mut result_rx) = unbounded_channel();

    let mut senders: Vec<UnboundedSender<Job>> = Vec::with_capacity(shards);
    let mut handles = Vec::with_capacity(shards);
    for shard in 0..shards {
        let (job_tx, mut job_rx) = unbounded_channel::<Job>();
        let result_tx = result_tx.clone();
        let mut engine = DriftEngine::new(config.engine.clone());
        let thresholds = config.thresholds.clone();

        handles.push(tokio::spawn(async move {
            let mut processed = 0u64;
            while let Some(job) = job_rx.recv().await {
                processed += 1;
                if let Some(output) = apply(&mut engine, &thresholds, job) {
                    if result_tx.send(output).is_err() {
                        break;
                    }
                }
            }
            debug!(
                shard,
                processed,
                instruments = engine.instrument_count(),
                "shard finished"
            );
        }));
        senders.push(job_tx);
    }
    drop(result_tx);

    for job in jobs {
        let shard = shard_for(job.command.instrument(), shards);
        senders[shard]
            .send(job)
            .map_err(|_| anyhow!("shard {shard} stopped unexpectedly"))?;
    }
    drop(senders);

    let mut outputs = Vec::new();
    while let Some(output) = result_rx.recv().await {
        outputs.push(output);
    }
    for handle in handles {
        handle.await?;
    }

    outputs.sort_by_key(|o| o.seq);
    info!(shards, outputs = outputs.len(), "sharded replay complete");
    Ok(outputs)
}
