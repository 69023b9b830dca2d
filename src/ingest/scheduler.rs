// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ingest::CancelFlag;
use crate::pipeline::{Pipeline, RunOptions};

const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Run the pipeline every `interval` until `cancel` is set.
///
/// A failed run is logged and the loop goes on; only cancellation stops it.
/// Returns the number of completed runs.
pub async fn run_forever(
    pipeline: Arc<Pipeline>,
    interval: Duration,
    opts: RunOptions,
    cancel: CancelFlag,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancelled(&cancel) => break,
        }
        match pipeline.run_once(&opts, &cancel).await {
            Ok(report) => {
                runs += 1;
                tracing::debug!(run = runs, created = report.created, "scheduled run done");
            }
            Err(e) => {
                tracing::error!(error = ?e, "pipeline run failed; retrying next tick");
            }
        }
        if cancel.is_cancelled() {
            break;
        }
    }
    tracing::info!(runs, "scheduler stopped");
    runs
}

async fn cancelled(cancel: &CancelFlag) {
    while !cancel.is_cancelled() {
        tokio::time::sleep(CANCEL_POLL).await;
    }
}
