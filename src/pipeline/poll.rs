// src/pipeline/poll.rs

//! Periodic polling loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Result;

use super::cycle::{CycleReport, Relay};

/// Counters for a polling session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub events: usize,
}

/// Run one cycle and log what happened.
pub async fn run_once(relay: &Relay) -> Result<CycleReport> {
    log::info!("Checking for new postings");
    let report = relay.run_cycle().await?;
    log_report(&report);
    Ok(report)
}

/// Run cycles every `interval` until `shutdown` is cancelled.
///
/// A failed cycle is logged and the loop carries on at the next tick.
/// Cancellation is only observed while waiting, never during a cycle, so
/// a commit always reflects a fully attempted dispatch.
pub async fn run_polling(
    relay: &Relay,
    interval: Duration,
    shutdown: CancellationToken,
) -> PollStats {
    let mut stats = PollStats::default();
    log::info!(
        "Polling every {}s, delivering to {} channel(s)",
        interval.as_secs(),
        relay.channel_names().len()
    );

    while !shutdown.is_cancelled() {
        stats.cycles += 1;
        match run_once(relay).await {
            Ok(report) => stats.events += report.event_count(),
            Err(e) => {
                stats.failed_cycles += 1;
                log::error!("Cycle {} failed: {}", stats.cycles, e);
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    log::info!(
        "Polling stopped after {} cycle(s), {} posting(s) reported",
        stats.cycles,
        stats.events
    );
    stats
}

fn log_report(report: &CycleReport) {
    match report {
        CycleReport::Baseline { count } => {
            log::info!("Baseline stored ({} postings)", count)
        }
        CycleReport::NoChanges { .. } => log::info!("No new postings"),
        CycleReport::Dispatched(summary) => {
            let failed = summary.failed_deliveries();
            if failed == 0 {
                log::info!(
                    "Reported {} posting(s) in {} batch(es)",
                    summary.events.len(),
                    summary.batch_count()
                );
            } else {
                log::warn!(
                    "Reported {} posting(s) in {} batch(es); {} delivery attempt(s) failed",
                    summary.events.len(),
                    summary.batch_count(),
                    failed
                );
            }
        }
    }
}
