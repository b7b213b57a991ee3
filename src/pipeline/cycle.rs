// src/pipeline/cycle.rs

//! One fetch → diff → dispatch → commit cycle.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CommitPolicy, MAX_EMBEDS_PER_MESSAGE, RelayConfig, Snapshot};
use crate::services::{Channel, SnapshotSource};
use crate::storage::SnapshotStore;

use super::batch::partition;
use super::diff::{DiffCalculator, ReportableEvent};
use super::fanout::{BatchDelivery, deliver};

/// What a completed cycle did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleReport {
    /// No previous snapshot; current stored as baseline, nothing sent
    Baseline { count: usize },
    /// Snapshot compared, nothing reportable
    NoChanges { count: usize },
    /// Events were dispatched
    Dispatched(DispatchSummary),
}

impl CycleReport {
    /// Number of reported postings.
    pub fn event_count(&self) -> usize {
        match self {
            Self::Dispatched(summary) => summary.events.len(),
            _ => 0,
        }
    }
}

/// Events and per-batch delivery outcomes of one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub events: Vec<ReportableEvent>,
    pub deliveries: Vec<BatchDelivery>,
}

impl DispatchSummary {
    /// Count of (batch, channel) attempts that failed.
    pub fn failed_deliveries(&self) -> usize {
        self.deliveries.iter().map(BatchDelivery::failed).sum()
    }

    pub fn batch_count(&self) -> usize {
        self.deliveries.len()
    }
}

/// Ties source, store, diff and channels together.
///
/// Cycles are serialized by an internal lock, so the store is never read
/// while another cycle is replacing it.
pub struct Relay {
    config: RelayConfig,
    diff: DiffCalculator,
    source: Arc<dyn SnapshotSource>,
    store: Arc<dyn SnapshotStore>,
    channels: Vec<Arc<dyn Channel>>,
    cycle_lock: Mutex<()>,
}

impl Relay {
    /// Build a relay.
    ///
    /// An empty channel set, or a batch size outside `1..=10`, is a
    /// configuration error.
    pub fn new(
        config: RelayConfig,
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn SnapshotStore>,
        channels: Vec<Arc<dyn Channel>>,
    ) -> Result<Self> {
        if channels.is_empty() {
            return Err(AppError::config("at least one delivery channel is required"));
        }
        if config.max_batch_size == 0 || config.max_batch_size > MAX_EMBEDS_PER_MESSAGE {
            return Err(AppError::config(format!(
                "max_batch_size must be between 1 and {}, got {}",
                MAX_EMBEDS_PER_MESSAGE, config.max_batch_size
            )));
        }
        Ok(Self {
            diff: DiffCalculator::new(config.include_reactivated),
            config,
            source,
            store,
            channels,
            cycle_lock: Mutex::new(()),
        })
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Run one full cycle.
    ///
    /// Fetch and commit failures are returned; channel failures are not,
    /// they are reported in the `DispatchSummary`. When an error is
    /// returned the stored snapshot is the one from before this cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _guard = self.cycle_lock.lock().await;

        let current = self.source.fetch().await?;
        let previous = self.store.load().await?;

        let result = self.diff.calculate(previous.as_ref(), &current);
        if result.is_baseline() {
            log::info!(
                "No previous snapshot. Storing {} postings as baseline without notifying",
                current.len()
            );
            self.commit(&current).await?;
            return Ok(CycleReport::Baseline {
                count: current.len(),
            });
        }

        if !result.has_events() {
            log::info!("No new postings among {}", current.len());
            self.commit(&current).await?;
            return Ok(CycleReport::NoChanges {
                count: current.len(),
            });
        }

        log::info!(
            "Found {} reportable postings ({} new, {} reactivated)",
            result.events.len(),
            result.new_count(),
            result.reactivated_count()
        );

        let events = result.events;
        let batches = partition(events.clone(), self.config.max_batch_size)?;

        if self.config.commit_policy == CommitPolicy::BeforeDelivery {
            self.commit(&current).await?;
        }

        let mut deliveries = Vec::with_capacity(batches.len());
        for batch in &batches {
            deliveries.push(deliver(batch, &self.channels).await);
        }

        let summary = DispatchSummary { events, deliveries };
        if summary.failed_deliveries() > 0 {
            log::warn!(
                "{} of {} deliveries failed this cycle",
                summary.failed_deliveries(),
                summary.batch_count() * self.channels.len()
            );
        }

        if self.config.commit_policy == CommitPolicy::AfterDelivery {
            self.commit(&current).await?;
        }

        Ok(CycleReport::Dispatched(summary))
    }

    async fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        self.store.replace(snapshot).await.map_err(|e| {
            log::error!(
                "Snapshot commit failed; postings will be re-evaluated next cycle: {}",
                e
            );
            if e.is_commit() {
                e
            } else {
                AppError::commit(e)
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted source and store doubles.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::models::{JobPosting, Snapshot};
    use crate::services::SnapshotSource;
    use crate::storage::{MemoryStorage, SnapshotStore};

    pub fn snap(entries: &[(&str, bool)]) -> Snapshot {
        entries
            .iter()
            .map(|(id, active)| JobPosting::new(*id, *active))
            .collect()
    }

    /// Source returning queued snapshots; `None` entries fail the fetch.
    /// The last entry repeats once the queue is drained.
    pub struct ScriptedSource {
        queue: Mutex<VecDeque<Option<Snapshot>>>,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Option<Snapshot>>) -> Self {
            Self {
                queue: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<Snapshot> {
            let mut queue = self.queue.lock().unwrap();
            let next = if queue.len() > 1 {
                queue.pop_front().flatten()
            } else {
                queue.front().cloned().flatten()
            };
            next.ok_or_else(|| AppError::fetch("scripted", "upstream unavailable"))
        }
    }

    /// Memory store whose writes can be switched off.
    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryStorage,
        pub fail_writes: AtomicBool,
    }

    impl FlakyStore {
        pub fn set_failing(&self, failing: bool) {
            self.fail_writes.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SnapshotStore for FlakyStore {
        async fn load(&self) -> Result<Option<Snapshot>> {
            self.inner.load().await
        }

        async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::commit("disk full"));
            }
            self.inner.replace(snapshot).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FlakyStore, ScriptedSource, snap};
    use super::*;
    use crate::pipeline::fanout::testing::RecordingChannel;
    use crate::storage::MemoryStorage;

    fn relay_config(include_reactivated: bool, max_batch_size: usize) -> RelayConfig {
        RelayConfig {
            include_reactivated,
            max_batch_size,
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_requires_channels() {
        let result = Relay::new(
            RelayConfig::default(),
            Arc::new(ScriptedSource::new(vec![Some(snap(&[]))])),
            Arc::new(MemoryStorage::new()),
            Vec::new(),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_batch_size_bounded_by_embed_limit() {
        for size in [0, MAX_EMBEDS_PER_MESSAGE + 1] {
            let result = Relay::new(
                relay_config(false, size),
                Arc::new(ScriptedSource::new(vec![Some(snap(&[]))])),
                Arc::new(MemoryStorage::new()),
                vec![Arc::new(RecordingChannel::ok("a"))],
            );
            assert!(matches!(result, Err(AppError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_baseline_then_new_posting() {
        let source = Arc::new(ScriptedSource::new(vec![
            Some(snap(&[("a", true)])),
            Some(snap(&[("a", true), ("b", true)])),
        ]));
        let store = Arc::new(MemoryStorage::new());
        let channel = Arc::new(RecordingChannel::ok("X"));
        let relay = Relay::new(
            RelayConfig::default(),
            source,
            store.clone(),
            vec![channel.clone()],
        )
        .unwrap();

        let first = relay.run_cycle().await.unwrap();
        assert!(matches!(first, CycleReport::Baseline { count: 1 }));
        assert!(channel.batches().is_empty());
        assert_eq!(store.load().await.unwrap(), Some(snap(&[("a", true)])));

        let second = relay.run_cycle().await.unwrap();
        assert_eq!(second.event_count(), 1);
        assert_eq!(channel.batches(), vec![vec!["b".to_string()]]);
        assert_eq!(store.load().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_rerun_reports_nothing() {
        let source = Arc::new(ScriptedSource::new(vec![Some(snap(&[("a", true), ("b", true)]))]));
        let store = Arc::new(MemoryStorage::with_snapshot(snap(&[("a", true)])));
        let channel = Arc::new(RecordingChannel::ok("X"));
        let relay = Relay::new(
            RelayConfig::default(),
            source,
            store,
            vec![channel.clone()],
        )
        .unwrap();

        assert_eq!(relay.run_cycle().await.unwrap().event_count(), 1);
        let again = relay.run_cycle().await.unwrap();
        assert!(matches!(again, CycleReport::NoChanges { count: 2 }));
        assert_eq!(channel.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_batches_in_order_to_every_channel() {
        let previous = snap(&[("seed", true)]);
        let current: Snapshot = std::iter::once(("seed".to_string(), true))
            .chain((0..20).map(|i| (format!("n{:02}", i), true)))
            .map(|(id, active)| crate::models::JobPosting::new(id, active))
            .collect();

        let x = Arc::new(RecordingChannel::ok("X"));
        let y = Arc::new(RecordingChannel::failing("Y"));
        let relay = Relay::new(
            relay_config(false, 9),
            Arc::new(ScriptedSource::new(vec![Some(current.clone())])),
            Arc::new(MemoryStorage::with_snapshot(previous)),
            vec![x.clone(), y.clone()],
        )
        .unwrap();

        let report = relay.run_cycle().await.unwrap();
        let CycleReport::Dispatched(summary) = report else {
            panic!("expected dispatch");
        };
        assert_eq!(summary.batch_count(), 3);
        assert_eq!(summary.failed_deliveries(), 3);

        let sizes: Vec<usize> = x.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![9, 9, 2]);
        assert_eq!(x.batches()[0][0], "n00");
        assert_eq!(x.batches()[2][1], "n19");
        // The failing channel was still attempted for every batch.
        assert_eq!(y.batches().len(), 3);
    }

    #[tokio::test]
    async fn test_reactivation_respects_config() {
        for (include, expected) in [(true, 1), (false, 0)] {
            let relay = Relay::new(
                relay_config(include, 9),
                Arc::new(ScriptedSource::new(vec![Some(snap(&[("a", true)]))])),
                Arc::new(MemoryStorage::with_snapshot(snap(&[("a", false)]))),
                vec![Arc::new(RecordingChannel::ok("X"))],
            )
            .unwrap();
            assert_eq!(relay.run_cycle().await.unwrap().event_count(), expected);
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let store = Arc::new(MemoryStorage::with_snapshot(snap(&[("a", true)])));
        let relay = Relay::new(
            RelayConfig::default(),
            Arc::new(ScriptedSource::new(vec![None])),
            store.clone(),
            vec![Arc::new(RecordingChannel::ok("X"))],
        )
        .unwrap();

        assert!(matches!(relay.run_cycle().await, Err(AppError::Fetch { .. })));
        assert_eq!(store.load().await.unwrap(), Some(snap(&[("a", true)])));
    }

    #[tokio::test]
    async fn test_commit_failure_after_delivery_rereports() {
        let store = Arc::new(FlakyStore::default());
        store.inner.replace(&snap(&[("a", true)])).await.unwrap();
        store.set_failing(true);

        let channel = Arc::new(RecordingChannel::ok("X"));
        let relay = Relay::new(
            RelayConfig::default(),
            Arc::new(ScriptedSource::new(vec![Some(snap(&[("a", true), ("b", true)]))])),
            store.clone(),
            vec![channel.clone()],
        )
        .unwrap();

        let err = relay.run_cycle().await.unwrap_err();
        assert!(err.is_commit());
        assert_eq!(channel.batches().len(), 1);
        assert_eq!(store.load().await.unwrap(), Some(snap(&[("a", true)])));

        // Next cycle sees the same event again rather than losing it.
        store.set_failing(false);
        assert_eq!(relay.run_cycle().await.unwrap().event_count(), 1);
        assert_eq!(channel.batches().len(), 2);
    }

    #[tokio::test]
    async fn test_commit_failure_before_delivery_sends_nothing() {
        let store = Arc::new(FlakyStore::default());
        store.inner.replace(&snap(&[("a", true)])).await.unwrap();
        store.set_failing(true);

        let channel = Arc::new(RecordingChannel::ok("X"));
        let config = RelayConfig {
            commit_policy: CommitPolicy::BeforeDelivery,
            ..RelayConfig::default()
        };
        let relay = Relay::new(
            config,
            Arc::new(ScriptedSource::new(vec![Some(snap(&[("a", true), ("b", true)]))])),
            store,
            vec![channel.clone()],
        )
        .unwrap();

        assert!(relay.run_cycle().await.unwrap_err().is_commit());
        assert!(channel.batches().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_cycles_do_not_double_report() {
        let channel = Arc::new(RecordingChannel::ok("X"));
        let relay = Arc::new(
            Relay::new(
                RelayConfig::default(),
                Arc::new(ScriptedSource::new(vec![Some(snap(&[("a", true), ("b", true)]))])),
                Arc::new(MemoryStorage::with_snapshot(snap(&[("a", true)]))),
                vec![channel.clone()],
            )
            .unwrap(),
        );

        let (r1, r2) = tokio::join!(relay.run_cycle(), relay.run_cycle());
        assert_eq!(r1.unwrap().event_count() + r2.unwrap().event_count(), 1);
        assert_eq!(channel.batches().len(), 1);
    }
}
