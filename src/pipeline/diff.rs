//! Diff calculation between listing snapshots.
//!
//! Decides which postings in the current snapshot are worth a notification:
//! ids never seen before, and optionally ids whose `active` flag flipped
//! from false to true. Postings that stayed active, stayed inactive, or were
//! closed are never reported.

use serde::Serialize;

use crate::models::{JobPosting, Snapshot};

/// Why a posting was selected for notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Id absent from the previous snapshot
    New,
    /// Id present before as inactive, now active
    Reactivated,
}

/// A posting from the current snapshot selected for delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportableEvent {
    pub posting: JobPosting,
    pub kind: EventKind,
}

/// Outcome of comparing two snapshots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// Reportable postings in current-snapshot order
    pub events: Vec<ReportableEvent>,
    /// No previous snapshot existed; current becomes the baseline
    pub baseline: bool,
    /// Duplicate ids collapsed out of the current snapshot
    pub duplicates_dropped: usize,
}

impl DiffResult {
    /// First-run result: nothing is reported.
    pub fn baseline() -> Self {
        Self {
            baseline: true,
            ..Self::default()
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn new_count(&self) -> usize {
        self.count(EventKind::New)
    }

    pub fn reactivated_count(&self) -> usize {
        self.count(EventKind::Reactivated)
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

/// Calculator for computing reportable postings between snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator {
    /// Report inactive -> active transitions
    include_reactivated: bool,
}

impl DiffCalculator {
    pub fn new(include_reactivated: bool) -> Self {
        Self {
            include_reactivated,
        }
    }

    /// Calculator that only reports never-seen ids.
    pub fn new_only() -> Self {
        Self::new(false)
    }

    /// Compare `current` against `previous`.
    ///
    /// `previous == None` means first run and yields a baseline result.
    /// Repeated ids in either snapshot resolve to their last occurrence.
    pub fn calculate(&self, previous: Option<&Snapshot>, current: &Snapshot) -> DiffResult {
        let Some(previous) = previous else {
            return DiffResult::baseline();
        };

        let prev_map = previous.by_id();
        let (current, duplicates_dropped) = current.deduplicated();

        let events = current
            .into_postings()
            .into_iter()
            .filter_map(|posting| {
                let kind = match prev_map.get(posting.id.as_str()) {
                    None => EventKind::New,
                    Some(prev) if self.include_reactivated && !prev.active && posting.active => {
                        EventKind::Reactivated
                    }
                    Some(_) => return None,
                };
                Some(ReportableEvent { posting, kind })
            })
            .collect();

        DiffResult {
            events,
            baseline: false,
            duplicates_dropped,
        }
    }
}

/// Convenience function returning only the reportable events.
pub fn compute_reportable(
    previous: Option<&Snapshot>,
    current: &Snapshot,
    include_reactivated: bool,
) -> Vec<ReportableEvent> {
    DiffCalculator::new(include_reactivated)
        .calculate(previous, current)
        .events
}
