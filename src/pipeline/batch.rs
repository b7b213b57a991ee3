//! Fixed-size windowing of reportable events.

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::JobPosting;

use super::diff::ReportableEvent;

/// A bounded, ordered group of events sent as one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    /// Position of this batch within the cycle, starting at 0
    pub index: usize,
    pub events: Vec<ReportableEvent>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportableEvent> {
        self.events.iter()
    }

    pub fn postings(&self) -> impl Iterator<Item = &JobPosting> {
        self.events.iter().map(|e| &e.posting)
    }
}

/// Split `events` into consecutive batches of at most `max_size`.
///
/// Order is preserved within and across batches; only the last batch may be
/// short. An empty input yields no batches.
pub fn partition(events: Vec<ReportableEvent>, max_size: usize) -> Result<Vec<Batch>> {
    if max_size == 0 {
        return Err(AppError::config("batch size must be at least 1"));
    }

    let mut batches = Vec::with_capacity(events.len().div_ceil(max_size));
    let mut iter = events.into_iter().peekable();
    while iter.peek().is_some() {
        let events: Vec<_> = iter.by_ref().take(max_size).collect();
        batches.push(Batch {
            index: batches.len(),
            events,
        });
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::diff::EventKind;

    fn events(count: usize) -> Vec<ReportableEvent> {
        (0..count)
            .map(|i| ReportableEvent {
                posting: JobPosting::new(format!("job_{:02}", i), true),
                kind: EventKind::New,
            })
            .collect()
    }

    #[test]
    fn test_twenty_into_nines() {
        let batches = partition(events(20), 9).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![9, 9, 2]);

        let flat: Vec<String> = batches
            .iter()
            .flat_map(|b| b.postings().map(|p| p.id.clone()))
            .collect();
        let expected: Vec<String> = (0..20).map(|i| format!("job_{:02}", i)).collect();
        assert_eq!(flat, expected);

        let indices: Vec<usize> = batches.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_input() {
        assert!(partition(Vec::new(), 9).unwrap().is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let batches = partition(events(18), 9).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 9));
    }

    #[test]
    fn test_size_one() {
        let batches = partition(events(3), 1).unwrap();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = partition(events(3), 0).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
