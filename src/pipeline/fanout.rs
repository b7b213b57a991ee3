//! Delivery of one batch to every configured channel.
//!
//! Each channel is attempted independently and concurrently. A failing
//! channel never prevents or cancels the others, and the caller always gets
//! one outcome per channel rather than an error.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::services::Channel;

use super::batch::Batch;

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Delivery outcome for one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    pub status: DeliveryStatus,
}

/// Per-channel outcomes for one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchDelivery {
    pub batch_index: usize,
    pub batch_size: usize,
    pub outcomes: Vec<ChannelOutcome>,
}

impl BatchDelivery {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_delivered(&self) -> bool {
        self.failed() == 0
    }

    /// Outcome for a channel by name.
    pub fn outcome(&self, channel: &str) -> Option<&DeliveryStatus> {
        self.outcomes
            .iter()
            .find(|o| o.channel == channel)
            .map(|o| &o.status)
    }
}

/// Attempt to deliver `batch` on every channel.
///
/// Outcomes are returned in channel order. Failures are logged here and
/// not retried.
pub async fn deliver(batch: &Batch, channels: &[Arc<dyn Channel>]) -> BatchDelivery {
    let attempts = channels.iter().map(|channel| async move {
        let status = match channel.send(batch).await {
            Ok(()) => {
                log::debug!(
                    "Batch {} ({} postings) delivered to {}",
                    batch.index,
                    batch.len(),
                    channel.name()
                );
                DeliveryStatus::Delivered
            }
            Err(e) => {
                log::warn!(
                    "Batch {} ({} postings) failed on {}: {}",
                    batch.index,
                    batch.len(),
                    channel.name(),
                    e
                );
                DeliveryStatus::Failed(e.to_string())
            }
        };
        ChannelOutcome {
            channel: channel.name().to_string(),
            status,
        }
    });

    BatchDelivery {
        batch_index: batch.index,
        batch_size: batch.len(),
        outcomes: join_all(attempts).await,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording channels for pipeline tests.

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{AppError, Result};
    use crate::services::Channel;

    use super::Batch;

    /// Channel that records every batch it receives and optionally fails.
    pub struct RecordingChannel {
        name: String,
        fail: bool,
        pub received: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingChannel {
        pub fn ok(name: &str) -> Self {
            Self {
                name: name.to_string(),
                fail: false,
                received: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::ok(name)
            }
        }

        /// Ids of every attempted batch, in arrival order.
        pub fn batches(&self) -> Vec<Vec<String>> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn send(&self, batch: &Batch) -> Result<()> {
            let ids = batch.postings().map(|p| p.id.clone()).collect();
            self.received.lock().unwrap().push(ids);
            if self.fail {
                return Err(AppError::delivery(&self.name, "HTTP 500"));
            }
            Ok(())
        }
    }
}
