//! Pipeline stages of a relay cycle.
//!
//! - `diff`: select new and reactivated postings
//! - `batch`: split them into message-sized groups
//! - `fanout`: deliver a group to every channel
//! - `cycle`: fetch → diff → dispatch → commit
//! - `poll`: run cycles on an interval until shutdown

pub mod batch;
pub mod cycle;
pub mod diff;
pub mod fanout;
pub mod poll;

pub use batch::{Batch, partition};
pub use cycle::{CycleReport, DispatchSummary, Relay};
pub use diff::{DiffCalculator, DiffResult, EventKind, ReportableEvent, compute_reportable};
pub use fanout::{BatchDelivery, ChannelOutcome, DeliveryStatus, deliver};
pub use poll::{PollStats, run_once, run_polling};
