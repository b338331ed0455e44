//! Vote deadlines and the periodic sweep that enforces them.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::coordinator::VotingCoordinator;

/// Index of vote deadlines.
///
/// Entries may outlive their vote: a vote resolved by ballots keeps its
/// deadline here, and the sweep skips it once drained.
pub trait ExpirySchedule: Send + Sync {
    /// Registers `vote_id` to be checked at `expires_at`.
    fn schedule(&self, vote_id: Uuid, expires_at: DateTime<Utc>);

    /// Removes and returns every vote whose deadline is at or before `now`,
    /// earliest first.
    fn drain_due(&self, now: DateTime<Utc>) -> Vec<Uuid>;

    /// The earliest pending deadline.
    fn next_deadline(&self) -> Option<DateTime<Utc>>;
}

/// Min-heap of deadlines. A tick costs time proportional to the number of
/// due votes rather than to every vote in the ledger.
#[derive(Debug, Default)]
pub struct DeadlineHeap {
    heap: Mutex<BinaryHeap<Reverse<(DateTime<Utc>, Uuid)>>>,
}

impl DeadlineHeap {
    /// Creates an empty schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending deadlines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no deadline is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExpirySchedule for DeadlineHeap {
    fn schedule(&self, vote_id: Uuid, expires_at: DateTime<Utc>) {
        self.heap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Reverse((expires_at, vote_id)));
    }

    fn drain_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let mut heap = self.heap.lock().unwrap_or_else(PoisonError::into_inner);
        let mut due = Vec::new();
        while let Some(Reverse((deadline, _))) = heap.peek() {
            if *deadline > now {
                break;
            }
            if let Some(Reverse((_, vote_id))) = heap.pop() {
                due.push(vote_id);
            }
        }
        due
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.heap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peek()
            .map(|Reverse((deadline, _))| *deadline)
    }
}

/// Background task resolving votes whose deadline has passed.
pub struct ExpirySweeper {
    coordinator: Arc<VotingCoordinator>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Creates a sweeper ticking every `interval`.
    #[must_use]
    pub fn new(coordinator: Arc<VotingCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// Runs until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis(), "starting absentee vote expiry sweeper");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("stopping absentee vote expiry sweeper");
                    break;
                }
                _ = ticker.tick() => {
                    let now = self.coordinator.now();
                    let resolved = self.coordinator.check_expirations(now).await;
                    if !resolved.is_empty() {
                        debug!(count = resolved.len(), "resolved expired absentee votes");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_drain_due_returns_due_votes_earliest_first() {
        let heap = DeadlineHeap::new();
        let (late, early, future) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        heap.schedule(late, at(5));
        heap.schedule(future, at(30));
        heap.schedule(early, at(1));

        let due = heap.drain_due(at(10));

        assert_eq!(due, vec![early, late]);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.next_deadline(), Some(at(30)));
    }

    #[test]
    fn test_drain_due_includes_deadline_equal_to_now() {
        let heap = DeadlineHeap::new();
        let vote_id = Uuid::new_v4();
        heap.schedule(vote_id, at(5));

        assert!(heap.drain_due(at(5) - TimeDelta::seconds(1)).is_empty());
        assert_eq!(heap.drain_due(at(5)), vec![vote_id]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_next_deadline_on_empty_schedule_is_none() {
        assert!(DeadlineHeap::new().next_deadline().is_none());
    }
}
