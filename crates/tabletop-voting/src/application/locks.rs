//! Per-vote mutual exclusion.
//!
//! Ballots and expiry sweeps on the same vote serialize on one async mutex;
//! different votes never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

type Handle = Arc<tokio::sync::Mutex<()>>;

/// Registry of per-vote locks.
///
/// An entry lives only while some caller holds or waits on it. It is removed
/// when the last guard drops with no one else holding the handle, so a
/// caller arriving later always finds the same mutex as those still queued.
#[derive(Debug, Default)]
pub struct VoteLocks {
    handles: Mutex<HashMap<Uuid, Handle>>,
}

/// Exclusive access to one vote. Dropping it unlocks the vote.
#[derive(Debug)]
pub struct VoteGuard<'a> {
    locks: &'a VoteLocks,
    vote_id: Uuid,
    handle: Handle,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for VoteGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut handles = self
            .locks
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in this guard: nobody else is queued.
        if Arc::strong_count(&self.handle) == 2 {
            handles.remove(&self.vote_id);
        }
    }
}

impl VoteLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `vote_id`.
    pub async fn acquire(&self, vote_id: Uuid) -> VoteGuard<'_> {
        let handle = {
            let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(handles.entry(vote_id).or_default())
        };
        let guard = Arc::clone(&handle).lock_owned().await;
        VoteGuard {
            locks: self,
            vote_id,
            handle,
            guard: Some(guard),
        }
    }

    /// Number of votes with a live lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no vote currently has a live lock.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
