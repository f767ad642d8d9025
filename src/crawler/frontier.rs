//! Frontier and dedup set
//!
//! A single mutex guards the seen-map, the pending queue and the in-flight
//! count, so "not seen yet, admit it" is one atomic step no matter how many
//! workers discover the same link. The lock is never held across an await.

use crate::url::CanonicalUrl;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// How many pending entries `take_where` inspects per call
const SCAN_WINDOW: usize = 256;

/// Lifecycle of an admitted URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Waiting in the queue
    Pending,
    /// Taken by a worker
    InFlight,
    /// Processed, successfully or not
    Done,
}

/// Result of asking the frontier for work
#[derive(Debug)]
pub enum Take {
    /// A URL is now in flight for the caller
    Ready(CanonicalUrl),
    /// Work exists or may appear, but nothing is takeable right now
    Blocked,
    /// Nothing pending and nothing in flight
    Drained,
    /// The frontier was closed
    Closed,
}

#[derive(Debug, Default)]
struct Inner {
    seen: HashMap<String, EntryState>,
    pending: VecDeque<CanonicalUrl>,
    in_flight: usize,
    closed: bool,
    completed: u64,
}

/// Pending and in-flight URLs plus every key ever admitted
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits a URL unless its key was seen before or the frontier is closed
    ///
    /// # Returns
    ///
    /// * `true` - The URL is new and now pending
    /// * `false` - Already seen, or closed
    pub fn admit(&self, url: CanonicalUrl) -> bool {
        {
            let mut inner = self.lock();
            if inner.closed || inner.seen.contains_key(url.key()) {
                return false;
            }
            inner.seen.insert(url.key().to_string(), EntryState::Pending);
            inner.pending.push_back(url);
        }
        self.notify.notify_waiters();
        true
    }

    /// Takes the oldest pending URL
    pub fn take(&self) -> Option<CanonicalUrl> {
        match self.take_where(|_| true) {
            Take::Ready(url) => Some(url),
            _ => None,
        }
    }

    /// Takes the oldest pending URL accepted by `ready`
    ///
    /// `ready` runs under the frontier lock and may reserve resources for
    /// the URL it accepts; it is called for at most a bounded window of
    /// pending entries, oldest first, and stops at the first acceptance.
    pub fn take_where<P>(&self, mut ready: P) -> Take
    where
        P: FnMut(&CanonicalUrl) -> bool,
    {
        let mut inner = self.lock();

        if inner.closed {
            return Take::Closed;
        }

        if inner.pending.is_empty() {
            return if inner.in_flight == 0 {
                Take::Drained
            } else {
                Take::Blocked
            };
        }

        let window = inner.pending.len().min(SCAN_WINDOW);
        let Some(index) = (0..window).find(|&i| ready(&inner.pending[i])) else {
            return Take::Blocked;
        };

        let Some(url) = inner.pending.remove(index) else {
            return Take::Blocked;
        };
        inner.seen.insert(url.key().to_string(), EntryState::InFlight);
        inner.in_flight += 1;
        Take::Ready(url)
    }

    /// Marks an in-flight URL as done and wakes waiting workers
    pub fn complete(&self, url: &CanonicalUrl) {
        {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if let Some(state) = inner.seen.get_mut(url.key()) {
                if *state == EntryState::InFlight {
                    *state = EntryState::Done;
                    inner.in_flight -= 1;
                    inner.completed += 1;
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Whether the queue is empty and no URL is in flight
    pub fn is_drained(&self) -> bool {
        let inner = self.lock();
        inner.pending.is_empty() && inner.in_flight == 0
    }

    /// Stops all further admission and taking; wakes every waiter
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// State of a key, if it was ever admitted
    pub fn status(&self, key: &str) -> Option<EntryState> {
        self.lock().seen.get(key).copied()
    }

    /// Whether a key was ever admitted
    pub fn contains(&self, key: &str) -> bool {
        self.lock().seen.contains_key(key)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of distinct keys ever admitted
    pub fn seen_len(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn completed(&self) -> u64 {
        self.lock().completed
    }

    /// Future resolved by the next admit, complete or close
    ///
    /// Call `enable()` on the pinned future before re-checking the frontier
    /// so a notification between the check and the await is not lost.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
