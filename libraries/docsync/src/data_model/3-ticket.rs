//! # Ticket
//! One-shot fetches and listener deliveries for the same resource can complete in any order.
//! To make the outcome deterministic, every write takes a [`Ticket`] up front:
//! when the fetch is issued, or when the listener delivery arrives.
//!
//! A ticket carries the session `epoch` it was issued in and a `seq` number that increases monotonically
//! across the whole session, even across epochs. [`Watermarks`] remembers the highest `seq` committed per key
//! and admits a write only if it is newer. Writes from an older epoch (issued before a reset) are always refused.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket {
    pub epoch: u64,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    epoch: AtomicU64,
    next_seq: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket {
            epoch: self.epoch.load(Ordering::Acquire),
            seq: self.next_seq.fetch_add(1, Ordering::AcqRel) + 1,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Starts a new epoch. Tickets issued before this call will be refused by [`Watermarks::admit`].
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    Fresh,
    /// A newer write for the same key was already committed.
    Stale { committed: u64 },
    /// The ticket belongs to a previous epoch.
    Expired,
}

#[derive(Clone, Debug)]
pub struct Watermarks<K: Eq + Hash> {
    committed: HashMap<K, u64>,
}

impl<K: Eq + Hash> Default for Watermarks<K> {
    fn default() -> Self {
        Self {
            committed: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> Watermarks<K> {
    /// Checks the ticket and, if it is fresh, records it as the latest commit for `key`.
    pub fn admit(&mut self, key: K, ticket: Ticket, current_epoch: u64) -> Admission {
        if ticket.epoch != current_epoch {
            return Admission::Expired;
        }
        let committed = self.committed.entry(key).or_insert(0);
        if ticket.seq <= *committed {
            return Admission::Stale {
                committed: *committed,
            };
        }
        *committed = ticket.seq;
        Admission::Fresh
    }

    pub fn last_committed(&self, key: &K) -> Option<u64> {
        self.committed.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
    }
}
