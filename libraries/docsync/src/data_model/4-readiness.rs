//! # Readiness
//! A coarse signal telling the UI how fresh the local state is.
//! `CoreData` means everything came out of the local cache; `Db` means every resource was fetched from the remote store at least once.
//!
//! Readiness only moves forward. Asking to advance to a level that is not strictly higher than the current one does nothing.

use tokio::sync::watch;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Readiness {
    CoreData,
    Db,
}

#[derive(Debug)]
pub struct ReadinessSignal {
    sender: watch::Sender<Option<Readiness>>,
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    pub fn current(&self) -> Option<Readiness> {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Readiness>> {
        self.sender.subscribe()
    }

    /// Returns true if the level changed.
    pub fn advance(&self, to: Readiness) -> bool {
        self.sender.send_if_modified(|current| {
            if current.is_some_and(|current| current >= to) {
                return false;
            }
            *current = Some(to);
            true
        })
    }
}
