//! # SyncState
//! Bookkeeping for the last one-shot fetch of a resource, so the UI can show "last synced" and surface errors.

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// If last_sync_started > last_sync_finished, then the fetch is in progress.
    pub last_sync_started: Option<chrono::DateTime<chrono::Utc>>,
    pub last_sync_finished: Option<chrono::DateTime<chrono::Utc>>,

    /// If last_sync_error is Some, then the last fetch failed. Gets reset to None when the next fetch succeeds.
    pub last_sync_error: Option<String>,
}

impl SyncState {
    pub fn mark_started(&mut self) {
        self.last_sync_started = Some(chrono::Utc::now());
    }

    pub fn mark_finished(&mut self, error: Option<String>) {
        self.last_sync_finished = Some(chrono::Utc::now());
        self.last_sync_error = error;
    }

    pub fn in_progress(&self) -> bool {
        match (self.last_sync_started, self.last_sync_finished) {
            (Some(started), Some(finished)) => started > finished,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
