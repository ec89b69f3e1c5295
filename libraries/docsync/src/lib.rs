//! This is a library for keeping local copies of remote documents in sync.
//! It was created for the Triumph session layer, so it only covers what that needed.
//!
//! Syncing strategy:
//! 1. Every remote resource lives at a [`DocumentPath`](data_model::DocumentPath). It is either a single document or a collection of documents.
//! 2. On startup, the last known copy of each resource is read out of a [`LocalCache`](cache::LocalCache). This is fast and never touches the network.
//! 3. Each resource is then fetched once through a [`DocumentClient`](client::DocumentClient), and the result replaces the cached copy.
//! 4. Finally, a continuous listener is registered per resource path. Every delivery replaces the local copy again.
//!
//! Steps 3 and 4 run concurrently, so a fetch and a listener delivery for the same resource can race.
//! Writes are therefore stamped with a [`Ticket`](data_model::Ticket) taken when the fetch was issued or the delivery arrived,
//! and a write is only committed if it is newer than the last one committed for that resource.

pub mod cache;
pub mod client;
pub mod data_model;
pub mod memory;

#[cfg(feature = "fs")]
pub mod fs_cache;

pub use cache::{CacheError, LocalCache, LocalCacheExt, MemoryCache};
pub use client::{
    ClientError, DocumentClient, DocumentRequest, FetchError, ListenerCallback, RequestShape,
};
pub use data_model::{
    Admission, DocumentPath, FieldOp, FieldPath, ListenerKey, PartialUpdate, PathError, Readiness,
    ReadinessSignal, Sequencer, Subscribers, SyncState, Ticket, Watermarks,
};
#[cfg(feature = "fs")]
pub use fs_cache::FileCache;
