#[path = "1-document-path.rs"]
mod document_path;

#[path = "2-partial-update.rs"]
mod partial_update;

#[path = "3-ticket.rs"]
mod ticket;

#[path = "4-readiness.rs"]
mod readiness;

#[path = "5-subscribers.rs"]
mod subscribers;

#[path = "6-sync-state.rs"]
mod sync_state;

pub use document_path::*;
pub use partial_update::*;
pub use readiness::*;
pub use subscribers::*;
pub use sync_state::*;
pub use ticket::*;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ListenerKey(pub(crate) slotmap::DefaultKey);
