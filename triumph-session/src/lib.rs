//! Session data synchronization for the Triumph gaming SDK.
//!
//! A [`Session`] owns the local copy of everything the SDK shows for a signed-in player: profile, tournaments,
//! live messages, lockdown and host configuration and the rest of [`Resource`]. It fills that copy from the
//! on-device cache first, then from the remote document store, then keeps it current with listeners.
//! UI code reads it through [`Session::snapshot`] and learns about changes through [`Session::subscribe`]
//! and [`Session::watch_readiness`].

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod resource;
pub mod session;
pub mod state;
pub mod support;
pub mod sync;

pub use config::{AppVersion, SessionConfig};
pub use docsync::{Readiness, SyncState};
pub use error::SessionError;
pub use events::SessionEvent;
pub use resource::{LISTENED_RESOURCES, Resource, WARM_START_ORDER};
pub use session::{PrepareHandle, Prepared, Session, WarmStartReport};
pub use state::{SessionState, SessionStore};
pub use support::SupportWidget;
pub use sync::{SyncUnit, SyncedResource};
