//! One sync unit per resource. Every unit offers the same three operations:
//!
//! - [`SyncUnit::get`] fetches once and overwrites the in-memory copy (and the cached copy, where there is one).
//! - [`SyncUnit::observe`] registers a continuous listener that does the same on every delivery.
//! - [`SyncUnit::load_from_local_storage`] fills the in-memory copy from the cache without touching the network.
//!
//! How a resource merges into [`SessionState`] and what stands in for a missing document is described by [`SyncedResource`].

use std::marker::PhantomData;
use std::sync::Arc;

use docsync::client::{fetch, typed_listener};
use docsync::{FetchError, LocalCacheExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SessionError;
use crate::model::{
    BlitzDefinitions, DepositDefinitions, GameStates, HostConfig, LiveMessages, Lockdown,
    Missions, OtherGame, OtherGamesList, Presets, PublicUserInfo, TournamentConfig, User,
};
use crate::resource::Resource;
use crate::session::{Origin, SessionInner};
use crate::state::SessionState;

pub trait SyncedResource: 'static {
    /// The shape the store delivers. This is also what gets cached.
    type Remote: DeserializeOwned + Serialize + Send + 'static;

    const RESOURCE: Resource;

    /// Merges a delivered value into the state. Returns true if the state changed.
    fn apply(state: &mut SessionState, remote: Self::Remote) -> bool;

    /// Used instead of failing with `NoData` when the store has nothing at the path.
    fn fallback() -> Option<Self::Remote> {
        None
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl SyncedResource for User {
    type Remote = User;
    const RESOURCE: Resource = Resource::User;

    fn apply(state: &mut SessionState, remote: User) -> bool {
        replace(&mut state.user, Some(remote))
    }
}

impl SyncedResource for PublicUserInfo {
    type Remote = PublicUserInfo;
    const RESOURCE: Resource = Resource::PublicUserInfo;

    fn apply(state: &mut SessionState, remote: PublicUserInfo) -> bool {
        replace(&mut state.public_user_info, Some(remote))
    }
}

impl SyncedResource for HostConfig {
    type Remote = HostConfig;
    const RESOURCE: Resource = Resource::HostConfig;

    fn apply(state: &mut SessionState, remote: HostConfig) -> bool {
        replace(&mut state.host_config, Some(remote))
    }
}

impl SyncedResource for Lockdown {
    type Remote = Lockdown;
    const RESOURCE: Resource = Resource::Lockdown;

    fn apply(state: &mut SessionState, remote: Lockdown) -> bool {
        replace(&mut state.lockdown, Some(remote))
    }

    fn fallback() -> Option<Lockdown> {
        Some(Lockdown::default())
    }
}

impl SyncedResource for Presets {
    type Remote = Vec<TournamentConfig>;
    const RESOURCE: Resource = Resource::TournamentConfigs;

    fn apply(state: &mut SessionState, remote: Vec<TournamentConfig>) -> bool {
        state.presets.assign(remote)
    }
}

impl SyncedResource for LiveMessages {
    type Remote = LiveMessages;
    const RESOURCE: Resource = Resource::LiveMessages;

    fn apply(state: &mut SessionState, remote: LiveMessages) -> bool {
        replace(&mut state.live_messages, remote)
    }
}

impl SyncedResource for GameStates {
    type Remote = GameStates;
    const RESOURCE: Resource = Resource::GameStates;

    fn apply(state: &mut SessionState, remote: GameStates) -> bool {
        replace(&mut state.game_states, remote)
    }

    fn fallback() -> Option<GameStates> {
        Some(GameStates::default())
    }
}

impl SyncedResource for OtherGamesList {
    type Remote = Vec<OtherGame>;
    const RESOURCE: Resource = Resource::OtherGames;

    fn apply(state: &mut SessionState, remote: Vec<OtherGame>) -> bool {
        state.other_games.assign(remote)
    }
}

impl SyncedResource for DepositDefinitions {
    type Remote = DepositDefinitions;
    const RESOURCE: Resource = Resource::DepositDefinitions;

    fn apply(state: &mut SessionState, remote: DepositDefinitions) -> bool {
        replace(&mut state.deposit_definitions, remote)
    }
}

impl SyncedResource for Missions {
    type Remote = Missions;
    const RESOURCE: Resource = Resource::Missions;

    fn apply(state: &mut SessionState, remote: Missions) -> bool {
        replace(&mut state.missions, Some(remote))
    }
}

impl SyncedResource for BlitzDefinitions {
    type Remote = BlitzDefinitions;
    const RESOURCE: Resource = Resource::BlitzDefinitions;

    fn apply(state: &mut SessionState, remote: BlitzDefinitions) -> bool {
        replace(&mut state.blitz_definitions, Some(remote))
    }
}

pub struct SyncUnit<'a, R: SyncedResource> {
    inner: &'a Arc<SessionInner>,
    resource: PhantomData<fn() -> R>,
}

impl<'a, R: SyncedResource> SyncUnit<'a, R> {
    pub(crate) fn new(inner: &'a Arc<SessionInner>) -> Self {
        Self {
            inner,
            resource: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        R::RESOURCE
    }

    /// Fetches once. On failure the in-memory state is left as it was.
    ///
    /// Fails with [`SessionError::Cancelled`], touching neither state nor status, if the session was reset
    /// while the request was in flight.
    pub async fn get(&self) -> Result<(), SessionError> {
        let request = R::RESOURCE.request(&self.inner.config)?;
        // taken before the request goes out, so a listener delivery arriving meanwhile wins
        let ticket = self.inner.store.issue();
        if !self.inner.mark_started(R::RESOURCE, ticket) {
            return Err(SessionError::Cancelled);
        }

        let fetched = match fetch::<R::Remote>(self.inner.client.as_ref(), &request).await {
            Ok(remote) => Ok(remote),
            Err(FetchError::NoData { path }) => match R::fallback() {
                Some(fallback) => {
                    log::debug!("Nothing at {path}; using the default {}", R::RESOURCE);
                    Ok(fallback)
                }
                None => Err(SessionError::from(FetchError::NoData { path })),
            },
            Err(e) => Err(SessionError::from(e)),
        };
        if !self
            .inner
            .mark_finished(R::RESOURCE, ticket, fetched.as_ref().err())
        {
            log::debug!("{} fetch finished after a reset; discarding it", R::RESOURCE);
            return Err(SessionError::Cancelled);
        }

        self.inner
            .commit::<R>(ticket, fetched?, Origin::Remote)
            .map(|_| ())
    }

    /// Registers a continuous listener. Returns false if it could not be registered.
    ///
    /// Failed deliveries are logged and otherwise ignored; the listener stays registered.
    pub fn observe(&self) -> bool {
        self.observe_in_epoch(self.inner.store.epoch())
    }

    /// Like [`Self::observe`], but refuses to register once the session has moved past `epoch`.
    pub(crate) fn observe_in_epoch(&self, epoch: u64) -> bool {
        let request = match R::RESOURCE.request(&self.inner.config) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Not observing {}: {e}", R::RESOURCE);
                return false;
            }
        };
        let _registering = self.inner.registration.lock();
        if self.inner.store.epoch() != epoch {
            log::debug!("Not observing {} for a previous session", R::RESOURCE);
            return false;
        }
        let session = Arc::downgrade(self.inner);
        typed_listener::<R::Remote, _>(self.inner.client.as_ref(), &request, move |delivery| {
            let Some(inner) = session.upgrade() else {
                return;
            };
            match delivery {
                Ok(remote) => {
                    let ticket = inner.store.issue();
                    if ticket.epoch != epoch {
                        log::debug!("Ignoring {} delivery for a previous session", R::RESOURCE);
                        return;
                    }
                    if let Err(e) = inner.commit::<R>(ticket, remote, Origin::Remote) {
                        log::debug!("Dropped {} delivery: {e}", R::RESOURCE);
                    }
                }
                Err(e) => log::warn!("Listener for {} failed: {e}", R::RESOURCE),
            }
        });
        log::debug!("Observing {} at {}", R::RESOURCE, request.path);
        true
    }

    /// Fills the in-memory copy from the cache. Returns true if anything was loaded.
    pub fn load_from_local_storage(&self) -> bool {
        let Some(key) = R::RESOURCE.cache_key() else {
            return false;
        };
        let cached = match self.inner.cache.read_typed::<R::Remote>(key) {
            Ok(Some(cached)) => cached,
            Ok(None) => return false,
            Err(e) => {
                log::warn!("Discarding unreadable cached {}: {e}", R::RESOURCE);
                if let Err(e) = self.inner.cache.remove(key) {
                    log::warn!("Could not remove cached {}: {e}", R::RESOURCE);
                }
                return false;
            }
        };
        let ticket = self.inner.store.issue();
        self.inner
            .commit::<R>(ticket, cached, Origin::Cache)
            .is_ok()
    }
}

impl SyncUnit<'_, OtherGamesList> {
    /// Without `force`, skips the fetch when the carousel already has entries.
    pub async fn get_forced(&self, force: bool) -> Result<(), SessionError> {
        if !force && !self.inner.store.read(|state| state.other_games.is_empty()) {
            log::debug!("Other games already loaded; skipping fetch");
            return Ok(());
        }
        self.get().await
    }
}
