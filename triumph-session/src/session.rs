//! # Session
//! The bootstrap orchestrator and the handle the app keeps for the lifetime of a signed-in session.
//!
//! [`Session::prepare_session`] runs three paths:
//! 1. Cold start, synchronously: everything cache-eligible is read out of the [`LocalCache`], readiness becomes
//!    [`Readiness::CoreData`] and [`SessionEvent::ReadyForInteraction`] is published. No network.
//! 2. Warm start, spawned: every resource is fetched once, in [`WARM_START_ORDER`]. Failures are logged and collected
//!    in a [`WarmStartReport`]; they never stop the remaining fetches. Readiness then becomes [`Readiness::Db`].
//! 3. Listeners, spawned alongside: one continuous listener per entry of [`LISTENED_RESOURCES`], unless the client
//!    already has one on that path.
//!
//! Both spawned tasks are tied to the session generation. [`Session::reset_session`] aborts them and starts a new
//! epoch, so anything still in flight from before the reset can no longer write.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use docsync::{
    DocumentClient, FieldPath, ListenerKey, LocalCache, LocalCacheExt, PartialUpdate, Readiness,
    ReadinessSignal, Subscribers, SyncState, Ticket,
};
use futures::future::{AbortHandle, Abortable, Aborted};
use parking_lot::{Mutex, ReentrantMutex};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::model::{
    BlitzDefinitions, DepositDefinitions, GameStates, HostConfig, LiveMessages, Lockdown,
    Missions, OtherGamesList, Presets, PublicUserInfo, User,
};
use crate::resource::{LISTENED_RESOURCES, Resource, WARM_START_ORDER};
use crate::state::{SessionState, SessionStore};
use crate::support::SupportWidget;
use crate::sync::{SyncUnit, SyncedResource};

/// Cache scalar holding the user the cached documents belong to.
const LAST_USER_KEY: &str = "lastUserId";

/// Where a committed value came from. Only remote values are written back to the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Origin {
    Cache,
    Remote,
}

pub(crate) struct SessionInner {
    pub(crate) config: SessionConfig,
    pub(crate) client: Arc<dyn DocumentClient>,
    pub(crate) cache: Arc<dyn LocalCache>,
    pub(crate) store: SessionStore,
    subscribers: Subscribers<SessionEvent>,
    readiness: ReadinessSignal,
    statuses: Mutex<HashMap<Resource, SyncState>>,
    /// Held while a listener is registered and while a reset swaps epochs, so no listener outlives its epoch.
    /// Reentrant because the initial delivery of a registration can reach a subscriber that resets.
    pub(crate) registration: ReentrantMutex<()>,
    in_flight: Mutex<Vec<InFlight>>,
    support: Mutex<Option<Arc<dyn SupportWidget>>>,
}

struct InFlight {
    abort: AbortHandle,
    task: tokio::task::AbortHandle,
}

/// Delivers queued events when dropped, once every lock taken in the enclosing scope is released.
struct FlushLater<'a> {
    inner: &'a SessionInner,
}

impl<'a> FlushLater<'a> {
    fn new(inner: &'a SessionInner) -> Self {
        Self { inner }
    }
}

impl Drop for FlushLater<'_> {
    fn drop(&mut self) {
        self.inner.subscribers.flush();
    }
}

impl SessionInner {
    fn publish(&self, event: SessionEvent) {
        self.subscribers.publish(event, None);
    }

    fn advance_readiness(&self, to: Readiness) {
        if self.readiness.advance(to) {
            log::info!("Session readiness is now {to:?}");
            self.publish(SessionEvent::ReadinessChanged(to));
        }
    }

    /// Records the start of a fetch. Returns false, recording nothing, if `ticket` predates the last reset.
    pub(crate) fn mark_started(&self, resource: Resource, ticket: Ticket) -> bool {
        let mut statuses = self.statuses.lock();
        if ticket.epoch != self.store.epoch() {
            return false;
        }
        statuses.entry(resource).or_default().mark_started();
        true
    }

    /// Records the end of a fetch. Returns false, recording nothing, if `ticket` predates the last reset.
    pub(crate) fn mark_finished(
        &self,
        resource: Resource,
        ticket: Ticket,
        error: Option<&SessionError>,
    ) -> bool {
        // checked under the statuses lock; reset advances the epoch before clearing statuses
        let mut statuses = self.statuses.lock();
        if ticket.epoch != self.store.epoch() {
            return false;
        }
        statuses
            .entry(resource)
            .or_default()
            .mark_finished(error.map(ToString::to_string));
        true
    }

    /// Applies `remote` to the state if `ticket` is still current for the resource.
    ///
    /// Returns whether the state changed. A ticket from before the last reset gives [`SessionError::Cancelled`];
    /// a ticket older than the last commit for the resource is dropped silently.
    pub(crate) fn commit<R: SyncedResource>(
        &self,
        ticket: Ticket,
        remote: R::Remote,
        origin: Origin,
    ) -> Result<bool, SessionError> {
        let _flusher = FlushLater::new(self);
        let to_persist = match (origin, R::RESOURCE.cache_key()) {
            (Origin::Remote, Some(key)) => match serde_json::to_value(&remote) {
                Ok(value) => Some((key, value)),
                Err(e) => {
                    log::warn!("Could not encode {} for the cache: {e}", R::RESOURCE);
                    None
                }
            },
            _ => None,
        };

        let cache = &self.cache;
        let outcome = self.store.write(R::RESOURCE, ticket, |state| {
            let changed = R::apply(state, remote);
            if let (true, Some((key, value))) = (changed, &to_persist) {
                if let Err(e) = cache.write(key, value) {
                    log::warn!("Could not cache {}: {e}", R::RESOURCE);
                }
            }
            changed
        });

        match outcome {
            Ok(changed) => {
                if changed {
                    self.publish(SessionEvent::ResourceDidUpdate(R::RESOURCE));
                }
                Ok(changed)
            }
            Err(docsync::Admission::Stale { committed }) => {
                log::debug!(
                    "Dropping stale {} write (ticket {}, already committed {})",
                    R::RESOURCE,
                    ticket.seq,
                    committed
                );
                Ok(false)
            }
            Err(_) => {
                log::debug!("Dropping {} write from a previous session", R::RESOURCE);
                Err(SessionError::Cancelled)
            }
        }
    }
}

/// Everything the warm start did, so callers can tell a partial start from a complete one.
#[derive(Debug, Default)]
pub struct WarmStartReport {
    pub fetched: Vec<Resource>,
    pub failures: Vec<(Resource, SessionError)>,
}

impl WarmStartReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = Resource> + '_ {
        self.failures.iter().map(|(resource, _)| *resource)
    }
}

#[derive(Debug)]
pub struct Prepared {
    pub report: WarmStartReport,
    /// Resources whose listener was registered by this call.
    pub listeners: Vec<Resource>,
}

/// The spawned half of [`Session::prepare_session`]. Dropping it leaves the tasks running.
pub struct PrepareHandle {
    warm: JoinHandle<Result<WarmStartReport, Aborted>>,
    listeners: JoinHandle<Result<Vec<Resource>, Aborted>>,
}

impl PrepareHandle {
    /// Waits for both the warm start and the listener activation. Fails with
    /// [`SessionError::Cancelled`] if the session was reset first.
    pub async fn wait(self) -> Result<Prepared, SessionError> {
        let listeners = self.listeners.await?.map_err(|Aborted| SessionError::Cancelled)?;
        let report = self.warm.await?.map_err(|Aborted| SessionError::Cancelled)?;
        Ok(Prepared { report, listeners })
    }
}

// Binds `$unit` to the concrete sync unit for `$resource`.
macro_rules! with_unit {
    ($session:expr, $resource:expr, |$unit:ident| $body:expr) => {
        match $resource {
            Resource::User => {
                let $unit = $session.unit::<User>();
                $body
            }
            Resource::PublicUserInfo => {
                let $unit = $session.unit::<PublicUserInfo>();
                $body
            }
            Resource::HostConfig => {
                let $unit = $session.unit::<HostConfig>();
                $body
            }
            Resource::Lockdown => {
                let $unit = $session.unit::<Lockdown>();
                $body
            }
            Resource::TournamentConfigs => {
                let $unit = $session.unit::<Presets>();
                $body
            }
            Resource::LiveMessages => {
                let $unit = $session.unit::<LiveMessages>();
                $body
            }
            Resource::GameStates => {
                let $unit = $session.unit::<GameStates>();
                $body
            }
            Resource::OtherGames => {
                let $unit = $session.unit::<OtherGamesList>();
                $body
            }
            Resource::DepositDefinitions => {
                let $unit = $session.unit::<DepositDefinitions>();
                $body
            }
            Resource::Missions => {
                let $unit = $session.unit::<Missions>();
                $body
            }
            Resource::BlitzDefinitions => {
                let $unit = $session.unit::<BlitzDefinitions>();
                $body
            }
        }
    };
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        client: Arc<dyn DocumentClient>,
        cache: Arc<dyn LocalCache>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                cache,
                store: SessionStore::new(),
                subscribers: Subscribers::new(),
                readiness: ReadinessSignal::new(),
                statuses: Mutex::new(HashMap::new()),
                registration: ReentrantMutex::new(()),
                in_flight: Mutex::new(Vec::new()),
                support: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn set_support_widget(&self, widget: Arc<dyn SupportWidget>) {
        *self.inner.support.lock() = Some(widget);
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> ListenerKey {
        self.inner
            .subscribers
            .register(move |_, event| listener(event))
    }

    pub fn unsubscribe(&self, key: ListenerKey) -> bool {
        self.inner.subscribers.unregister(key)
    }

    pub fn readiness(&self) -> Option<Readiness> {
        self.inner.readiness.current()
    }

    pub fn watch_readiness(&self) -> watch::Receiver<Option<Readiness>> {
        self.inner.readiness.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.store.snapshot()
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        self.inner.store.read(f)
    }

    /// True if the server requires a newer build than the one running. Unknown lockdown means not locked.
    pub fn is_locked_down(&self) -> bool {
        let running = self.inner.config.app_version.build_number;
        self.inner.store.read(|state| {
            state
                .lockdown
                .as_ref()
                .is_some_and(|lockdown| lockdown.is_locked_down(running))
        })
    }

    pub fn resource_status(&self, resource: Resource) -> SyncState {
        self.inner
            .statuses
            .lock()
            .get(&resource)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unit<R: SyncedResource>(&self) -> SyncUnit<'_, R> {
        SyncUnit::new(&self.inner)
    }

    pub fn user(&self) -> SyncUnit<'_, User> {
        self.unit()
    }

    pub fn public_user_info(&self) -> SyncUnit<'_, PublicUserInfo> {
        self.unit()
    }

    pub fn host_config(&self) -> SyncUnit<'_, HostConfig> {
        self.unit()
    }

    pub fn lockdown(&self) -> SyncUnit<'_, Lockdown> {
        self.unit()
    }

    pub fn tournament_configs(&self) -> SyncUnit<'_, Presets> {
        self.unit()
    }

    pub fn live_messages(&self) -> SyncUnit<'_, LiveMessages> {
        self.unit()
    }

    pub fn game_states(&self) -> SyncUnit<'_, GameStates> {
        self.unit()
    }

    pub fn other_games(&self) -> SyncUnit<'_, OtherGamesList> {
        self.unit()
    }

    pub fn deposit_definitions(&self) -> SyncUnit<'_, DepositDefinitions> {
        self.unit()
    }

    pub fn missions(&self) -> SyncUnit<'_, Missions> {
        self.unit()
    }

    pub fn blitz_definitions(&self) -> SyncUnit<'_, BlitzDefinitions> {
        self.unit()
    }

    pub async fn get(&self, resource: Resource) -> Result<(), SessionError> {
        with_unit!(self, resource, |unit| unit.get().await)
    }

    pub fn observe(&self, resource: Resource) -> bool {
        with_unit!(self, resource, |unit| unit.observe())
    }

    fn observe_in_epoch(&self, resource: Resource, epoch: u64) -> bool {
        with_unit!(self, resource, |unit| unit.observe_in_epoch(epoch))
    }

    pub fn load_from_local_storage(&self, resource: Resource) -> bool {
        with_unit!(self, resource, |unit| unit.load_from_local_storage())
    }

    /// Starts the session. Returns once cached data is in place; the network work continues in the background.
    pub fn prepare_session(&self) -> PrepareHandle {
        self.cold_start();

        let epoch = self.inner.store.epoch();
        let warm = self.spawn_scoped({
            let session = self.clone();
            async move { session.warm_start().await }
        });
        let listeners = self.spawn_scoped({
            let session = self.clone();
            async move { session.activate_listeners_in_epoch(epoch) }
        });
        PrepareHandle { warm, listeners }
    }

    /// Hydrates from the cache and marks the session ready for interaction. Returns how many resources were loaded.
    pub fn cold_start(&self) -> usize {
        let _flusher = FlushLater::new(&self.inner);
        self.forget_other_users_cache();

        let hydrated = Resource::ALL
            .into_iter()
            .filter(|resource| self.load_from_local_storage(*resource))
            .count();
        log::info!("Cold start loaded {hydrated} resources from local storage");

        self.inner.advance_readiness(Readiness::CoreData);
        self.inner.publish(SessionEvent::ReadyForInteraction);
        hydrated
    }

    /// Fetches every resource once. Never fails as a whole; see [`WarmStartReport::failures`].
    pub async fn warm_start(&self) -> WarmStartReport {
        let mut report = WarmStartReport::default();
        for resource in WARM_START_ORDER {
            let result = match resource {
                Resource::OtherGames => self.other_games().get_forced(true).await,
                resource => self.get(resource).await,
            };
            match result {
                Ok(()) => report.fetched.push(resource),
                Err(e) => {
                    log::warn!("Warm start could not fetch {resource}: {e}");
                    report.failures.push((resource, e));
                }
            }
        }

        {
            let _flusher = FlushLater::new(&self.inner);
            self.inner.advance_readiness(Readiness::Db);
            self.inner.publish(SessionEvent::SessionDataDidPrepare);
        }

        let widget = self.inner.support.lock().clone();
        if let (Some(widget), Some(user_id)) = (widget, self.inner.config.user_id.as_deref()) {
            widget.identify(user_id);
        }

        log::info!(
            "Warm start finished: {} fetched, {} failed",
            report.fetched.len(),
            report.failures.len()
        );
        report
    }

    /// Registers the continuous listeners the client does not already have. Returns the ones registered.
    pub fn activate_listeners(&self) -> Vec<Resource> {
        self.activate_listeners_in_epoch(self.inner.store.epoch())
    }

    /// Registers nothing once the session has been reset past `epoch`.
    pub(crate) fn activate_listeners_in_epoch(&self, epoch: u64) -> Vec<Resource> {
        let active = self.inner.client.listener_keys();
        let mut activated = Vec::new();
        for resource in LISTENED_RESOURCES {
            let already_active = resource
                .request(&self.inner.config)
                .is_ok_and(|request| active.contains(&request.path));
            if already_active {
                log::debug!("Listener for {resource} is already active");
                continue;
            }
            if self.observe_in_epoch(resource, epoch) {
                activated.push(resource);
            }
        }
        activated
    }

    /// Drops everything belonging to the current session: background tasks, listeners, cached and in-memory data.
    ///
    /// Writes still in flight from before the reset are discarded when they land. Readiness is left where it was.
    pub fn reset_session(&self) {
        let _flusher = FlushLater::new(&self.inner);
        for task in self.inner.in_flight.lock().drain(..) {
            task.abort.abort();
        }
        {
            // no registration can slip in between the epoch change and the teardown
            let _registering = self.inner.registration.lock();
            self.inner.store.reset();
            self.inner.client.clear_all();
        }
        self.inner.statuses.lock().clear();
        if let Err(e) = self.inner.cache.clear() {
            log::warn!("Could not clear the local cache: {e}");
        }
        self.inner.publish(SessionEvent::SessionDidReset);
        log::info!("Session reset");
    }

    pub async fn register_push_token(&self, token: &str) -> Result<(), SessionError> {
        let update = PartialUpdate::new().set(self.push_token_field()?, token);
        self.update_user(update).await
    }

    pub async fn unregister_push_token(&self) -> Result<(), SessionError> {
        let update = PartialUpdate::new().delete(self.push_token_field()?);
        self.update_user(update).await
    }

    pub async fn mark_live_message_seen(&self, message_id: &str) -> Result<(), SessionError> {
        let field = FieldPath::new(["seenLiveMessages", message_id])?;
        self.update_user(PartialUpdate::new().set(field, true)).await
    }

    pub async fn set_public_info(&self, info: &PublicUserInfo) -> Result<(), SessionError> {
        let path = Resource::PublicUserInfo.request(&self.inner.config)?.path;
        let value = serde_json::to_value(info)?;
        self.inner.client.set_data(&path, value).await?;
        Ok(())
    }

    pub async fn call_function(&self, name: &str, payload: Value) -> Result<Value, SessionError> {
        if self.inner.config.user_id.is_none() {
            return Err(SessionError::MissingUserId(Resource::User));
        }
        Ok(self.inner.client.call(name, payload).await?)
    }

    fn push_token_field(&self) -> Result<FieldPath, SessionError> {
        Ok(FieldPath::new([
            "fcmTokens",
            self.inner.config.app_id.as_str(),
        ])?)
    }

    async fn update_user(&self, update: PartialUpdate) -> Result<(), SessionError> {
        let path = Resource::User.request(&self.inner.config)?.path;
        self.inner.client.update(&path, update).await?;
        Ok(())
    }

    /// Cached documents are only trusted for the user who cached them.
    fn forget_other_users_cache(&self) {
        let cache = &self.inner.cache;
        let current = self.inner.config.user_id.as_deref();
        match cache.read_typed::<String>(LAST_USER_KEY) {
            Ok(Some(previous)) if Some(previous.as_str()) != current => {
                log::info!("Local cache belongs to another user; clearing it");
                if let Err(e) = cache.clear() {
                    log::warn!("Could not clear the local cache: {e}");
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read {LAST_USER_KEY}: {e}"),
        }
        if let Some(current) = current {
            if let Err(e) = cache.write_typed(LAST_USER_KEY, current) {
                log::warn!("Could not write {LAST_USER_KEY}: {e}");
            }
        }
    }

    fn spawn_scoped<F>(&self, task: F) -> JoinHandle<Result<F::Output, Aborted>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        let handle = tokio::spawn(Abortable::new(task, registration));
        let mut in_flight = self.inner.in_flight.lock();
        in_flight.retain(|scoped| !scoped.task.is_finished());
        in_flight.push(InFlight {
            abort,
            task: handle.abort_handle(),
        });
        handle
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
