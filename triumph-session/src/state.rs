use docsync::{Admission, Sequencer, Ticket, Watermarks};
use parking_lot::Mutex;

use crate::model::{
    BlitzDefinitions, DepositDefinitions, GameStates, HostConfig, LiveMessages, Lockdown,
    Missions, OtherGamesList, Presets, PublicUserInfo, User,
};
use crate::resource::Resource;

/// Everything the session knows, as last merged from the cache, fetches and listeners.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub public_user_info: Option<PublicUserInfo>,
    pub host_config: Option<HostConfig>,
    pub lockdown: Option<Lockdown>,
    pub presets: Presets,
    pub game_states: GameStates,
    pub live_messages: LiveMessages,
    pub other_games: OtherGamesList,
    pub deposit_definitions: DepositDefinitions,
    pub missions: Option<Missions>,
    pub blitz_definitions: Option<BlitzDefinitions>,
}

struct StoreInner {
    state: SessionState,
    watermarks: Watermarks<Resource>,
}

/// The single owner of [`SessionState`].
///
/// Reads and writes go through one mutex. Writes carry a [`Ticket`] and are refused when a newer write
/// for the same resource was already committed, or when the ticket predates the last [`SessionStore::reset`].
/// The lock is never held across an `.await`.
pub struct SessionStore {
    inner: Mutex<StoreInner>,
    sequencer: Sequencer,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state: SessionState::default(),
                watermarks: Watermarks::default(),
            }),
            sequencer: Sequencer::new(),
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        self.sequencer.issue()
    }

    pub fn epoch(&self) -> u64 {
        self.sequencer.epoch()
    }

    pub fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.inner.lock().state)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read(Clone::clone)
    }

    /// Runs `f` against the state if `ticket` is admitted for `resource`, otherwise returns why it was not.
    pub fn write<T>(
        &self,
        resource: Resource,
        ticket: Ticket,
        f: impl FnOnce(&mut SessionState) -> T,
    ) -> Result<T, Admission> {
        let mut inner = self.inner.lock();
        let admission = inner
            .watermarks
            .admit(resource, ticket, self.sequencer.epoch());
        match admission {
            Admission::Fresh => Ok(f(&mut inner.state)),
            refused => Err(refused),
        }
    }

    /// Clears all state and starts a new epoch, so writes already in flight are refused.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.sequencer.advance_epoch();
        inner.state = SessionState::default();
        inner.watermarks.clear();
    }
}
