use std::fmt;

use docsync::{DocumentPath, DocumentRequest};

use crate::config::SessionConfig;
use crate::error::SessionError;

/// Every remote resource the session keeps in sync.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    User,
    PublicUserInfo,
    HostConfig,
    Lockdown,
    TournamentConfigs,
    LiveMessages,
    GameStates,
    OtherGames,
    DepositDefinitions,
    Missions,
    BlitzDefinitions,
}

/// The order of the one-shot fetches on warm start.
pub const WARM_START_ORDER: [Resource; 11] = [
    Resource::User,
    Resource::Missions,
    Resource::TournamentConfigs,
    Resource::LiveMessages,
    Resource::BlitzDefinitions,
    Resource::OtherGames,
    Resource::GameStates,
    Resource::Lockdown,
    Resource::PublicUserInfo,
    Resource::HostConfig,
    Resource::DepositDefinitions,
];

/// The resources that get a continuous listener once the session is prepared.
pub const LISTENED_RESOURCES: [Resource; 7] = [
    Resource::TournamentConfigs,
    Resource::Missions,
    Resource::User,
    Resource::PublicUserInfo,
    Resource::HostConfig,
    Resource::Lockdown,
    Resource::GameStates,
];

impl Resource {
    pub const ALL: [Resource; 11] = WARM_START_ORDER;

    pub fn name(self) -> &'static str {
        match self {
            Resource::User => "user",
            Resource::PublicUserInfo => "publicUserInfo",
            Resource::HostConfig => "hostConfig",
            Resource::Lockdown => "lockdown",
            Resource::TournamentConfigs => "tournamentConfigs",
            Resource::LiveMessages => "liveMessages",
            Resource::GameStates => "gameStates",
            Resource::OtherGames => "otherGames",
            Resource::DepositDefinitions => "depositDefinitions",
            Resource::Missions => "missions",
            Resource::BlitzDefinitions => "blitzDefinitions",
        }
    }

    pub fn is_user_scoped(self) -> bool {
        matches!(
            self,
            Resource::User | Resource::PublicUserInfo | Resource::GameStates | Resource::Missions
        )
    }

    /// Key of the last-known copy in the local cache, for the resources that have one.
    pub fn cache_key(self) -> Option<&'static str> {
        match self {
            Resource::User
            | Resource::HostConfig
            | Resource::Lockdown
            | Resource::TournamentConfigs
            | Resource::LiveMessages
            | Resource::OtherGames => Some(self.name()),
            Resource::PublicUserInfo
            | Resource::GameStates
            | Resource::DepositDefinitions
            | Resource::Missions
            | Resource::BlitzDefinitions => None,
        }
    }

    pub fn request(self, config: &SessionConfig) -> Result<DocumentRequest, SessionError> {
        let game = config.game_id.as_str();
        let user = || config.user_id.as_deref().ok_or(SessionError::MissingUserId(self));
        let request = match self {
            Resource::User => DocumentRequest::document(DocumentPath::new(["users", user()?])?),
            Resource::PublicUserInfo => {
                DocumentRequest::document(DocumentPath::new(["publicUserInfo", user()?])?)
            }
            Resource::HostConfig => {
                DocumentRequest::document(DocumentPath::new(["games", game, "config", "host"])?)
            }
            Resource::Lockdown => {
                DocumentRequest::document(DocumentPath::new(["games", game, "config", "lockdown"])?)
            }
            Resource::BlitzDefinitions => {
                DocumentRequest::document(DocumentPath::new(["games", game, "config", "blitz"])?)
            }
            Resource::TournamentConfigs => {
                DocumentRequest::collection(DocumentPath::new(["games", game, "tournamentConfigs"])?)
            }
            Resource::LiveMessages => {
                DocumentRequest::collection(DocumentPath::new(["games", game, "liveMessages"])?)
            }
            Resource::GameStates => DocumentRequest::document(DocumentPath::new([
                "users",
                user()?,
                "gameStates",
                game,
            ])?),
            Resource::Missions => {
                DocumentRequest::document(DocumentPath::new(["users", user()?, "missions", game])?)
            }
            Resource::OtherGames => DocumentRequest::collection(DocumentPath::new(["otherGames"])?),
            Resource::DepositDefinitions => {
                DocumentRequest::collection(DocumentPath::new(["depositDefinitions"])?)
            }
        };
        Ok(request)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
