use std::path::PathBuf;

use crate::error::SessionError;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppVersion {
    /// Marketing version, for display only.
    pub version: String,
    /// Monotonically increasing build number. This is what the lockdown gate compares against.
    pub build_number: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub game_id: String,
    /// Bundle identifier of the host app. Push tokens are stored under it.
    pub app_id: String,
    pub app_version: AppVersion,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Where the on-disk cache lives. `None` keeps the cache in memory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Reads `TRIUMPH_GAME_ID`, `TRIUMPH_APP_ID`, `TRIUMPH_APP_VERSION`, `TRIUMPH_BUILD_NUMBER`,
    /// and optionally `TRIUMPH_USER_ID` and `TRIUMPH_CACHE_DIR`.
    pub fn from_env() -> Result<Self, SessionError> {
        let build_number = required("TRIUMPH_BUILD_NUMBER")?;
        let build_number = build_number.parse::<u32>().map_err(|e| {
            SessionError::Config(format!("TRIUMPH_BUILD_NUMBER={build_number:?}: {e}"))
        })?;
        let config = Self {
            game_id: required("TRIUMPH_GAME_ID")?,
            app_id: required("TRIUMPH_APP_ID")?,
            app_version: AppVersion {
                version: optional("TRIUMPH_APP_VERSION").unwrap_or_else(|| "0.0.0".to_string()),
                build_number,
            },
            user_id: optional("TRIUMPH_USER_ID"),
            cache_dir: optional("TRIUMPH_CACHE_DIR").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.game_id.is_empty() || self.game_id.contains('/') {
            return Err(SessionError::Config(format!(
                "game id {:?} is not a valid path segment",
                self.game_id
            )));
        }
        if self.app_id.is_empty() {
            return Err(SessionError::Config("app id is empty".to_string()));
        }
        if let Some(user_id) = &self.user_id {
            if user_id.is_empty() || user_id.contains('/') {
                return Err(SessionError::Config(format!(
                    "user id {user_id:?} is not a valid path segment"
                )));
            }
        }
        Ok(())
    }
}

fn required(name: &str) -> Result<String, SessionError> {
    optional(name).ok_or_else(|| SessionError::Config(format!("{name} is not set")))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
