use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    NotStarted,
    InProgress,
    Finished,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The player's state in each game or tournament, keyed by its id. A missing document is an empty record.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct GameStates(pub BTreeMap<String, GameState>);

impl GameStates {
    pub fn get(&self, id: &str) -> Option<&GameState> {
        self.0.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn in_progress(&self) -> impl Iterator<Item = (&String, &GameState)> {
        self.0
            .iter()
            .filter(|(_, state)| state.status == GameStatus::InProgress)
    }
}
