use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Push tokens keyed by app id.
    #[serde(default)]
    pub fcm_tokens: BTreeMap<String, String>,
    #[serde(default)]
    pub seen_live_messages: BTreeMap<String, bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_seen(&self, message_id: &str) -> bool {
        self.seen_live_messages
            .get(message_id)
            .copied()
            .unwrap_or(false)
    }
}

/// The part of a user's profile other players can see.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserInfo {
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub badges: Vec<String>,
}
