use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMessage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl LiveMessage {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LiveMessages(pub Vec<LiveMessage>);

impl LiveMessages {
    pub fn active(&self, now: DateTime<Utc>) -> impl Iterator<Item = &LiveMessage> {
        self.0.iter().filter(move |message| !message.is_expired(now))
    }
}
