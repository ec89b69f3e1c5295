use std::collections::BTreeMap;

/// Server-driven knobs for the host app.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub minimum_deposit: Option<f64>,
    #[serde(default)]
    pub referral_reward: Option<f64>,
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
}

impl HostConfig {
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.feature_flags.get(flag).copied().unwrap_or(false)
    }
}
