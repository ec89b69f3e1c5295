/// Force-update gate. A missing document means "not locked down".
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockdown {
    #[serde(default)]
    pub minimum_supported_version_number: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub update_url: Option<String>,
}

impl Lockdown {
    /// True when the running build is older than the minimum the server accepts.
    pub fn is_locked_down(&self, running_version_number: u32) -> bool {
        self.minimum_supported_version_number
            .is_some_and(|minimum| running_version_number < minimum)
    }
}
