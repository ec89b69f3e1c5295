#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub progress: u32,
    pub goal: u32,
    #[serde(default)]
    pub claimed: bool,
}

impl Mission {
    pub fn is_claimable(&self) -> bool {
        !self.claimed && self.progress >= self.goal
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Missions {
    #[serde(default)]
    pub missions: Vec<Mission>,
}

impl Missions {
    pub fn claimable(&self) -> impl Iterator<Item = &Mission> {
        self.missions.iter().filter(|mission| mission.is_claimable())
    }
}
