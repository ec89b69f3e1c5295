use ordered_float::OrderedFloat;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    pub id: String,
    pub name: String,
    pub entry_price: f64,
    #[serde(default)]
    pub prize: f64,
    #[serde(default)]
    pub player_count: u32,
    #[serde(default)]
    pub is_archived: bool,
}

/// The tournaments offered to the player: never archived, always cheapest first.
///
/// The only way to fill a `Presets` is through [`Presets::assign`] (or `From`), so the ordering holds
/// for every value the session ever exposes, whether it came from the cache, a fetch or a listener.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Presets(Vec<TournamentConfig>);

impl Presets {
    /// Returns true if the visible list changed.
    pub fn assign(&mut self, configs: Vec<TournamentConfig>) -> bool {
        let presets = Self::from(configs);
        if *self == presets {
            return false;
        }
        *self = presets;
        true
    }

    pub fn as_slice(&self) -> &[TournamentConfig] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &TournamentConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&TournamentConfig> {
        self.0.iter().find(|config| config.id == id)
    }
}

impl From<Vec<TournamentConfig>> for Presets {
    fn from(mut configs: Vec<TournamentConfig>) -> Self {
        configs.retain(|config| !config.is_archived);
        // stable, so equal prices keep the order the server sent
        configs.sort_by_key(|config| OrderedFloat(config.entry_price));
        Self(configs)
    }
}

/// Entry tiers for blitz mode.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlitzDefinition {
    pub entry_price: f64,
    pub multiplier: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlitzDefinitions {
    #[serde(default)]
    pub definitions: Vec<BlitzDefinition>,
}
