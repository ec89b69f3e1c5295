#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherGame {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub app_store_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OtherGameEntry {
    /// The "refer a friend" tile shown ahead of the real games.
    ReferralPlaceholder,
    Game(OtherGame),
}

/// Other games on the platform, as shown in the cross-promotion carousel.
///
/// The list is either empty or starts with [`OtherGameEntry::ReferralPlaceholder`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct OtherGamesList(Vec<OtherGameEntry>);

impl OtherGamesList {
    /// Replaces the list with `fetched`, prefixed by the referral placeholder.
    ///
    /// An empty result never overwrites a non-empty list: the store sometimes answers an overlapping
    /// second fetch with nothing, and that must not wipe the carousel. Returns true if the list changed.
    pub fn assign(&mut self, fetched: Vec<OtherGame>) -> bool {
        if fetched.is_empty() {
            if !self.0.is_empty() {
                log::debug!("Ignoring empty other-games result; keeping {} entries", self.0.len());
            }
            return false;
        }
        let list = Self::from(fetched);
        if *self == list {
            return false;
        }
        *self = list;
        true
    }

    pub fn entries(&self) -> &[OtherGameEntry] {
        &self.0
    }

    pub fn games(&self) -> impl Iterator<Item = &OtherGame> {
        self.0.iter().filter_map(|entry| match entry {
            OtherGameEntry::Game(game) => Some(game),
            OtherGameEntry::ReferralPlaceholder => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<OtherGame>> for OtherGamesList {
    fn from(fetched: Vec<OtherGame>) -> Self {
        if fetched.is_empty() {
            return Self::default();
        }
        let entries = std::iter::once(OtherGameEntry::ReferralPlaceholder)
            .chain(fetched.into_iter().map(OtherGameEntry::Game))
            .collect();
        Self(entries)
    }
}
