#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositDefinition {
    pub id: String,
    pub amount: f64,
    #[serde(default)]
    pub bonus: f64,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DepositDefinitions(pub Vec<DepositDefinition>);

impl DepositDefinitions {
    pub fn featured(&self) -> Option<&DepositDefinition> {
        self.0.iter().find(|definition| definition.is_featured)
    }
}
