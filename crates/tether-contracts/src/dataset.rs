//! Reference dataset types: rarity ranks and item/container catalogs.
//!
//! Loading is an external concern; these are the shapes the policy engine
//! and session read.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Rarity label to integer rank. Higher ranks are rarer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankTable(pub HashMap<String, i64>);

impl RankTable {
    pub fn rank(&self, rarity: &str) -> Option<i64> {
        self.0.get(rarity).copied()
    }

    pub fn insert(&mut self, rarity: impl Into<String>, rank: i64) {
        self.0.insert(rarity.into(), rank);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for RankTable {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
}

/// Everything `LoadReferenceDatasets` produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetBundle {
    #[serde(default)]
    pub ranks: RankTable,
    /// Direct item-definition map keyed by item id.
    #[serde(default)]
    pub items: HashMap<String, ItemDefinition>,
    /// Rarity-bucketed index: rarity label to the item ids in that bucket.
    #[serde(default)]
    pub rarities: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub containers: Vec<ContainerDefinition>,
}

impl DatasetBundle {
    /// Resolve the rarity label for `item_id`: the direct definition map
    /// first, then the bucketed index.
    pub fn rarity_of(&self, item_id: &str) -> Option<&str> {
        if let Some(rarity) = self.items.get(item_id).and_then(|d| d.rarity.as_deref()) {
            return Some(rarity);
        }
        self.rarities
            .iter()
            .find(|(_, ids)| ids.iter().any(|id| id == item_id))
            .map(|(rarity, _)| rarity.as_str())
    }

    pub fn knows_container(&self, catalog_id: &str) -> bool {
        self.containers.iter().any(|c| c.id == catalog_id)
    }
}
