use crate::territory::TerritoryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinentId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Continent {
    pub id: ContinentId,
    pub name: String,
    pub bonus_armies: u16,
    pub territories: BTreeSet<TerritoryId>,
}

impl Continent {
    pub fn new(id: ContinentId, name: &str, bonus_armies: u16) -> Self {
        Self {
            id,
            name: name.to_string(),
            bonus_armies,
            territories: BTreeSet::new(),
        }
    }

    pub fn add_territory(&mut self, territory: TerritoryId) {
        self.territories.insert(territory);
    }

    /// A continent is held when the owned set is a superset of its members.
    pub fn is_held_by(&self, owned: &BTreeSet<TerritoryId>) -> bool {
        !self.territories.is_empty() && self.territories.is_subset(owned)
    }
}
