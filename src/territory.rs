use crate::continent::ContinentId;
use crate::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerritoryId(pub usize);

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the map graph.
///
/// `owner` is `None` exactly while `troops == 0`, which only happens before
/// every territory has been claimed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub continent: ContinentId,
    pub adjacent_territories: BTreeSet<TerritoryId>,
    pub troops: u16,
    pub owner: Option<PlayerId>,
}

impl Territory {
    pub fn new(id: TerritoryId, name: &str, continent: ContinentId) -> Self {
        Self {
            id,
            name: name.to_string(),
            continent,
            adjacent_territories: BTreeSet::new(),
            troops: 0,
            owner: None,
        }
    }

    pub fn add_adjacent(&mut self, adjacent: TerritoryId) {
        self.adjacent_territories.insert(adjacent);
    }

    pub fn is_adjacent(&self, territory: TerritoryId) -> bool {
        self.adjacent_territories.contains(&territory)
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    /// Troops that may leave the territory; one always stays behind.
    pub fn available_troops(&self) -> u16 {
        self.troops.saturating_sub(1)
    }
}
