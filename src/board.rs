use crate::continent::{Continent, ContinentId};
use crate::error::GameError;
use crate::player::PlayerId;
use crate::territory::{Territory, TerritoryId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Arena of territories and continents, addressed by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Board {
    pub territories: Vec<Territory>,
    pub continents: Vec<Continent>,
    #[serde(skip)]
    names: HashMap<String, TerritoryId>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_continent(&mut self, name: &str, bonus_armies: u16) -> ContinentId {
        let id = ContinentId(self.continents.len());
        self.continents.push(Continent::new(id, name, bonus_armies));
        id
    }

    pub fn add_territory(&mut self, name: &str, continent: ContinentId) -> TerritoryId {
        let id = TerritoryId(self.territories.len());
        self.territories.push(Territory::new(id, name, continent));
        self.continents[continent.0].add_territory(id);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Adjacency is always stored in both directions.
    pub fn connect(&mut self, a: TerritoryId, b: TerritoryId) {
        self.territories[a.0].add_adjacent(b);
        self.territories[b.0].add_adjacent(a);
    }

    pub fn territory(&self, id: TerritoryId) -> &Territory {
        &self.territories[id.0]
    }

    pub fn territory_mut(&mut self, id: TerritoryId) -> &mut Territory {
        &mut self.territories[id.0]
    }

    pub fn continent(&self, id: ContinentId) -> &Continent {
        &self.continents[id.0]
    }

    pub fn get_territory(&self, id: TerritoryId) -> Result<&Territory, GameError> {
        self.territories
            .get(id.0)
            .ok_or_else(|| GameError::UnknownTerritory(id.to_string()))
    }

    pub fn find(&self, name: &str) -> Result<TerritoryId, GameError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| GameError::UnknownTerritory(name.to_string()))
    }

    pub fn territory_name(&self, id: TerritoryId) -> &str {
        &self.territory(id).name
    }

    pub fn all_territories_owned(&self) -> bool {
        self.territories.iter().all(|t| t.owner.is_some())
    }

    pub fn territories_owned_by(&self, player: PlayerId) -> BTreeSet<TerritoryId> {
        self.territories
            .iter()
            .filter(|t| t.is_owned_by(player))
            .map(|t| t.id)
            .collect()
    }

    pub fn continents_held(&self, owned: &BTreeSet<TerritoryId>) -> BTreeSet<ContinentId> {
        self.continents
            .iter()
            .filter(|c| c.is_held_by(owned))
            .map(|c| c.id)
            .collect()
    }

    pub fn troops_owned_by(&self, player: PlayerId) -> u16 {
        self.territories
            .iter()
            .filter(|t| t.is_owned_by(player))
            .map(|t| t.troops)
            .sum()
    }

    /// Rebuilds the name index, e.g. after deserializing a board.
    pub fn reindex(&mut self) {
        self.names = self
            .territories
            .iter()
            .map(|t| (t.name.clone(), t.id))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continent_is_held_only_when_complete() {
        let mut board = Board::new();
        let oceania = board.add_continent("Oceania", 2);
        let a = board.add_territory("A", oceania);
        let b = board.add_territory("B", oceania);
        board.connect(a, b);

        let mut owned = BTreeSet::new();
        owned.insert(a);
        assert!(board.continents_held(&owned).is_empty());
        owned.insert(b);
        assert_eq!(board.continents_held(&owned).len(), 1);
        assert!(board.territory(b).is_adjacent(a));
    }

    #[test]
    fn lookup_by_name() {
        let mut board = Board::new();
        let c = board.add_continent("C", 1);
        let a = board.add_territory("Alpha", c);
        assert_eq!(board.find("Alpha"), Ok(a));
        assert_eq!(
            board.find("Beta"),
            Err(GameError::UnknownTerritory("Beta".to_string()))
        );
    }

    #[test]
    fn names_survive_a_json_round_trip_after_reindex() {
        let mut board = Board::new();
        let c = board.add_continent("C", 1);
        let a = board.add_territory("Alpha", c);

        let json = serde_json::to_string(&board).unwrap();
        let mut restored: Board = serde_json::from_str(&json).unwrap();
        assert!(restored.find("Alpha").is_err());
        restored.reindex();
        assert_eq!(restored.find("Alpha"), Ok(a));
    }
}
