use crate::continent::ContinentId;
use crate::deck::Deck;
use crate::territory::TerritoryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub colour: String,
    pub territories: BTreeSet<TerritoryId>,
    pub continents: BTreeSet<ContinentId>,
    pub cards: Deck,
    pub troops_to_deploy: u16,
    pub total_armies: u16,
    pub received_bonus_troops: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: &str, colour: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            colour: colour.to_string(),
            territories: BTreeSet::new(),
            continents: BTreeSet::new(),
            cards: Deck::new(),
            troops_to_deploy: 0,
            total_armies: 0,
            received_bonus_troops: false,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.territories.is_empty()
    }

    /// Base reinforcement before continent bonuses: a third of the owned
    /// territories, never less than three.
    pub fn base_reinforcements(&self) -> u16 {
        std::cmp::max(self.territories.len() as u16 / 3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_reinforcements_has_a_floor_of_three() {
        let mut player = Player::new(PlayerId(0), "Ada", "#ff0000");
        for i in 0..8 {
            player.territories.insert(TerritoryId(i));
        }
        assert_eq!(player.base_reinforcements(), 3);
        for i in 8..14 {
            player.territories.insert(TerritoryId(i));
        }
        assert_eq!(player.base_reinforcements(), 4);
    }
}
