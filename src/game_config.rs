use crate::board::Board;
use crate::card::{ArmyType, Card};
use crate::deck::Deck;
use crate::error::ConfigError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

lazy_static! {
    static ref COLOUR: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

/// Static game data plus the player roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
    pub territories: Vec<TerritoryConfig>,
    pub continents: Vec<ContinentConfig>,
    #[serde(default)]
    pub cards: Vec<CardConfig>,
    #[serde(default)]
    pub wild_cards: usize,
    #[serde(default)]
    pub mission_cards: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    pub colour: String,
    #[serde(default)]
    pub territories: Vec<PlayerTerritoryConfig>,
    #[serde(default)]
    pub cards: Vec<CardConfig>,
    #[serde(default)]
    pub troops_to_deploy: u16,
}

impl PlayerConfig {
    pub fn new(name: &str, colour: &str) -> Self {
        Self {
            name: name.to_string(),
            colour: colour.to_string(),
            territories: Vec::new(),
            cards: Vec::new(),
            troops_to_deploy: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerTerritoryConfig {
    pub name: String,
    pub armies: u16,
}

/// A card entry. Entries without a territory are wild cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    pub territory: Option<String>,
    pub army: Option<ArmyType>,
}

impl CardConfig {
    fn to_card(&self) -> Card {
        match (&self.territory, self.army) {
            (Some(territory), Some(army)) => Card::territory(territory, army),
            _ => Card::wild(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryConfig {
    pub name: String,
    pub continent: String,
    pub adjacent_territories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinentConfig {
    pub name: String,
    pub bonus_armies: u16,
    pub territories: Vec<String>,
}

impl GameConfig {
    /// The classic 42 territory world map without any players.
    pub fn default_map() -> Self {
        let config_data = include_str!("config.json");
        serde_json::from_str(config_data).expect("embedded map is valid JSON")
    }

    pub fn load_from_file(filename: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(filename)?;
        let config: GameConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn with_players(mut self, players: Vec<PlayerConfig>) -> Self {
        self.players = players;
        self
    }

    /// True when the roster already owns the map and the claiming phase is skipped.
    pub fn has_preassigned_territories(&self) -> bool {
        self.players.iter().any(|p| !p.territories.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_map()?;
        self.validate_cards()?;
        self.validate_players()
    }

    fn validate_map(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for territory in &self.territories {
            if !names.insert(territory.name.as_str()) {
                return invalid(format!("duplicate territory '{}'", territory.name));
            }
        }

        let mut membership: HashMap<&str, &str> = HashMap::new();
        for continent in &self.continents {
            for territory in &continent.territories {
                if !names.contains(territory.as_str()) {
                    return invalid(format!(
                        "continent '{}' lists unknown territory '{}'",
                        continent.name, territory
                    ));
                }
                if membership.insert(territory, &continent.name).is_some() {
                    return invalid(format!("territory '{}' is in two continents", territory));
                }
            }
        }

        let adjacency: HashMap<&str, &Vec<String>> = self
            .territories
            .iter()
            .map(|t| (t.name.as_str(), &t.adjacent_territories))
            .collect();

        for territory in &self.territories {
            if membership.get(territory.name.as_str()) != Some(&territory.continent.as_str()) {
                return invalid(format!(
                    "territory '{}' is not listed by continent '{}'",
                    territory.name, territory.continent
                ));
            }
            for adjacent in &territory.adjacent_territories {
                match adjacency.get(adjacent.as_str()) {
                    None => {
                        return invalid(format!(
                            "'{}' borders unknown territory '{}'",
                            territory.name, adjacent
                        ))
                    }
                    Some(back) if !back.contains(&territory.name) => {
                        return invalid(format!(
                            "adjacency between '{}' and '{}' is one-sided",
                            territory.name, adjacent
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    fn validate_cards(&self) -> Result<(), ConfigError> {
        let cards = self
            .cards
            .iter()
            .chain(self.players.iter().flat_map(|p| p.cards.iter()));
        for card in cards {
            if let Some(territory) = &card.territory {
                if !self.territories.iter().any(|t| &t.name == territory) {
                    return invalid(format!("card names unknown territory '{}'", territory));
                }
                if card.army.is_none() {
                    return invalid(format!("card for '{}' has no army type", territory));
                }
            }
        }
        Ok(())
    }

    fn validate_players(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.players.len()) {
            return invalid(format!(
                "a game needs {} to {} players, got {}",
                MIN_PLAYERS,
                MAX_PLAYERS,
                self.players.len()
            ));
        }

        let mut names = HashSet::new();
        for player in &self.players {
            let name = player.name.trim();
            if !(2..=13).contains(&name.chars().count()) {
                return invalid(format!("player name '{}' must be 2-13 characters", name));
            }
            if !names.insert(name) {
                return invalid(format!("player name '{}' is not unique", name));
            }
            if !COLOUR.is_match(&player.colour) {
                return invalid(format!(
                    "colour '{}' of '{}' is not #RRGGBB",
                    player.colour, name
                ));
            }
        }

        if !self.has_preassigned_territories() {
            // Everyone has to be able to claim a territory during setup.
            if self.players.len() > self.territories.len() {
                return invalid(format!(
                    "{} players cannot share a map of {} territories",
                    self.players.len(),
                    self.territories.len()
                ));
            }
            return Ok(());
        }

        let mut assigned = HashSet::new();
        for player in &self.players {
            for territory in &player.territories {
                if !self.territories.iter().any(|t| t.name == territory.name) {
                    return invalid(format!("'{}' owns unknown territory '{}'", player.name, territory.name));
                }
                if territory.armies == 0 {
                    return invalid(format!("'{}' holds '{}' with no armies", player.name, territory.name));
                }
                if !assigned.insert(territory.name.as_str()) {
                    return invalid(format!("territory '{}' assigned twice", territory.name));
                }
            }
        }
        if let Some(missing) = self
            .territories
            .iter()
            .find(|t| !assigned.contains(t.name.as_str()))
        {
            return invalid(format!("territory '{}' is not assigned", missing.name));
        }
        Ok(())
    }

    /// Builds the territory/continent arena. Assumes `validate` passed.
    pub fn to_board(&self) -> Board {
        let mut board = Board::new();
        let mut continents = HashMap::new();
        for continent_config in &self.continents {
            let id = board.add_continent(&continent_config.name, continent_config.bonus_armies);
            continents.insert(continent_config.name.as_str(), id);
        }

        for territory_config in &self.territories {
            if let Some(&continent) = continents.get(territory_config.continent.as_str()) {
                board.add_territory(&territory_config.name, continent);
            }
        }

        for territory_config in &self.territories {
            for adjacent in &territory_config.adjacent_territories {
                if let (Ok(a), Ok(b)) = (board.find(&territory_config.name), board.find(adjacent)) {
                    board.connect(a, b);
                }
            }
        }
        board
    }

    /// The full card manifest in file order: territory cards, wild cards,
    /// then mission cards.
    pub fn to_deck(&self) -> Deck {
        let mut deck = Deck::from_cards(self.cards.iter().map(CardConfig::to_card));
        deck.add_all((0..self.wild_cards).map(|_| Card::wild()));
        deck.add_all((0..self.mission_cards).map(|_| Card::mission()));
        deck
    }

    pub fn player_cards(player: &PlayerConfig) -> Vec<Card> {
        player.cards.iter().map(CardConfig::to_card).collect()
    }
}

fn invalid<T>(message: String) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<PlayerConfig> {
        vec![
            PlayerConfig::new("Ada", "#ff0000"),
            PlayerConfig::new("Grace", "#0000ff"),
        ]
    }

    #[test]
    fn default_map_is_consistent() {
        let config = GameConfig::default_map().with_players(roster());
        config.validate().unwrap();
        let board = config.to_board();
        assert_eq!(board.territories.len(), 42);
        assert_eq!(board.continents.len(), 6);
        for territory in &board.territories {
            for adjacent in &territory.adjacent_territories {
                assert!(board.territory(*adjacent).is_adjacent(territory.id));
            }
        }
        assert_eq!(config.to_deck().len(), 42 + 2 + 12);
    }

    #[test]
    fn rejects_bad_rosters() {
        let map = GameConfig::default_map();

        let single = map.clone().with_players(vec![PlayerConfig::new("Ada", "#ff0000")]);
        assert!(matches!(single.validate(), Err(ConfigError::Invalid(_))));

        let duplicate = map.clone().with_players(vec![
            PlayerConfig::new("Ada", "#ff0000"),
            PlayerConfig::new(" Ada ", "#00ff00"),
        ]);
        assert!(duplicate.validate().is_err());

        let short = map.clone().with_players(vec![
            PlayerConfig::new("A", "#ff0000"),
            PlayerConfig::new("Grace", "#00ff00"),
        ]);
        assert!(short.validate().is_err());

        let colour = map.with_players(vec![
            PlayerConfig::new("Ada", "red"),
            PlayerConfig::new("Grace", "#00ff00"),
        ]);
        assert!(colour.validate().is_err());
    }

    #[test]
    fn rejects_one_sided_adjacency() {
        let mut config = GameConfig::default_map().with_players(roster());
        config.territories[0].adjacent_territories.push("Argentina".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_more_players_than_territories() {
        let mut config = GameConfig::default_map().with_players(roster());
        config.territories.truncate(1);
        config.continents = vec![ContinentConfig {
            name: config.territories[0].continent.clone(),
            bonus_armies: 1,
            territories: vec![config.territories[0].name.clone()],
        }];
        config.territories[0].adjacent_territories.clear();
        config.cards.clear();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("2 players cannot share a map of 1 territories"));
    }

    #[test]
    fn rejects_partial_assignment() {
        let mut players = roster();
        players[0].territories.push(PlayerTerritoryConfig {
            name: "Alaska".to_string(),
            armies: 1,
        });
        let config = GameConfig::default_map().with_players(players);
        assert!(config.validate().is_err());
    }
}
