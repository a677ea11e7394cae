use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArmyType {
    Infantry,
    Cavalry,
    Artillery,
}

impl ArmyType {
    /// Fixed order used whenever the economy has to pick between army types.
    pub const ALL: [ArmyType; 3] = [ArmyType::Infantry, ArmyType::Cavalry, ArmyType::Artillery];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CardKind {
    Territory,
    WildCard,
    Mission,
}

/// A single card. Territory cards carry a territory name and an army type,
/// wild and mission cards carry neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub territory: Option<String>,
    pub army: Option<ArmyType>,
    pub kind: CardKind,
}

impl Card {
    pub fn territory(territory: &str, army: ArmyType) -> Self {
        Self {
            territory: Some(territory.to_string()),
            army: Some(army),
            kind: CardKind::Territory,
        }
    }

    pub fn wild() -> Self {
        Self {
            territory: None,
            army: None,
            kind: CardKind::WildCard,
        }
    }

    pub fn mission() -> Self {
        Self {
            territory: None,
            army: None,
            kind: CardKind::Mission,
        }
    }

    pub fn is_wild(&self) -> bool {
        self.kind == CardKind::WildCard
    }

    pub fn is_mission(&self) -> bool {
        self.kind == CardKind::Mission
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.territory, self.army) {
            (Some(territory), Some(army)) => write!(f, "{} ({:?})", territory, army),
            _ => write!(f, "{:?}", self.kind),
        }
    }
}
