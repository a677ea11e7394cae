use crate::combat::BattleReport;
use crate::player::PlayerId;
use crate::territory::TerritoryId;
use crate::trade::TradeOutcome;
use crate::turn_phase::TurnPhase;
use serde::Serialize;

/// One-way notifications for whoever presents the game.
///
/// The engine only appends to an outbox; collaborators drain it with
/// `Game::take_events` whenever they like.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum GameEvent {
    TurnOrderDecided {
        order: Vec<PlayerId>,
        rolls: Vec<u16>,
    },
    PhaseChanged {
        player: PlayerId,
        phase: TurnPhase,
    },
    TerritoryClaimed {
        player: PlayerId,
        territory: TerritoryId,
    },
    TroopsDeployed {
        player: PlayerId,
        territory: TerritoryId,
        amount: u16,
    },
    TradeOffered {
        player: PlayerId,
    },
    SetTraded {
        player: PlayerId,
        outcome: TradeOutcome,
    },
    BattleResolved {
        report: BattleReport,
    },
    TerritoryCaptured {
        territory: TerritoryId,
        from: PlayerId,
        by: PlayerId,
    },
    PlayerEliminated {
        player: PlayerId,
        by: PlayerId,
    },
    Fortified {
        player: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
        amount: u16,
    },
    CardDrawn {
        player: PlayerId,
    },
    DeckExhausted {
        player: PlayerId,
    },
    TurnEnded {
        player: PlayerId,
        next: PlayerId,
    },
    GameWon {
        player: PlayerId,
    },
}
