use crate::combat::AttackContext;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::game::{Game, Pending};
use crate::player::PlayerId;
use crate::trade::has_tradeable_set;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Hands larger than this are traded down automatically when Deploy begins.
pub const DEPLOY_FORCED_TRADE_ABOVE: usize = 4;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TurnPhase {
    Start,
    Deploy,
    Attack,
    Fortify,
    EndGame,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PhaseEvent {
    SetupComplete,
    Advance,
    Won,
}

impl TurnPhase {
    /// Transition table. `None` means the event is not accepted in this phase.
    pub fn next(self, event: PhaseEvent) -> Option<TurnPhase> {
        use PhaseEvent::*;
        use TurnPhase::*;
        match (self, event) {
            (EndGame, _) => None,
            (_, Won) => Some(EndGame),
            (Start, SetupComplete) => Some(Deploy),
            (Deploy, Advance) => Some(Attack),
            (Attack, Advance) => Some(Fortify),
            (Fortify, Advance) => Some(Deploy),
            _ => None,
        }
    }
}

impl Game {
    /// Leaves the current phase. Fortify hands the turn to the next player.
    pub fn advance_phase(&mut self) -> Result<TurnPhase, GameError> {
        match self.turn_phase {
            TurnPhase::Start => {
                return Err(GameError::InvalidTransition(
                    "initial troops are still being placed".to_string(),
                ))
            }
            TurnPhase::EndGame => {
                return Err(GameError::InvalidTransition("the game is over".to_string()))
            }
            TurnPhase::Deploy => {
                let remaining = self.players[self.current_player().0].troops_to_deploy;
                if remaining > 0 {
                    return Err(GameError::InvalidTransition(format!(
                        "{} troops still have to be deployed",
                        remaining
                    )));
                }
            }
            TurnPhase::Attack => {
                if let Some(Pending::Attack(AttackContext {
                    attack_dice: Some(_),
                    ..
                })) = self.pending
                {
                    return Err(GameError::InvalidTransition(
                        "the defender still has to declare dice".to_string(),
                    ));
                }
            }
            TurnPhase::Fortify => {}
        }

        self.pending = None;
        if self.turn_phase == TurnPhase::Fortify {
            self.end_turn();
        } else {
            self.enter_phase(PhaseEvent::Advance);
        }
        Ok(self.turn_phase)
    }

    /// Applies a transition and runs the entry work of the new phase. Every
    /// entry outside Start first resolves eliminations and checks for a winner.
    pub(crate) fn enter_phase(&mut self, event: PhaseEvent) {
        let Some(next) = self.turn_phase.next(event) else {
            return;
        };

        if next != TurnPhase::Start {
            if let Some(winner) = self.check_win() {
                self.finish(winner);
                return;
            }
        }

        self.turn_phase = next;
        let player = self.current_player();
        info!(player = %player, phase = ?next, round = self.round, "phase changed");
        self.notify(GameEvent::PhaseChanged { player, phase: next });

        if next == TurnPhase::Deploy {
            self.begin_deploy();
        }
    }

    fn finish(&mut self, winner: PlayerId) {
        if let Some(next) = self.turn_phase.next(PhaseEvent::Won) {
            self.turn_phase = next;
        }
        self.winner = Some(winner);
        self.pending = None;
        info!(player = %winner, "game won");
        self.notify(GameEvent::GameWon { player: winner });
    }

    fn begin_deploy(&mut self) {
        let player_id = self.current_player();
        let reinforcements = self.calculate_reinforcements(player_id);
        let continents = self
            .board
            .continents_held(&self.players[player_id.0].territories);

        let player = &mut self.players[player_id.0];
        player.continents = continents;
        player.troops_to_deploy += reinforcements;

        let hand = &player.cards;
        if !has_tradeable_set(hand) {
            return;
        }
        if hand.len() <= DEPLOY_FORCED_TRADE_ABOVE {
            self.notify(GameEvent::TradeOffered { player: player_id });
            return;
        }
        if let Err(err) = self.trade_down(player_id, DEPLOY_FORCED_TRADE_ABOVE + 1) {
            warn!(player = %player_id, %err, "forced trade failed");
        }
    }

    /// Draws the conquest card, clears per-turn flags and passes play to the
    /// next active player.
    pub(crate) fn end_turn(&mut self) {
        let player_id = self.current_player();
        if self.conquered_territory {
            match self.deck.try_draw() {
                Ok(card) => {
                    self.players[player_id.0].cards.add(card);
                    self.notify(GameEvent::CardDrawn { player: player_id });
                }
                Err(err) => {
                    warn!(player = %player_id, %err, "no card drawn");
                    self.notify(GameEvent::DeckExhausted { player: player_id });
                }
            }
        }

        self.conquered_territory = false;
        self.fortified = false;
        self.pending = None;
        self.players[player_id.0].received_bonus_troops = false;

        self.resolve_eliminations();
        let next_index = (self.current_turn + 1) % self.active_players.len();
        if next_index == 0 {
            self.round += 1;
        }
        self.current_turn = next_index;
        let next = self.current_player();
        info!(player = %player_id, next = %next, "turn ended");
        self.notify(GameEvent::TurnEnded {
            player: player_id,
            next,
        });

        self.enter_phase(PhaseEvent::Advance);
    }

    /// Rebuilds the rotation from the player registry, dropping everyone who
    /// holds no territory, and re-anchors the turn index on the current player.
    pub(crate) fn resolve_eliminations(&mut self) {
        let current = self.current_player();
        let rotation: Vec<PlayerId> = self
            .active_players
            .iter()
            .copied()
            .filter(|id| !self.players[id.0].is_defeated())
            .collect();

        if rotation.len() == self.active_players.len() {
            return;
        }
        self.current_turn = match rotation.iter().position(|&id| id == current) {
            Some(index) => index,
            // The current player is gone: whoever followed them now sits at
            // the same index.
            None => self.current_turn.min(rotation.len().saturating_sub(1)),
        };
        self.active_players = rotation;
        info!(active = ?self.active_players, "rotation rebuilt");
    }

    /// Drops defeated players and returns the winner once a single player
    /// remains.
    pub fn check_win(&mut self) -> Option<PlayerId> {
        self.resolve_eliminations();
        match self.active_players.as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use PhaseEvent::*;
        use TurnPhase::*;
        assert_eq!(Start.next(SetupComplete), Some(Deploy));
        assert_eq!(Start.next(Advance), None);
        assert_eq!(Deploy.next(Advance), Some(Attack));
        assert_eq!(Attack.next(Advance), Some(Fortify));
        assert_eq!(Fortify.next(Advance), Some(Deploy));
        assert_eq!(Attack.next(Won), Some(EndGame));
        assert_eq!(EndGame.next(Advance), None);
        assert_eq!(EndGame.next(Won), None);
    }
}
