use crate::error::GameError;
use crate::event::GameEvent;
use crate::game::{Game, Pending};
use crate::interaction::{CountKind, CountRequest};
use crate::player::PlayerId;
use crate::territory::TerritoryId;
use crate::trade::TradeOutcome;
use crate::turn_phase::TurnPhase;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const MAX_ATTACK_DICE: u16 = 3;
pub const MAX_DEFEND_DICE: u16 = 2;
/// Hands at or above this size are traded down after taking over a
/// defeated player's cards.
pub const ELIMINATION_TRADE_THRESHOLD: usize = 4;

/// The attacking and defending territories of an attack in progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttackContext {
    pub attacker: TerritoryId,
    pub defender: TerritoryId,
    pub attack_dice: Option<u16>,
}

/// Result of comparing one roll of dice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollResolution {
    pub pairs_compared: u16,
    pub attacker_losses: u16,
    pub defender_losses: u16,
    pub captured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleReport {
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub attacker_rolls: Vec<u16>,
    pub defender_rolls: Vec<u16>,
    pub attacker_losses: u16,
    pub defender_losses: u16,
    pub captured: bool,
    pub defender_eliminated: bool,
    pub forced_trades: Vec<TradeOutcome>,
}

pub fn sort_descending(rolls: &[u16]) -> Vec<u16> {
    rolls.iter().copied().sorted_by(|a, b| b.cmp(a)).collect()
}

/// Compares the highest attacker die with the highest defender die, then the
/// next pair, and so on. The attacker needs a strictly higher face; ties go to
/// the defender. Once the defender's last troop falls no further pairs are
/// compared.
pub fn resolve_rolls(attacker_rolls: &[u16], defender_rolls: &[u16], defender_troops: u16) -> RollResolution {
    let attack = sort_descending(attacker_rolls);
    let defend = sort_descending(defender_rolls);
    let mut resolution = RollResolution::default();

    for (a, d) in attack.iter().zip(defend.iter()) {
        resolution.pairs_compared += 1;
        if a > d {
            resolution.defender_losses += 1;
            if resolution.defender_losses >= defender_troops {
                resolution.captured = true;
                break;
            }
        } else {
            resolution.attacker_losses += 1;
        }
    }
    resolution
}

pub fn max_attack_dice(troops: u16) -> u16 {
    troops.saturating_sub(1).min(MAX_ATTACK_DICE)
}

pub fn max_defend_dice(troops: u16) -> u16 {
    troops.min(MAX_DEFEND_DICE)
}

impl Game {
    /// Selects `from` to attack `to` and asks the attacker for a dice count.
    pub fn start_attack(&mut self, from: TerritoryId, to: TerritoryId) -> Result<CountRequest, GameError> {
        if self.turn_phase != TurnPhase::Attack {
            return Err(GameError::InvalidTransition("it's not the attack phase".to_string()));
        }
        if let Some(Pending::Attack(AttackContext {
            attack_dice: Some(_),
            ..
        })) = self.pending
        {
            return Err(GameError::InvalidTransition(
                "the defender still has to declare dice".to_string(),
            ));
        }

        let attacker_id = self.current_player();
        let attacking = self.board.get_territory(from)?;
        let defending = self.board.get_territory(to)?;
        if !attacking.is_owned_by(attacker_id) {
            return Err(GameError::InvalidTarget(format!(
                "{} does not belong to the attacker",
                attacking.name
            )));
        }
        if attacking.troops < 2 {
            return Err(GameError::InsufficientTroops {
                requested: 2,
                available: attacking.troops,
            });
        }
        if !attacking.is_adjacent(to) {
            return Err(GameError::InvalidTarget(format!(
                "{} is not adjacent to {}",
                defending.name, attacking.name
            )));
        }
        if defending.owner.is_none() || defending.is_owned_by(attacker_id) {
            return Err(GameError::InvalidTarget(format!(
                "{} is not held by an opponent",
                defending.name
            )));
        }

        let request = CountRequest {
            kind: CountKind::AttackDice,
            player: attacker_id,
            min: 1,
            max: max_attack_dice(attacking.troops),
        };
        self.pending = Some(Pending::Attack(AttackContext {
            attacker: from,
            defender: to,
            attack_dice: None,
        }));
        Ok(request)
    }

    /// Records the attacker's dice and asks the defender for theirs.
    pub fn declare_attack_dice(&mut self, dice: u16) -> Result<CountRequest, GameError> {
        let context = match self.pending {
            Some(Pending::Attack(context)) if context.attack_dice.is_none() => context,
            _ => {
                return Err(GameError::InvalidTransition(
                    "no attack is waiting for attacker dice".to_string(),
                ))
            }
        };

        let attacking = self.board.territory(context.attacker);
        CountRequest {
            kind: CountKind::AttackDice,
            player: self.current_player(),
            min: 1,
            max: max_attack_dice(attacking.troops),
        }
        .check(dice)?;

        let defending = self.board.territory(context.defender);
        let request = CountRequest {
            kind: CountKind::DefendDice,
            player: defending.owner.ok_or_else(|| {
                GameError::InvalidTarget(format!("{} has no owner", defending.name))
            })?,
            min: 1,
            max: max_defend_dice(defending.troops),
        };
        self.pending = Some(Pending::Attack(AttackContext {
            attack_dice: Some(dice),
            ..context
        }));
        Ok(request)
    }

    /// Records the defender's dice, rolls both sides and applies the outcome.
    pub fn declare_defend_dice(&mut self, dice: u16) -> Result<BattleReport, GameError> {
        let (context, attack_dice) = match self.pending {
            Some(Pending::Attack(context)) => match context.attack_dice {
                Some(attack_dice) => (context, attack_dice),
                None => {
                    return Err(GameError::InvalidTransition(
                        "the attacker has not declared dice yet".to_string(),
                    ))
                }
            },
            _ => return Err(GameError::InvalidTransition("no attack in progress".to_string())),
        };

        let defending = self.board.territory(context.defender);
        let defender_id = defending.owner.ok_or_else(|| {
            GameError::InvalidTarget(format!("{} has no owner", defending.name))
        })?;
        CountRequest {
            kind: CountKind::DefendDice,
            player: defender_id,
            min: 1,
            max: max_defend_dice(defending.troops),
        }
        .check(dice)?;

        self.pending = None;
        let attacker_rolls = sort_descending(&self.dice.roll_many(attack_dice));
        let defender_rolls = sort_descending(&self.dice.roll_many(dice));
        debug!(?attacker_rolls, ?defender_rolls, "dice rolled");

        self.resolve_battle(context, defender_id, attacker_rolls, defender_rolls)
    }

    /// Applies already rolled dice to the territories in `context`.
    pub(crate) fn resolve_battle(
        &mut self,
        context: AttackContext,
        defender_id: PlayerId,
        attacker_rolls: Vec<u16>,
        defender_rolls: Vec<u16>,
    ) -> Result<BattleReport, GameError> {
        let attacker_id = self.current_player();
        let (from, to) = (context.attacker, context.defender);
        let resolution = resolve_rolls(&attacker_rolls, &defender_rolls, self.board.territory(to).troops);

        self.board.territory_mut(from).troops -= resolution.attacker_losses;
        self.board.territory_mut(to).troops -= resolution.defender_losses;

        let mut report = BattleReport {
            attacker: attacker_id,
            defender: defender_id,
            from,
            to,
            attacker_rolls,
            defender_rolls,
            attacker_losses: resolution.attacker_losses,
            defender_losses: resolution.defender_losses,
            captured: resolution.captured,
            defender_eliminated: false,
            forced_trades: Vec::new(),
        };

        if resolution.captured {
            self.capture(from, to, attacker_id, defender_id);
            if self.players[defender_id.0].is_defeated() {
                report.defender_eliminated = true;
                report.forced_trades = self.eliminate(defender_id, attacker_id)?;
            }
        }

        self.notify(GameEvent::BattleResolved {
            report: report.clone(),
        });
        Ok(report)
    }

    fn capture(&mut self, from: TerritoryId, to: TerritoryId, attacker: PlayerId, defender: PlayerId) {
        self.set_owner(to, attacker);
        self.board.territory_mut(from).troops -= 1;
        self.board.territory_mut(to).troops += 1;
        self.conquered_territory = true;

        info!(
            territory = %self.board.territory_name(to),
            from = %defender,
            by = %attacker,
            "territory captured"
        );
        self.notify(GameEvent::TerritoryCaptured {
            territory: to,
            from: defender,
            by: attacker,
        });
    }

    fn eliminate(&mut self, defeated: PlayerId, by: PlayerId) -> Result<Vec<TradeOutcome>, GameError> {
        let cards = self.players[defeated.0].cards.take_all();
        info!(player = %defeated, by = %by, cards = cards.len(), "player eliminated");
        self.players[by.0].cards.add_all(cards);
        self.notify(GameEvent::PlayerEliminated { player: defeated, by });

        self.trade_down(by, ELIMINATION_TRADE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_pair_capture() {
        let resolution = resolve_rolls(&[6, 4], &[5], 1);
        assert_eq!(
            resolution,
            RollResolution {
                pairs_compared: 1,
                attacker_losses: 0,
                defender_losses: 1,
                captured: true,
            }
        );
    }

    #[test]
    fn ties_favour_the_defender() {
        let resolution = resolve_rolls(&[3, 3, 3], &[3, 2], 5);
        assert_eq!(resolution.attacker_losses, 1);
        assert_eq!(resolution.defender_losses, 1);
        assert!(!resolution.captured);
    }

    #[test]
    fn dice_are_compared_highest_first() {
        // Unsorted input: 6 meets 5 and 1 meets 4.
        let resolution = resolve_rolls(&[1, 6], &[4, 5], 5);
        assert_eq!(resolution.attacker_losses, 1);
        assert_eq!(resolution.defender_losses, 1);
    }

    #[test]
    fn capture_stops_the_roll() {
        let resolution = resolve_rolls(&[6, 6], &[1, 1], 1);
        assert_eq!(resolution.pairs_compared, 1);
        assert_eq!(resolution.defender_losses, 1);
        assert!(resolution.captured);
    }

    #[test]
    fn dice_limits_follow_troops() {
        assert_eq!(max_attack_dice(1), 0);
        assert_eq!(max_attack_dice(3), 2);
        assert_eq!(max_attack_dice(10), 3);
        assert_eq!(max_defend_dice(1), 1);
        assert_eq!(max_defend_dice(7), 2);
    }

    proptest! {
        #[test]
        fn prop_losses_match_pairs_compared(
            attack in proptest::collection::vec(1u16..=6, 1..=3),
            defend in proptest::collection::vec(1u16..=6, 1..=2),
            defender_troops in 1u16..10,
        ) {
            let resolution = resolve_rolls(&attack, &defend, defender_troops);
            prop_assert_eq!(
                resolution.attacker_losses + resolution.defender_losses,
                resolution.pairs_compared
            );
            prop_assert!(resolution.pairs_compared as usize <= attack.len().min(defend.len()));
            prop_assert!(resolution.defender_losses <= defender_troops);
            prop_assert_eq!(resolution.captured, resolution.defender_losses == defender_troops);
        }
    }
}
