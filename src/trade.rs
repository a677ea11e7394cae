use crate::card::{ArmyType, Card};
use crate::deck::Deck;
use crate::error::GameError;
use crate::event::GameEvent;
use crate::game::Game;
use crate::player::PlayerId;
use crate::turn_phase::TurnPhase;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

const TRADE_IN_VALUES: [u16; 6] = [4, 6, 8, 10, 12, 15];
const TERRITORY_BONUS: u16 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOutcome {
    pub cards: Vec<Card>,
    pub value: u16,
    pub bonus: bool,
}

impl TradeOutcome {
    /// Troops added to the deploy pool by this trade.
    pub fn troops(&self) -> u16 {
        self.value + if self.bonus { TERRITORY_BONUS } else { 0 }
    }
}

fn army_counts<'a>(cards: impl Iterator<Item = &'a Card>) -> HashMap<ArmyType, usize> {
    cards.filter_map(|card| card.army).counts()
}

pub fn has_tradeable_set(deck: &Deck) -> bool {
    if deck.len() < 3 {
        return false;
    }
    let counts = army_counts(deck.iter());
    ArmyType::ALL.iter().any(|army| counts.get(army).copied().unwrap_or(0) >= 3)
        || deck.iter().any(Card::is_wild)
        || ArmyType::ALL.iter().all(|army| counts.contains_key(army))
}

/// Picks the set to hand in: three of a kind first (Infantry, Cavalry,
/// Artillery in that order), then any wild cards topped up from the front of
/// the deck, then one of each army type.
///
/// Returns fewer than three cards only when `has_tradeable_set` is false.
pub fn select_set_to_trade(deck: &Deck) -> Vec<Card> {
    let counts = army_counts(deck.iter());

    if let Some(army) = ArmyType::ALL
        .into_iter()
        .find(|army| counts.get(army).copied().unwrap_or(0) >= 3)
    {
        return deck
            .iter()
            .filter(|card| card.army == Some(army))
            .take(3)
            .cloned()
            .collect();
    }

    let mut set: Vec<Card> = deck.iter().filter(|card| card.is_wild()).take(3).cloned().collect();
    if !set.is_empty() {
        let missing = 3 - set.len();
        set.extend(deck.iter().filter(|card| !card.is_wild()).take(missing).cloned());
        return set;
    }

    ArmyType::ALL
        .iter()
        .filter_map(|army| deck.iter().find(|card| card.army == Some(*army)))
        .cloned()
        .collect()
}

/// Whether exactly these three cards may be handed in together.
pub fn is_valid_set(cards: &[Card]) -> bool {
    if cards.len() != 3 || cards.iter().any(Card::is_mission) {
        return false;
    }
    if cards.iter().any(Card::is_wild) {
        return true;
    }
    let counts = army_counts(cards.iter());
    counts.len() == 3 || counts.values().any(|&count| count == 3)
}

/// Troops awarded for a trade when `sets_traded` sets have already been
/// handed in across the whole game.
pub fn trade_value(sets_traded: u32) -> u16 {
    match TRADE_IN_VALUES.get(sets_traded as usize) {
        Some(&value) => value,
        None => {
            let beyond = (sets_traded as usize + 1 - TRADE_IN_VALUES.len()) as u16;
            TRADE_IN_VALUES[TRADE_IN_VALUES.len() - 1] + beyond * 5
        }
    }
}

impl Game {
    /// Hands `set` in from `player_id`'s hand and credits the deploy pool.
    pub fn trade_in(&mut self, player_id: PlayerId, set: Vec<Card>) -> Result<TradeOutcome, GameError> {
        if !is_valid_set(&set) {
            return Err(GameError::IllegalSetSelection(format!(
                "{} is not a tradeable set",
                set.iter().join(", ")
            )));
        }

        // Validate against a copy so a missing card leaves the hand untouched.
        let mut remaining = self.player(player_id)?.cards.clone();
        for card in &set {
            if !remaining.remove(card) {
                return Err(GameError::IllegalSetSelection(format!(
                    "{} is not in the hand of {}",
                    card, player_id
                )));
            }
        }

        let owns_named_territory = set.iter().any(|card| {
            card.territory
                .as_deref()
                .and_then(|name| self.board.find(name).ok())
                .map_or(false, |id| self.board.territory(id).is_owned_by(player_id))
        });

        let value = trade_value(self.sets_traded);
        self.sets_traded += 1;

        let player = &mut self.players[player_id.0];
        let bonus = owns_named_territory && !player.received_bonus_troops;
        if bonus {
            player.received_bonus_troops = true;
        }
        player.cards = remaining;

        let outcome = TradeOutcome {
            cards: set.clone(),
            value,
            bonus,
        };
        player.troops_to_deploy += outcome.troops();
        self.discard_pile.extend(set);

        info!(
            player = %player_id,
            value,
            bonus,
            sets_traded = self.sets_traded,
            "traded in card set"
        );
        self.notify(GameEvent::SetTraded {
            player: player_id,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Trade chosen by the current player during their Deploy phase.
    pub fn trade_in_voluntary(&mut self) -> Result<TradeOutcome, GameError> {
        if self.turn_phase != TurnPhase::Deploy {
            return Err(GameError::InvalidTransition(
                "cards can only be traded during the deploy phase".to_string(),
            ));
        }
        let player_id = self.current_player();
        let hand = &self.players[player_id.0].cards;
        if !has_tradeable_set(hand) {
            return Err(GameError::IllegalSetSelection(format!(
                "{} holds no tradeable set",
                player_id
            )));
        }
        let set = select_set_to_trade(hand);
        self.trade_in(player_id, set)
    }

    /// Trades sets away while the hand is at least `threshold` cards and still
    /// contains a set.
    pub(crate) fn trade_down(
        &mut self,
        player_id: PlayerId,
        threshold: usize,
    ) -> Result<Vec<TradeOutcome>, GameError> {
        let mut outcomes = Vec::new();
        loop {
            let hand = &self.players[player_id.0].cards;
            if hand.len() < threshold || !has_tradeable_set(hand) {
                return Ok(outcomes);
            }
            let set = select_set_to_trade(hand);
            outcomes.push(self.trade_in(player_id, set)?);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ArmyType::*;

    fn card(n: usize, army: ArmyType) -> Card {
        Card::territory(&format!("T{}", n), army)
    }

    fn deck_of(armies: &[Option<ArmyType>]) -> Deck {
        Deck::from_cards(armies.iter().enumerate().map(|(n, army)| match army {
            Some(army) => card(n, *army),
            None => Card::wild(),
        }))
    }

    #[test]
    fn trade_values_escalate() {
        assert_eq!(trade_value(0), 4);
        assert_eq!(trade_value(1), 6);
        assert_eq!(trade_value(5), 15);
        assert_eq!(trade_value(6), 20);
        assert_eq!(trade_value(7), 25);
        assert_eq!(trade_value(10), 40);
    }

    #[test]
    fn small_hands_never_trade() {
        assert!(!has_tradeable_set(&deck_of(&[None, None])));
        assert!(select_set_to_trade(&deck_of(&[Some(Infantry), Some(Cavalry)])).len() < 3);
    }

    #[test]
    fn detects_each_kind_of_set() {
        assert!(has_tradeable_set(&deck_of(&[Some(Cavalry), Some(Cavalry), Some(Cavalry)])));
        assert!(has_tradeable_set(&deck_of(&[Some(Infantry), Some(Cavalry), Some(Artillery)])));
        assert!(has_tradeable_set(&deck_of(&[Some(Infantry), Some(Infantry), None])));
        assert!(!has_tradeable_set(&deck_of(&[
            Some(Infantry),
            Some(Infantry),
            Some(Cavalry),
            Some(Cavalry)
        ])));
    }

    #[test]
    fn prefers_three_of_a_kind_over_mixed() {
        let deck = deck_of(&[
            Some(Artillery),
            Some(Infantry),
            Some(Cavalry),
            Some(Artillery),
            None,
            Some(Artillery),
        ]);
        let set = select_set_to_trade(&deck);
        assert_eq!(set.len(), 3);
        assert!(set.iter().all(|c| c.army == Some(Artillery)));
    }

    #[test]
    fn infantry_wins_ties_between_kinds() {
        let deck = deck_of(&[
            Some(Cavalry),
            Some(Cavalry),
            Some(Cavalry),
            Some(Infantry),
            Some(Infantry),
            Some(Infantry),
        ]);
        assert!(select_set_to_trade(&deck).iter().all(|c| c.army == Some(Infantry)));
    }

    #[test]
    fn wild_card_is_topped_up_from_the_front() {
        let deck = deck_of(&[Some(Infantry), Some(Cavalry), None, Some(Cavalry)]);
        let set = select_set_to_trade(&deck);
        assert_eq!(set, vec![Card::wild(), card(0, Infantry), card(1, Cavalry)]);
    }

    #[test]
    fn mixed_set_takes_one_of_each() {
        let deck = deck_of(&[Some(Cavalry), Some(Cavalry), Some(Artillery), Some(Infantry)]);
        let set = select_set_to_trade(&deck);
        assert_eq!(set, vec![card(3, Infantry), card(0, Cavalry), card(2, Artillery)]);
    }

    #[test]
    fn explicit_sets_are_checked() {
        assert!(is_valid_set(&[card(0, Infantry), card(1, Infantry), Card::wild()]));
        assert!(!is_valid_set(&[card(0, Infantry), card(1, Infantry), card(2, Cavalry)]));
        assert!(!is_valid_set(&[card(0, Infantry), card(1, Infantry)]));
        assert!(!is_valid_set(&[Card::mission(), Card::wild(), card(2, Cavalry)]));
    }

    fn arb_card() -> impl Strategy<Value = Option<ArmyType>> {
        prop_oneof![
            Just(Some(Infantry)),
            Just(Some(Cavalry)),
            Just(Some(Artillery)),
            Just(None),
        ]
    }

    proptest! {
        #[test]
        fn prop_tradeable_set_is_monotonic(
            hand in proptest::collection::vec(arb_card(), 0..10),
            extra in arb_card(),
        ) {
            let deck = deck_of(&hand);
            if has_tradeable_set(&deck) {
                let mut grown = hand.clone();
                grown.push(extra);
                prop_assert!(has_tradeable_set(&deck_of(&grown)));
            }
        }

        #[test]
        fn prop_selection_is_a_valid_set_in_priority_order(
            hand in proptest::collection::vec(arb_card(), 3..12),
        ) {
            let deck = deck_of(&hand);
            let set = select_set_to_trade(&deck);
            prop_assert_eq!(has_tradeable_set(&deck), set.len() == 3);
            if set.len() == 3 {
                prop_assert!(is_valid_set(&set));
                let counts = army_counts(deck.iter());
                if let Some(army) = ArmyType::ALL.into_iter().find(|a| counts.get(a).copied().unwrap_or(0) >= 3) {
                    prop_assert!(set.iter().all(|c| c.army == Some(army)));
                }
            }
        }

        #[test]
        fn prop_trade_value_never_decreases(sets in 0u32..200) {
            prop_assert!(trade_value(sets + 1) >= trade_value(sets));
        }
    }
}
