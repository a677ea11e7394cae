use crate::card::Card;
use crate::error::GameError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ordered pile of cards; the front is the next card drawn.
///
/// The deck does not police duplicates, callers keep card identity unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop_front()
    }

    pub fn try_draw(&mut self) -> Result<Card, GameError> {
        self.draw().ok_or(GameError::EmptyDeck)
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push_back(card);
    }

    pub fn add_all(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// Removes the first card equal to `card`. Returns whether one was found.
    pub fn remove(&mut self, card: &Card) -> bool {
        match self.cards.iter().position(|c| c == card) {
            Some(index) => {
                self.cards.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empties the deck, returning its cards in draw order.
    pub fn take_all(&mut self) -> Vec<Card> {
        self.cards.drain(..).collect()
    }

    pub fn remove_mission_cards(&mut self) -> usize {
        let before = self.cards.len();
        self.cards.retain(|card| !card.is_mission());
        before - self.cards.len()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.make_contiguous().shuffle(rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ArmyType;

    fn sample() -> Deck {
        Deck::from_cards(vec![
            Card::territory("Alaska", ArmyType::Infantry),
            Card::mission(),
            Card::territory("Peru", ArmyType::Cavalry),
            Card::wild(),
        ])
    }

    #[test]
    fn draws_from_the_front() {
        let mut deck = sample();
        assert_eq!(deck.draw(), Some(Card::territory("Alaska", ArmyType::Infantry)));
        assert_eq!(deck.len(), 3);
    }

    #[test]
    fn empty_deck_draw_is_recoverable() {
        let mut deck = Deck::new();
        assert_eq!(deck.draw(), None);
        assert_eq!(deck.try_draw(), Err(GameError::EmptyDeck));
    }

    #[test]
    fn strips_missions_and_keeps_order() {
        let mut deck = sample();
        assert_eq!(deck.remove_mission_cards(), 1);
        let names: Vec<_> = deck.iter().map(|c| c.kind).collect();
        assert_eq!(
            names,
            vec![
                crate::card::CardKind::Territory,
                crate::card::CardKind::Territory,
                crate::card::CardKind::WildCard
            ]
        );
    }

    #[test]
    fn remove_and_take_all() {
        let mut deck = sample();
        assert!(deck.remove(&Card::wild()));
        assert!(!deck.remove(&Card::wild()));
        let taken = deck.take_all();
        assert_eq!(taken.len(), 3);
        assert!(deck.is_empty());
    }
}
