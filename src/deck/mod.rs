//! Deck module - single-deck card supply and hand scoring
//!
//! A fresh [`Deck`] is shuffled for every round and discarded afterwards.
//! Aces always count 11; there is no soft-hand reduction in this game.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::protocol::{Card, Suit};

/// Number of cards in a full deck
pub const DECK_SIZE: usize = 52;

/// Totals above this bust a hand
pub const BUST_LIMIT: u8 = 21;

/// Deck errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeckError {
    #[error("Deck is empty")]
    Empty,
}

pub type DeckResult<T> = Result<T, DeckError>;

/// Blackjack point value of a rank
pub fn card_value(rank: u8) -> u8 {
    match rank {
        1 => 11,
        11..=13 => 10,
        _ => rank,
    }
}

/// A single deck consumed from the top
#[derive(Debug, Clone)]
pub struct Deck {
    // The top of the deck is the end of the vector
    cards: Vec<Card>,
}

impl Deck {
    /// All 52 cards in suit-major order
    fn ordered() -> Vec<Card> {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            cards.extend(
                (Card::MIN_RANK..=Card::MAX_RANK).filter_map(|rank| Card::new(rank, suit)),
            );
        }
        cards
    }

    /// A deck shuffled with a freshly seeded generator
    pub fn shuffled() -> Self {
        Self::with_rng(&mut StdRng::from_entropy())
    }

    /// A deck shuffled with the given generator
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut cards = Self::ordered();
        cards.shuffle(rng);
        Self { cards }
    }

    /// A deck that deals the given cards in order
    #[cfg(test)]
    pub fn stacked(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Self { cards }
    }

    /// Remove and return the top card
    pub fn draw(&mut self) -> DeckResult<Card> {
        self.cards.pop().ok_or(DeckError::Empty)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

/// Cards held by one party plus their running total
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
    total: u8,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.total = self.total.saturating_add(card.value());
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn is_bust(&self) -> bool {
        self.total > BUST_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_card_values() {
        assert_eq!(card_value(1), 11);
        for rank in 2..=10 {
            assert_eq!(card_value(rank), rank);
        }
        for rank in 11..=13 {
            assert_eq!(card_value(rank), 10);
        }
    }

    #[test]
    fn test_shuffled_deck_is_complete() {
        let deck = Deck::shuffled();
        assert_eq!(deck.remaining(), DECK_SIZE);

        let distinct: HashSet<Card> = deck.cards.iter().copied().collect();
        assert_eq!(distinct.len(), DECK_SIZE);
    }

    #[test]
    fn test_draw_exhausts_deck() {
        let mut deck = Deck::shuffled();
        let mut seen = HashSet::new();

        for _ in 0..DECK_SIZE {
            let card = deck.draw().unwrap();
            assert!(seen.insert(card), "card {} drawn twice", card);
        }

        assert_eq!(deck.remaining(), 0);
        assert_eq!(seen.len(), DECK_SIZE);
        assert_eq!(deck.draw(), Err(DeckError::Empty));
    }

    #[test]
    fn test_seeded_decks_repeat() {
        let a = Deck::with_rng(&mut StdRng::seed_from_u64(7));
        let b = Deck::with_rng(&mut StdRng::seed_from_u64(7));
        let c = Deck::with_rng(&mut StdRng::seed_from_u64(8));

        assert_eq!(a.cards, b.cards);
        assert_ne!(a.cards, c.cards);
    }

    #[test]
    fn test_stacked_deck_order() {
        let ace = Card::new(1, Suit::Hearts).unwrap();
        let king = Card::new(13, Suit::Spades).unwrap();
        let mut deck = Deck::stacked([ace, king]);

        assert_eq!(deck.draw(), Ok(ace));
        assert_eq!(deck.draw(), Ok(king));
        assert_eq!(deck.draw(), Err(DeckError::Empty));
    }

    #[test]
    fn test_hand_totals() {
        let mut hand = Hand::new();
        hand.push(Card::new(1, Suit::Clubs).unwrap());
        hand.push(Card::new(1, Suit::Hearts).unwrap());
        assert_eq!(hand.total(), 22);
        assert!(hand.is_bust());
        assert_eq!(hand.cards().len(), 2);

        let mut hand = Hand::new();
        hand.push(Card::new(12, Suit::Clubs).unwrap());
        hand.push(Card::new(1, Suit::Hearts).unwrap());
        assert_eq!(hand.total(), 21);
        assert!(!hand.is_bust());
    }
}
