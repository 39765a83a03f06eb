//! Protocol message definitions
//!
//! In-memory model of the packets exchanged between a blackjack-net server
//! and its clients. Byte layout lives in the codec; these types only carry
//! validated values.

use std::fmt;

use super::{DECISION_FILLER, DECISION_HIT, DECISION_SIZE, DECISION_STAND};

/// Card suits, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Suit {
    Hearts = 0,
    Diamonds = 1,
    Clubs = 2,
    Spades = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Suit::Hearts),
            1 => Some(Suit::Diamonds),
            2 => Some(Suit::Clubs),
            3 => Some(Suit::Spades),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
        }
    }
}

/// A single playing card
///
/// Rank 1 is the Ace, 11-13 are Jack, Queen and King. Rank 0 never names a
/// card, which is what keeps the empty card slot distinguishable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    rank: u8,
    suit: Suit,
}

impl Card {
    pub const MIN_RANK: u8 = 1;
    pub const MAX_RANK: u8 = 13;

    /// Build a card, returning `None` for a rank outside 1..=13
    pub fn new(rank: u8, suit: Suit) -> Option<Self> {
        (Self::MIN_RANK..=Self::MAX_RANK)
            .contains(&rank)
            .then_some(Self { rank, suit })
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    /// Blackjack point value of this card
    pub fn value(&self) -> u8 {
        crate::deck::card_value(self.rank)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank {
            1 => write!(f, "A")?,
            11 => write!(f, "J")?,
            12 => write!(f, "Q")?,
            13 => write!(f, "K")?,
            n => write!(f, "{}", n)?,
        }
        write!(f, "{}", self.suit.symbol())
    }
}

/// Card field of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSlot {
    /// The packet delivers a card
    Dealt(Card),
    /// The packet carries no card (zero sentinel on the wire)
    Empty,
}

impl From<Card> for CardSlot {
    fn from(card: Card) -> Self {
        CardSlot::Dealt(card)
    }
}

/// Player decision tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Hit,
    Stand,
    /// Server-to-client packets, where the field has no meaning
    Filler,
    /// Anything else a peer put in the field
    Unrecognized([u8; DECISION_SIZE]),
}

impl Decision {
    pub fn to_bytes(&self) -> [u8; DECISION_SIZE] {
        match self {
            Decision::Hit => DECISION_HIT,
            Decision::Stand => DECISION_STAND,
            Decision::Filler => DECISION_FILLER,
            Decision::Unrecognized(raw) => *raw,
        }
    }

    pub fn from_bytes(raw: [u8; DECISION_SIZE]) -> Self {
        match raw {
            DECISION_HIT => Decision::Hit,
            DECISION_STAND => Decision::Stand,
            DECISION_FILLER => Decision::Filler,
            other => Decision::Unrecognized(other),
        }
    }
}

/// Result code carried by every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RoundResult {
    NotOver = 0x0,
    Tie = 0x1,
    Loss = 0x2,
    Win = 0x3,
}

impl RoundResult {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(RoundResult::NotOver),
            0x1 => Some(RoundResult::Tie),
            0x2 => Some(RoundResult::Loss),
            0x3 => Some(RoundResult::Win),
            _ => None,
        }
    }

    /// Terminal outcome, or `None` while the round is still running
    pub fn outcome(&self) -> Option<RoundOutcome> {
        match self {
            RoundResult::NotOver => None,
            RoundResult::Tie => Some(RoundOutcome::Tie),
            RoundResult::Loss => Some(RoundOutcome::Loss),
            RoundResult::Win => Some(RoundOutcome::Win),
        }
    }
}

/// Final result of a round, from the player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Win,
    Loss,
    Tie,
}

impl From<RoundOutcome> for RoundResult {
    fn from(outcome: RoundOutcome) -> Self {
        match outcome {
            RoundOutcome::Win => RoundResult::Win,
            RoundOutcome::Loss => RoundResult::Loss,
            RoundOutcome::Tie => RoundResult::Tie,
        }
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RoundOutcome::Win => "WIN",
            RoundOutcome::Loss => "LOSS",
            RoundOutcome::Tie => "TIE",
        };
        f.write_str(text)
    }
}

/// Server advertisement broadcast over UDP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub tcp_port: u16,
    pub server_name: String,
}

/// Session request sent once by the client right after connecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub rounds: u8,
    pub client_name: String,
}

/// Game packet exchanged in both directions during a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub decision: Decision,
    pub result: RoundResult,
    pub card: CardSlot,
}

impl Payload {
    /// Client decision packet
    pub fn decision(decision: Decision) -> Self {
        Self {
            decision,
            result: RoundResult::NotOver,
            card: CardSlot::Empty,
        }
    }

    /// Server packet delivering a card
    pub fn card(card: Card, result: RoundResult) -> Self {
        Self {
            decision: Decision::Filler,
            result,
            card: CardSlot::Dealt(card),
        }
    }

    /// Server packet closing a round without a card
    pub fn settlement(outcome: RoundOutcome) -> Self {
        Self {
            decision: Decision::Filler,
            result: outcome.into(),
            card: CardSlot::Empty,
        }
    }
}
