//! Game module - one blackjack round over an open session
//!
//! The server side ([`DealerRound`]) owns the deck and every rule decision.
//! The client side ([`PlayerRound`]) only reacts: it shows the cards it is
//! sent, asks a [`DecisionSource`] whether to hit, and stops at the first
//! payload carrying a final result.

mod dealer;
mod player;
mod stats;

pub use dealer::*;
pub use player::*;
pub use stats::*;

use thiserror::Error;

use crate::deck::DeckError;
use crate::network::ConnectionError;

/// Dealer stands as soon as its total reaches this value
pub const DEALER_STAND_ON: u8 = 17;

/// Game errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Deck error: {0}")]
    Deck(#[from] DeckError),

    #[error("Input error: {0}")]
    Input(std::io::Error),

    #[error("Input closed")]
    InputClosed,
}

pub type GameResult<T> = Result<T, GameError>;

/// The two parties at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Player,
    Dealer,
}
