//! Client-side round handling
//!
//! The player never evaluates the rules. It tracks display totals from the
//! cards it receives, forwards hit/stand choices, and takes the first
//! non-NOT_OVER result as the outcome of the round.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::{GameResult, Seat, SessionStats, DEALER_STAND_ON};
use crate::deck::Hand;
use crate::network::Connection;
use crate::protocol::{Card, CardSlot, Decision, Payload, RoundOutcome};

/// Supplies hit/stand choices during the player's turn
#[async_trait]
pub trait DecisionSource: Send {
    /// Decide given the player's hand and the dealer's visible cards
    async fn decide(&mut self, player: &Hand, dealer: &Hand) -> GameResult<Decision>;
}

/// Receives everything the player is allowed to see during a round
pub trait RoundObserver {
    /// A new round is about to be dealt (1-based)
    fn round_started(&mut self, _round: u8, _rounds: u8) {}

    /// A card became visible; `total` is that seat's running total
    fn card_dealt(&mut self, seat: Seat, card: Card, total: u8);

    /// The round ended
    fn round_finished(&mut self, outcome: RoundOutcome, player_total: u8, dealer_total: u8);

    /// Every requested round has been played
    fn session_finished(&mut self, _stats: &SessionStats) {}
}

/// Hits while the player total is below a fixed threshold
#[derive(Debug, Clone, Copy)]
pub struct ThresholdStrategy {
    stand_on: u8,
}

impl ThresholdStrategy {
    pub fn new(stand_on: u8) -> Self {
        Self { stand_on }
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::new(DEALER_STAND_ON)
    }
}

#[async_trait]
impl DecisionSource for ThresholdStrategy {
    async fn decide(&mut self, player: &Hand, _dealer: &Hand) -> GameResult<Decision> {
        if player.total() < self.stand_on {
            Ok(Decision::Hit)
        } else {
            Ok(Decision::Stand)
        }
    }
}

/// One round on the player's side of the table
#[derive(Debug, Default)]
pub struct PlayerRound {
    player: Hand,
    dealer: Hand,
}

impl PlayerRound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the card in a payload (if any) for `seat`
    fn take<O>(&mut self, seat: Seat, slot: CardSlot, observer: &mut O)
    where
        O: RoundObserver + ?Sized,
    {
        let CardSlot::Dealt(card) = slot else {
            return;
        };

        let hand = match seat {
            Seat::Player => &mut self.player,
            Seat::Dealer => &mut self.dealer,
        };
        hand.push(card);
        observer.card_dealt(seat, card, hand.total());
    }

    /// Handle one received payload; returns the outcome if it ends the round
    fn handle<O>(&mut self, seat: Seat, payload: Payload, observer: &mut O) -> Option<RoundOutcome>
    where
        O: RoundObserver + ?Sized,
    {
        // A bust packet carries both the last card and the result
        self.take(seat, payload.card, observer);

        let outcome = payload.result.outcome()?;
        observer.round_finished(outcome, self.player.total(), self.dealer.total());
        Some(outcome)
    }

    /// Play the round to completion over `conn`
    pub async fn play<S, D, O>(
        &mut self,
        conn: &mut Connection<S>,
        decisions: &mut D,
        observer: &mut O,
    ) -> GameResult<RoundOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        D: DecisionSource + ?Sized,
        O: RoundObserver + ?Sized,
    {
        for seat in [Seat::Player, Seat::Player, Seat::Dealer] {
            let payload = conn.recv_payload().await?;
            if let Some(outcome) = self.handle(seat, payload, observer) {
                return Ok(outcome);
            }
        }

        loop {
            let decision = decisions.decide(&self.player, &self.dealer).await?;
            conn.send_payload(&Payload::decision(decision)).await?;

            if decision == Decision::Hit {
                let payload = conn.recv_payload().await?;
                if let Some(outcome) = self.handle(Seat::Player, payload, observer) {
                    return Ok(outcome);
                }
                continue;
            }

            loop {
                let payload = conn.recv_payload().await?;
                if let Some(outcome) = self.handle(Seat::Dealer, payload, observer) {
                    return Ok(outcome);
                }
            }
        }
    }
}
