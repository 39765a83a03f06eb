//! Server-side round state machine
//!
//! Drives one round from the initial deal to a final result:
//!
//! ```text
//! Dealt -> PlayerTurn -> DealerReveal -> DealerTurn -> Settled
//!              |                             |
//!              +-- player bust (LOSS)        +-- dealer bust (WIN)
//! ```
//!
//! A bust ends the round on the packet that delivers the busting card. Only a
//! round where nobody busts reaches `Settled`, which sends a card-less payload
//! with the comparison result.

use tokio::io::{AsyncRead, AsyncWrite};

use super::{GameResult, DEALER_STAND_ON};
use crate::deck::{Deck, Hand};
use crate::network::Connection;
use crate::protocol::{Card, Decision, Payload, RoundOutcome, RoundResult};

/// States of a dealer round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    /// Initial cards are about to be dealt
    Dealt,
    /// Waiting for player decisions
    PlayerTurn,
    /// Player stood, hole card is about to be shown
    DealerReveal,
    /// Dealer draws to 17
    DealerTurn,
    /// Round over
    Settled,
}

/// One round on the dealer's side of the table
#[derive(Debug)]
pub struct DealerRound {
    deck: Deck,
    player: Hand,
    dealer: Hand,
    hole_card: Option<Card>,
    state: RoundState,
    outcome: Option<RoundOutcome>,
}

impl DealerRound {
    pub fn new(deck: Deck) -> Self {
        Self {
            deck,
            player: Hand::new(),
            dealer: Hand::new(),
            hole_card: None,
            state: RoundState::Dealt,
            outcome: None,
        }
    }

    pub fn player(&self) -> &Hand {
        &self.player
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    fn transition(&mut self, next: RoundState) {
        tracing::debug!("Round state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Send the packet that ends the round and record its result
    async fn finish<S>(
        &mut self,
        conn: &mut Connection<S>,
        payload: Payload,
        outcome: RoundOutcome,
    ) -> GameResult<RoundOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        conn.send_payload(&payload).await?;
        self.transition(RoundState::Settled);
        self.outcome = Some(outcome);

        tracing::info!(
            "Round with {} finished: {} (player {}, dealer {})",
            conn.remote_addr(),
            outcome,
            self.player.total(),
            self.dealer.total()
        );
        tracing::debug!("{} cards left undealt", self.deck.remaining());
        Ok(outcome)
    }

    /// Play the round to completion over `conn`
    ///
    /// Returns the result from the player's point of view. Calling this on a
    /// settled round returns the recorded result without touching the stream.
    pub async fn play<S>(&mut self, conn: &mut Connection<S>) -> GameResult<RoundOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            match self.state {
                RoundState::Dealt => {
                    let first = self.deck.draw()?;
                    let second = self.deck.draw()?;
                    let up_card = self.deck.draw()?;
                    let hole_card = self.deck.draw()?;

                    self.player.push(first);
                    self.player.push(second);
                    self.dealer.push(up_card);
                    self.dealer.push(hole_card);
                    self.hole_card = Some(hole_card);

                    for card in [first, second, up_card] {
                        conn.send_payload(&Payload::card(card, RoundResult::NotOver))
                            .await?;
                    }
                    self.transition(RoundState::PlayerTurn);
                }

                RoundState::PlayerTurn => {
                    match conn.recv_decision().await? {
                        Decision::Hit => {
                            let card = self.deck.draw()?;
                            self.player.push(card);

                            if self.player.is_bust() {
                                let payload = Payload::card(card, RoundResult::Loss);
                                return self.finish(conn, payload, RoundOutcome::Loss).await;
                            }
                            conn.send_payload(&Payload::card(card, RoundResult::NotOver))
                                .await?;
                        }
                        Decision::Stand => self.transition(RoundState::DealerReveal),
                        other => {
                            tracing::warn!(
                                "Unrecognized decision {:?} from {}, treating as stand",
                                other,
                                conn.remote_addr()
                            );
                            self.transition(RoundState::DealerReveal);
                        }
                    }
                }

                RoundState::DealerReveal => {
                    if let Some(card) = self.hole_card {
                        conn.send_payload(&Payload::card(card, RoundResult::NotOver))
                            .await?;
                    }
                    self.transition(RoundState::DealerTurn);
                }

                RoundState::DealerTurn => {
                    if self.dealer.total() >= DEALER_STAND_ON {
                        self.transition(RoundState::Settled);
                        continue;
                    }

                    let card = self.deck.draw()?;
                    self.dealer.push(card);

                    if self.dealer.is_bust() {
                        let payload = Payload::card(card, RoundResult::Win);
                        return self.finish(conn, payload, RoundOutcome::Win).await;
                    }
                    conn.send_payload(&Payload::card(card, RoundResult::NotOver))
                        .await?;
                }

                RoundState::Settled => {
                    if let Some(outcome) = self.outcome {
                        return Ok(outcome);
                    }

                    let outcome = match self.player.total().cmp(&self.dealer.total()) {
                        std::cmp::Ordering::Greater => RoundOutcome::Win,
                        std::cmp::Ordering::Less => RoundOutcome::Loss,
                        std::cmp::Ordering::Equal => RoundOutcome::Tie,
                    };
                    return self
                        .finish(conn, Payload::settlement(outcome), outcome)
                        .await;
                }
            }
        }
    }
}
