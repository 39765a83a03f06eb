//! Per-session result tally

use crate::protocol::RoundOutcome;

/// Wins, losses and ties over one session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl SessionStats {
    pub fn record(&mut self, outcome: RoundOutcome) {
        match outcome {
            RoundOutcome::Win => self.wins += 1,
            RoundOutcome::Loss => self.losses += 1,
            RoundOutcome::Tie => self.ties += 1,
        }
    }

    pub fn rounds(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Fraction of rounds won, 0.0 for an empty session
    pub fn win_rate(&self) -> f64 {
        match self.rounds() {
            0 => 0.0,
            n => f64::from(self.wins) / f64::from(n),
        }
    }
}
