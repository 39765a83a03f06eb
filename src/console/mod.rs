//! Console module - operator prompts and round output
//!
//! Provides:
//! - [`Console`]: line-based prompts for the team name, the round count and
//!   hit/stand choices
//! - [`ConsolePresenter`]: prints dealt cards, round results and the session
//!   summary

use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

use crate::deck::Hand;
use crate::game::{DecisionSource, GameError, GameResult, RoundObserver, Seat, SessionStats};
use crate::protocol::{Card, Decision, RoundOutcome};

/// Name used when the operator enters nothing
pub const DEFAULT_CLIENT_NAME: &str = "Client";

/// Line-based prompt reader
pub struct Console<R = BufReader<Stdin>> {
    input: R,
}

impl Console {
    /// Console reading from the process's standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> Console<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Print `prompt` and read one trimmed line
    pub async fn ask(&mut self, prompt: &str) -> GameResult<String> {
        print!("{}", prompt);
        std::io::stdout().flush().map_err(GameError::Input)?;

        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .await
            .map_err(GameError::Input)?;
        if n == 0 {
            return Err(GameError::InputClosed);
        }
        Ok(line.trim().to_string())
    }

    /// Ask for a team name, falling back to [`DEFAULT_CLIENT_NAME`]
    pub async fn prompt_name(&mut self) -> GameResult<String> {
        let name = self.ask("Enter client/team name: ").await?;
        if name.is_empty() {
            Ok(DEFAULT_CLIENT_NAME.to_string())
        } else {
            Ok(name)
        }
    }

    /// Ask for a round count until a value in 1..=255 is entered
    pub async fn prompt_rounds(&mut self) -> GameResult<u8> {
        loop {
            let answer = self.ask("How many rounds? (1-255): ").await?;
            match answer.parse::<u8>() {
                Ok(rounds) if rounds >= 1 => return Ok(rounds),
                _ => println!("Please enter a number between 1 and 255."),
            }
        }
    }
}

#[async_trait]
impl<R> DecisionSource for Console<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn decide(&mut self, player: &Hand, dealer: &Hand) -> GameResult<Decision> {
        let prompt = format!(
            "You hold {} vs dealer {}. Hit or Stand? ",
            describe_hand(player),
            describe_hand(dealer)
        );
        let answer = self.ask(&prompt).await?;

        if answer.to_lowercase().starts_with('h') {
            Ok(Decision::Hit)
        } else {
            Ok(Decision::Stand)
        }
    }
}

/// Prints round progress to standard output
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    dealer_cards: usize,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cards of a hand followed by its total, e.g. `10H 5D (15)`
pub fn describe_hand(hand: &Hand) -> String {
    let cards: Vec<String> = hand.cards().iter().map(Card::to_string).collect();
    format!("{} ({})", cards.join(" "), hand.total())
}

/// Line printed for a newly visible card
pub fn describe_card(seat: Seat, card: Card, total: u8, dealer_cards: usize) -> String {
    match seat {
        Seat::Player => format!("Player got: {} (total {})", card, total),
        Seat::Dealer if dealer_cards == 1 => {
            format!("Dealer (visible) got: {} (total {})", card, total)
        }
        Seat::Dealer => format!("Dealer revealed: {} (total {})", card, total),
    }
}

impl RoundObserver for ConsolePresenter {
    fn round_started(&mut self, round: u8, rounds: u8) {
        self.dealer_cards = 0;
        println!("\n--- Round {} of {} ---", round, rounds);
    }

    fn card_dealt(&mut self, seat: Seat, card: Card, total: u8) {
        if seat == Seat::Dealer {
            self.dealer_cards += 1;
        }
        println!("{}", describe_card(seat, card, total, self.dealer_cards));
    }

    fn round_finished(&mut self, outcome: RoundOutcome, player_total: u8, dealer_total: u8) {
        println!(
            "Round result: {} (player {}, dealer {})",
            outcome, player_total, dealer_total
        );
    }

    fn session_finished(&mut self, stats: &SessionStats) {
        println!(
            "\nFinished playing {} rounds, win rate: {}",
            stats.rounds(),
            stats.win_rate()
        );
        println!(
            "Wins: {}  Losses: {}  Ties: {}",
            stats.wins, stats.losses, stats.ties
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Suit;

    #[tokio::test]
    async fn test_prompt_name_default() {
        let mut console = Console::new(&b"\n"[..]);
        assert_eq!(console.prompt_name().await.unwrap(), DEFAULT_CLIENT_NAME);

        let mut console = Console::new(&b"  Aces High \n"[..]);
        assert_eq!(console.prompt_name().await.unwrap(), "Aces High");
    }

    #[tokio::test]
    async fn test_prompt_rounds_retries() {
        let mut console = Console::new(&b"zero\n0\n256\n12\n"[..]);
        assert_eq!(console.prompt_rounds().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_prompt_closed_input() {
        let mut console = Console::new(&b""[..]);
        assert!(matches!(
            console.prompt_rounds().await,
            Err(GameError::InputClosed)
        ));
    }

    #[tokio::test]
    async fn test_console_decisions() {
        let mut console = Console::new(&b"Hit\nh\nstand\nwhatever\n"[..]);
        let (player, dealer) = (Hand::new(), Hand::new());

        assert_eq!(console.decide(&player, &dealer).await.unwrap(), Decision::Hit);
        assert_eq!(console.decide(&player, &dealer).await.unwrap(), Decision::Hit);
        assert_eq!(console.decide(&player, &dealer).await.unwrap(), Decision::Stand);
        assert_eq!(console.decide(&player, &dealer).await.unwrap(), Decision::Stand);
    }

    #[test]
    fn test_describe_hand() {
        let mut hand = Hand::new();
        hand.push(Card::new(10, Suit::Hearts).unwrap());
        hand.push(Card::new(5, Suit::Diamonds).unwrap());
        assert_eq!(describe_hand(&hand), "10H 5D (15)");
    }

    #[test]
    fn test_describe_card() {
        let card = Card::new(1, Suit::Spades).unwrap();
        assert_eq!(
            describe_card(Seat::Player, card, 11, 0),
            "Player got: AS (total 11)"
        );
        assert_eq!(
            describe_card(Seat::Dealer, card, 11, 1),
            "Dealer (visible) got: AS (total 11)"
        );
        assert_eq!(
            describe_card(Seat::Dealer, card, 21, 2),
            "Dealer revealed: AS (total 21)"
        );
    }
}
