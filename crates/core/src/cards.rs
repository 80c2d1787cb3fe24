//! Card and deck primitives.
//!
//! A [`Card`] is an index in `[0, 52)` with `rank = index / 4` (Two..Ace)
//! and `suit = index % 4`. The text form is `RankSuit` with ranks
//! `23456789TJQKA` and suits `hdcs`, e.g. `"Ah"`, `"Td"`.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SolverError;

/// Rank characters in ascending order; index = numeric rank (0 = Two).
pub const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];

/// Suit characters; index = numeric suit.
pub const SUIT_CHARS: [char; 4] = ['h', 'd', 'c', 's'];

/// Numeric rank of an ace (the highest).
pub const ACE: u8 = 12;

/// A single playing card, encoded as an index in `[0, 52)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Card(u8);

impl Card {
    /// Build a card from a raw index.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Parse`] if `index >= 52`.
    pub fn from_index(index: u8) -> Result<Self, SolverError> {
        if index < 52 {
            Ok(Self(index))
        } else {
            Err(SolverError::Parse(format!("card index {index} out of range")))
        }
    }

    /// Build a card from a rank in `[0, 13)` and a suit in `[0, 4)`.
    #[must_use]
    pub const fn from_rank_suit(rank: u8, suit: u8) -> Self {
        Self(rank * 4 + suit)
    }

    /// Raw index in `[0, 52)`.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Rank in `[0, 13)`: 0 = Two, ..., 12 = Ace.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self.0 / 4
    }

    /// Suit in `[0, 4)`: 0 = hearts, 1 = diamonds, 2 = clubs, 3 = spades.
    #[must_use]
    pub const fn suit(self) -> u8 {
        self.0 % 4
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl FromStr for Card {
    type Err = SolverError;

    /// Parse a two-character card string.
    ///
    /// Rank is case-insensitive (`t` == `T`); suit must be lowercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(r), Some(u), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(SolverError::Parse(format!("bad card string {s:?}")));
        };

        let rank = RANK_CHARS
            .iter()
            .position(|&c| c == r.to_ascii_uppercase())
            .ok_or_else(|| SolverError::Parse(format!("bad rank in {s:?}")))?;
        let suit = SUIT_CHARS
            .iter()
            .position(|&c| c == u)
            .ok_or_else(|| SolverError::Parse(format!("bad suit in {s:?}")))?;

        #[allow(clippy::cast_possible_truncation)]
        Ok(Self::from_rank_suit(rank as u8, suit as u8))
    }
}

/// Parse a run of cards, either concatenated (`"AhKd"`) or
/// whitespace-separated (`"Ah Kd"`).
///
/// # Errors
///
/// Returns [`SolverError::Parse`] on any malformed card.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, SolverError> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(SolverError::Parse(format!("odd-length card list {s:?}")));
    }

    let mut cards = Vec::with_capacity(compact.len() / 2);
    let bytes = compact.as_bytes();
    for pair in bytes.chunks(2) {
        let text = std::str::from_utf8(pair)
            .map_err(|_| SolverError::Parse(format!("non-ascii card list {s:?}")))?;
        cards.push(text.parse()?);
    }
    Ok(cards)
}

/// A 52-card deck that deals from the head without replacement.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    next: usize,
}

impl Deck {
    /// A fresh, ordered deck of all 52 cards.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cards: (0..52).map(Card).collect(),
            next: 0,
        }
    }

    /// A deck with the given cards removed (for dealing around known cards).
    #[must_use]
    pub fn without(dead: &[Card]) -> Self {
        Self {
            cards: (0..52).map(Card).filter(|c| !dead.contains(c)).collect(),
            next: 0,
        }
    }

    /// Shuffle the undealt remainder of the deck.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.cards[self.next..].shuffle(rng);
    }

    /// Number of undealt cards.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.next
    }

    /// Deal one card from the head, or `None` when exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        let card = self.cards.get(self.next).copied();
        if card.is_some() {
            self.next += 1;
        }
        card
    }

    /// Deal `n` cards from the head.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` cards remain.
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        assert!(n <= self.remaining(), "deck exhausted");
        (0..n).map(|_| self.draw().unwrap()).collect()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
