//! Heads-up no-limit hold'em betting model.
//!
//! Defines the players, streets, and the discrete action abstraction
//! (fold, check, call, and three pot-relative bet sizes), plus the
//! [`HandState`] betting-state machine in [`state`].

mod state;

use std::fmt;
use std::str::FromStr;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

pub use state::{HandState, TerminalKind, BIG_BLIND, SMALL_BLIND};

use crate::error::SolverError;

/// Maximum number of actions at any decision point:
/// fold + call + three bet sizes (or check in place of fold/call).
pub const MAX_ACTIONS: usize = 5;

/// Stack-allocated action list returned by [`HandState::legal_actions`].
pub type Actions = ArrayVec<Action, MAX_ACTIONS>;

/// Seat in a heads-up hand. The button posts the small blind and acts
/// first preflop; the big blind acts first on every later street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Button,
    BigBlind,
}

impl Player {
    /// The other seat.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Button => Self::BigBlind,
            Self::BigBlind => Self::Button,
        }
    }

    /// Array index for per-seat state: button = 0, big blind = 1.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Button => 0,
            Self::BigBlind => 1,
        }
    }
}

/// Betting street, in play order. `Showdown` is the post-river state
/// where hands are compared; no actions happen there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    /// Number of community cards visible on this street.
    #[must_use]
    pub const fn board_cards(self) -> usize {
        match self {
            Self::Preflop => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::River | Self::Showdown => 5,
        }
    }

    /// The street dealt after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Preflop => Self::Flop,
            Self::Flop => Self::Turn,
            Self::Turn => Self::River,
            Self::River | Self::Showdown => Self::Showdown,
        }
    }

    /// Stable index used in info-set keys: preflop = 0 ... showdown = 4.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Preflop => 0,
            Self::Flop => 1,
            Self::Turn => 2,
            Self::River => 3,
            Self::Showdown => 4,
        }
    }

    /// Determine the street from a board size.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidState`] for board sizes other than
    /// 0, 3, 4, or 5.
    pub fn from_board_len(len: usize) -> Result<Self, SolverError> {
        match len {
            0 => Ok(Self::Preflop),
            3 => Ok(Self::Flop),
            4 => Ok(Self::Turn),
            5 => Ok(Self::River),
            n => Err(SolverError::InvalidState(format!("bad board size {n}"))),
        }
    }
}

/// Size tag for the discrete bet abstraction.
///
/// `Min` is a third of the pot rounded up (never below one big blind),
/// `Mid` is the full pot, `Max` is the remaining stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetSize {
    Min,
    Mid,
    Max,
}

impl BetSize {
    /// Text tag used in action encoding (`MIN`, `MID`, `MAX`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Min => "MIN",
            Self::Mid => "MID",
            Self::Max => "MAX",
        }
    }
}

/// A discrete player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(BetSize),
}

impl Action {
    /// The letter sequence used inside betting-history strings:
    /// `f`, `k`, `c`, `bMIN`, `bMID`, `bMAX`.
    #[must_use]
    pub const fn letters(self) -> &'static str {
        match self {
            Self::Fold => "f",
            Self::Check => "k",
            Self::Call => "c",
            Self::Bet(BetSize::Min) => "bMIN",
            Self::Bet(BetSize::Mid) => "bMID",
            Self::Bet(BetSize::Max) => "bMAX",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letters())
    }
}

impl FromStr for Action {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f" => Ok(Self::Fold),
            "k" => Ok(Self::Check),
            "c" => Ok(Self::Call),
            "bMIN" => Ok(Self::Bet(BetSize::Min)),
            "bMID" => Ok(Self::Bet(BetSize::Mid)),
            "bMAX" => Ok(Self::Bet(BetSize::Max)),
            _ => Err(SolverError::Parse(format!("bad action {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::timed_test;

    #[timed_test]
    fn opponent_flips_seat() {
        assert_eq!(Player::Button.opponent(), Player::BigBlind);
        assert_eq!(Player::BigBlind.opponent(), Player::Button);
    }

    #[timed_test]
    fn streets_are_ordered_with_board_sizes() {
        let streets = [
            Street::Preflop,
            Street::Flop,
            Street::Turn,
            Street::River,
            Street::Showdown,
        ];
        let boards = [0, 3, 4, 5, 5];

        for (pair, &cards) in streets.windows(2).zip(&boards) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].board_cards(), cards);
            assert_eq!(pair[0].next(), pair[1]);
        }
    }

    #[timed_test]
    fn street_from_board_len_rejects_partial_flops() {
        assert!(Street::from_board_len(1).is_err());
        assert!(Street::from_board_len(2).is_err());
        assert!(Street::from_board_len(6).is_err());
        assert_eq!(Street::from_board_len(4).unwrap(), Street::Turn);
    }

    #[timed_test]
    fn action_text_roundtrip() {
        let actions = [
            Action::Fold,
            Action::Check,
            Action::Call,
            Action::Bet(BetSize::Min),
            Action::Bet(BetSize::Mid),
            Action::Bet(BetSize::Max),
        ];
        for action in actions {
            let parsed: Action = action.to_string().parse().unwrap();
            assert_eq!(parsed, action);
        }
    }

    #[timed_test]
    fn unknown_action_text_rejected() {
        assert!("x".parse::<Action>().is_err());
        assert!("bHUGE".parse::<Action>().is_err());
        assert!("".parse::<Action>().is_err());
    }
}
