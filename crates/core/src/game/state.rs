//! Betting-state machine for one heads-up hand.
//!
//! The full board is fixed at the chance root and revealed street by
//! street, which keeps traversal free of mid-hand dealing. All chip
//! amounts are integers with a 1/2 small/big blind.

use crate::cards::Card;
use crate::error::SolverError;
use crate::evaluator::evaluate;

use super::{Action, Actions, BetSize, Player, Street};

/// Small blind posted by the button, in chips.
pub const SMALL_BLIND: u32 = 1;
/// Big blind, in chips. One big blind is the minimum raise increment.
pub const BIG_BLIND: u32 = 2;

/// How a hand ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// This player folded; the opponent takes the pot.
    Fold(Player),
    /// Hands are compared on the full board; ties chop.
    Showdown,
}

/// Complete state of one heads-up hand.
#[derive(Debug, Clone)]
pub struct HandState {
    holes: [[Card; 2]; 2],
    full_board: [Card; 5],
    street: Street,
    start_street: Street,
    pot: u32,
    stacks: [u32; 2],
    street_committed: [u32; 2],
    total_committed: [u32; 2],
    to_act: Player,
    /// Who has acted since the last bet on this street. Blind posts do
    /// not count as acting.
    acted: [bool; 2],
    history: Vec<(Street, Action)>,
    terminal: Option<TerminalKind>,
}

impl HandState {
    /// A fresh hand with blinds posted and the button to act preflop.
    ///
    /// `stack_depth_bb` is each player's starting stack in big blinds.
    #[must_use]
    pub fn new(holes: [[Card; 2]; 2], full_board: [Card; 5], stack_depth_bb: u32) -> Self {
        let stack = stack_depth_bb * BIG_BLIND;
        debug_assert!(stack > BIG_BLIND, "stack must cover the big blind");

        Self {
            holes,
            full_board,
            street: Street::Preflop,
            start_street: Street::Preflop,
            pot: SMALL_BLIND + BIG_BLIND,
            stacks: [stack - SMALL_BLIND, stack - BIG_BLIND],
            street_committed: [SMALL_BLIND, BIG_BLIND],
            total_committed: [SMALL_BLIND, BIG_BLIND],
            to_act: Player::Button,
            acted: [false, false],
            history: Vec::new(),
            terminal: None,
        }
    }

    /// A hand that starts on the flop after a limped preflop: both
    /// players have committed one big blind, big blind to act.
    ///
    /// This is the root used by the postflop solver, which conditions on
    /// a reached flop instead of replaying preflop action.
    #[must_use]
    pub fn new_at_flop(holes: [[Card; 2]; 2], full_board: [Card; 5], stack_depth_bb: u32) -> Self {
        let stack = stack_depth_bb * BIG_BLIND;
        debug_assert!(stack > BIG_BLIND, "stack must cover the big blind");

        Self {
            holes,
            full_board,
            street: Street::Flop,
            start_street: Street::Flop,
            pot: 2 * BIG_BLIND,
            stacks: [stack - BIG_BLIND, stack - BIG_BLIND],
            street_committed: [0, 0],
            total_committed: [BIG_BLIND, BIG_BLIND],
            to_act: Player::BigBlind,
            acted: [false, false],
            history: Vec::new(),
            terminal: None,
        }
    }

    /// Current street.
    #[must_use]
    pub fn street(&self) -> Street {
        self.street
    }

    /// Total chips in the pot.
    #[must_use]
    pub fn pot(&self) -> u32 {
        self.pot
    }

    /// The visible part of the board for the current street.
    #[must_use]
    pub fn board(&self) -> &[Card] {
        &self.full_board[..self.street.board_cards()]
    }

    /// A player's hole cards.
    #[must_use]
    pub fn hole(&self, player: Player) -> [Card; 2] {
        self.holes[player.index()]
    }

    /// A player's remaining stack.
    #[must_use]
    pub fn stack(&self, player: Player) -> u32 {
        self.stacks[player.index()]
    }

    /// A player's total chips committed to the pot so far.
    #[must_use]
    pub fn committed(&self, player: Player) -> u32 {
        self.total_committed[player.index()]
    }

    /// The player to act, or `None` at a terminal.
    #[must_use]
    pub fn to_act(&self) -> Option<Player> {
        if self.terminal.is_some() {
            None
        } else {
            Some(self.to_act)
        }
    }

    /// Terminal tag, if the hand is over.
    #[must_use]
    pub fn terminal(&self) -> Option<TerminalKind> {
        self.terminal
    }

    /// Whether the hand is over.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Chips the current actor must add to match the outstanding bet.
    #[must_use]
    pub fn to_call(&self) -> u32 {
        let actor = self.to_act.index();
        let bet = self.street_committed[0].max(self.street_committed[1]);
        (bet - self.street_committed[actor]).min(self.stacks[actor])
    }

    /// The raise increment in chips for a bet size at the current state.
    ///
    /// `Min` is a third of the pot rounded up, floored at one big blind;
    /// `Mid` is the pot; `Max` is everything behind after calling.
    #[must_use]
    pub fn bet_increment(&self, size: BetSize) -> u32 {
        match size {
            BetSize::Min => self.pot.div_ceil(3).max(BIG_BLIND),
            BetSize::Mid => self.pot,
            BetSize::Max => self.stacks[self.to_act.index()] - self.to_call(),
        }
    }

    /// Legal actions for the current actor; empty at a terminal.
    ///
    /// Facing a bet: fold, call, and raises. Otherwise: check and bets.
    /// Fold is never offered when checking is free. `Min`/`Mid` bets that
    /// would put the actor all-in collapse into `Max`.
    #[must_use]
    pub fn legal_actions(&self) -> Actions {
        let mut actions = Actions::new();
        if self.terminal.is_some() {
            return actions;
        }

        let to_call = self.to_call();
        let stack = self.stacks[self.to_act.index()];
        let opponent_stack = self.stacks[self.to_act.opponent().index()];

        if to_call == 0 {
            actions.push(Action::Check);
        } else {
            actions.push(Action::Fold);
            actions.push(Action::Call);
        }

        // Betting requires chips behind on both sides; raising into an
        // all-in opponent is pointless and disallowed.
        if stack > to_call && opponent_stack > 0 {
            for size in [BetSize::Min, BetSize::Mid] {
                if to_call + self.bet_increment(size) < stack {
                    actions.push(Action::Bet(size));
                }
            }
            actions.push(Action::Bet(BetSize::Max));
        }

        actions
    }

    /// Apply an action, returning the successor state.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidState`] if the action is not legal
    /// at this state.
    pub fn apply(&self, action: Action) -> Result<Self, SolverError> {
        if !self.legal_actions().contains(&action) {
            return Err(SolverError::InvalidState(format!(
                "{action} is illegal at {}|{}",
                self.street.index(),
                self.history_string(),
            )));
        }

        let mut next = self.clone();
        let actor = next.to_act;
        next.history.push((next.street, action));

        match action {
            Action::Fold => {
                next.terminal = Some(TerminalKind::Fold(actor));
            }
            Action::Check => {
                next.acted[actor.index()] = true;
                if next.acted == [true, true] {
                    next.advance_street();
                } else {
                    next.to_act = actor.opponent();
                }
            }
            Action::Call => {
                let pay = next.to_call();
                next.commit(actor, pay);
                next.acted[actor.index()] = true;
                if next.acted == [true, true] {
                    next.advance_street();
                } else {
                    // Preflop limp: the big blind still has the option.
                    next.to_act = actor.opponent();
                }
            }
            Action::Bet(size) => {
                let pay = next.to_call() + next.bet_increment(size);
                next.commit(actor, pay);
                next.acted[actor.index()] = true;
                next.acted[actor.opponent().index()] = false;
                next.to_act = actor.opponent();
            }
        }

        Ok(next)
    }

    /// Move chips from a player's stack into the pot.
    fn commit(&mut self, player: Player, amount: u32) {
        let idx = player.index();
        debug_assert!(amount <= self.stacks[idx]);
        self.stacks[idx] -= amount;
        self.street_committed[idx] += amount;
        self.total_committed[idx] += amount;
        self.pot += amount;
    }

    /// Close the current street: deal the next one or reach showdown.
    /// With a player all-in the remaining streets are run out at once.
    fn advance_street(&mut self) {
        self.street_committed = [0, 0];
        self.acted = [false, false];

        if self.street == Street::River || self.stacks.contains(&0) {
            self.street = Street::Showdown;
            self.terminal = Some(TerminalKind::Showdown);
        } else {
            self.street = self.street.next();
            self.to_act = Player::BigBlind;
        }
    }

    /// Signed chip payoff for `player` at a terminal state.
    ///
    /// Fold: the non-folder wins what the folder committed. Showdown:
    /// the better hand wins the matched portion of the pot; equal hands
    /// chop for a net of zero. Always zero-sum.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub fn utility(&self, player: Player) -> f64 {
        let matched = self.total_committed[0].min(self.total_committed[1]) as f64;

        match self.terminal {
            None => {
                debug_assert!(false, "utility on non-terminal state");
                0.0
            }
            Some(TerminalKind::Fold(folder)) => {
                if player == folder {
                    -matched
                } else {
                    matched
                }
            }
            Some(TerminalKind::Showdown) => {
                let rank_of = |p: Player| {
                    let hole = self.holes[p.index()];
                    let mut cards = self.full_board.to_vec();
                    cards.extend_from_slice(&hole);
                    evaluate(&cards)
                };
                match rank_of(player).cmp(&rank_of(player.opponent())) {
                    std::cmp::Ordering::Greater => matched,
                    std::cmp::Ordering::Less => -matched,
                    std::cmp::Ordering::Equal => 0.0,
                }
            }
        }
    }

    /// Canonical betting-history string: per-street action letters with
    /// a `/` closing every completed street, e.g. `"ck/kbMIDc/kk/"`.
    #[must_use]
    pub fn history_string(&self) -> String {
        let mut out = String::new();
        let mut cursor = self.start_street;

        for &(street, action) in &self.history {
            while cursor < street {
                out.push('/');
                cursor = cursor.next();
            }
            out.push_str(action.letters());
        }
        while cursor < self.street {
            out.push('/');
            cursor = cursor.next();
        }

        out
    }
}
