//! Runtime query service over a trained artifact.
//!
//! [`Advisor`] turns a live hand state into an action recommendation.
//! It derives the info-set key with the same abstraction and history
//! encoding the trainer used; on a hit it publishes the normalized
//! average strategy, on a miss (or with no artifact loaded at all) it
//! falls back to a pot-odds equity heuristic.

use std::cmp::Ordering;
use std::path::Path;

use crate::abstraction::centroids::CentroidTable;
use crate::abstraction::preflop::preflop_bucket;
use crate::artifact::StrategyArtifact;
use crate::cards::Card;
use crate::equity::{equity_seeded, showdown, DEFAULT_EQUITY_SAMPLES};
use crate::error::SolverError;
use crate::game::{Action, BetSize, Street, BIG_BLIND};

/// Threshold above which the fallback bets the pot rather than
/// checking or calling.
const STRONG_EQUITY: f64 = 0.7;

/// A live decision point, as seen from the hero's seat.
#[derive(Debug, Clone)]
pub struct LiveState {
    pub hole: [Card; 2],
    /// 0, 3, 4, or 5 community cards.
    pub board: Vec<Card>,
    /// Chips already in the pot.
    pub pot: u32,
    /// Chips the hero must add to call; 0 when checking is free.
    pub to_call: u32,
    pub hero_stack: u32,
    pub villain_stack: u32,
    /// Canonical betting history (`"c/kbMID"`), empty at the first
    /// decision of the hand.
    pub history: String,
}

/// An action recommendation.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub action: Action,
    /// Chips to put in for `Call`/`Bet` actions.
    pub amount: Option<u32>,
    /// Hero's estimated equity at this decision.
    pub equity: f64,
    /// The full action distribution the point action was taken from.
    pub distribution: Vec<(Action, f64)>,
}

/// One enumerated legal action for external callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAction {
    pub action: Action,
    pub amount: u32,
}

/// Read-only query front end over an optional artifact and centroid
/// table.
#[derive(Debug)]
pub struct Advisor {
    artifact: Option<StrategyArtifact>,
    centroids: Option<CentroidTable>,
    samples: u32,
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Advisor {
    /// An advisor with nothing loaded; every query uses the fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            artifact: None,
            centroids: None,
            samples: DEFAULT_EQUITY_SAMPLES,
        }
    }

    /// Override the Monte-Carlo sample budget for equity estimates.
    #[must_use]
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Load a strategy artifact.
    ///
    /// # Errors
    ///
    /// Surfaces [`SolverError::Artifact`] /
    /// [`SolverError::ArtifactVersion`]; the advisor keeps working on
    /// the fallback path if the caller ignores the failure.
    pub fn load_artifact(&mut self, path: &Path) -> Result<(), SolverError> {
        self.artifact = Some(StrategyArtifact::load(path)?);
        Ok(())
    }

    /// Load a centroid table for postflop key derivation.
    ///
    /// # Errors
    ///
    /// Surfaces [`SolverError::Artifact`] on load failure.
    pub fn load_centroids(&mut self, path: &Path) -> Result<(), SolverError> {
        self.centroids = Some(CentroidTable::load(path)?);
        Ok(())
    }

    /// Use an already-loaded artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: StrategyArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Use an already-loaded centroid table.
    #[must_use]
    pub fn with_centroids(mut self, centroids: CentroidTable) -> Self {
        self.centroids = Some(centroids);
        self
    }

    /// Hero's equity against a random holding, deterministic per
    /// (cards, sample budget).
    #[must_use]
    pub fn equity(&self, hole: [Card; 2], board: &[Card]) -> f64 {
        let seed = crate::abstraction::histogram::feature_seed(hole, board);
        equity_seeded(hole, board, self.samples, seed)
    }

    /// Compare two holdings on a full board: `Greater` means `a` wins.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidState`] unless the board has five cards.
    pub fn compare(
        &self,
        board: &[Card],
        a: [Card; 2],
        b: [Card; 2],
    ) -> Result<Ordering, SolverError> {
        let board: [Card; 5] = board
            .try_into()
            .map_err(|_| SolverError::InvalidState("showdown needs a 5-card board".into()))?;
        Ok(showdown(&board, a, b))
    }

    /// Recommend an action for a live state.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidState`] on impossible board sizes. A
    /// missing key, missing artifact, or missing centroid table is not
    /// an error; those fall back to the equity heuristic.
    pub fn recommend(&self, state: &LiveState) -> Result<Recommendation, SolverError> {
        let street = Street::from_board_len(state.board.len())?;
        let equity = self.equity(state.hole, &state.board);

        if let Some(distribution) = self.trained_distribution(state, street) {
            let point = distribution
                .iter()
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
                .map_or(Action::Check, |&(action, _)| action);

            return Ok(Recommendation {
                action: point,
                amount: self.amount_for(point, state),
                equity,
                distribution,
            });
        }

        Ok(self.heuristic(state, equity))
    }

    /// Enumerate the concrete legal actions for a live spot.
    #[must_use]
    pub fn valid_actions(to_call: u32, min_raise: u32, stack: u32) -> Vec<ValidAction> {
        let mut actions = Vec::new();

        if to_call == 0 {
            actions.push(ValidAction {
                action: Action::Check,
                amount: 0,
            });
        } else {
            actions.push(ValidAction {
                action: Action::Fold,
                amount: 0,
            });
            actions.push(ValidAction {
                action: Action::Call,
                amount: to_call.min(stack),
            });
        }

        if stack > to_call {
            let raise = min_raise.max(BIG_BLIND).min(stack - to_call);
            actions.push(ValidAction {
                action: Action::Bet(BetSize::Min),
                amount: to_call + raise,
            });
            if stack - to_call > raise {
                actions.push(ValidAction {
                    action: Action::Bet(BetSize::Max),
                    amount: stack,
                });
            }
        }

        actions
    }

    /// Look up the average strategy for this state's key, if we can
    /// derive a key and the artifact has it.
    fn trained_distribution(
        &self,
        state: &LiveState,
        street: Street,
    ) -> Option<Vec<(Action, f64)>> {
        let artifact = self.artifact.as_ref()?;
        let bucket = self.bucket(state.hole, &state.board, street)?;
        let key = crate::cfr::info_key(street, bucket, &state.history);

        let (actions, probs) = artifact.average_strategy(&key)?;
        Some(actions.iter().copied().zip(probs).collect())
    }

    /// Bucket for a live holding; `None` when the abstraction cannot
    /// resolve it (no centroid table loaded).
    fn bucket(&self, hole: [Card; 2], board: &[Card], street: Street) -> Option<u16> {
        if street == Street::Preflop {
            return Some(preflop_bucket(hole));
        }
        self.centroids.as_ref()?.bucket_for(hole, board).ok()
    }

    /// Pot-odds fallback: call when the pot justifies it, bet the pot
    /// with a strong hand, otherwise check or fold.
    #[allow(clippy::cast_lossless)]
    fn heuristic(&self, state: &LiveState, equity: f64) -> Recommendation {
        let strong = equity > STRONG_EQUITY && state.hero_stack > state.to_call;

        let action = if strong {
            Action::Bet(BetSize::Mid)
        } else if state.to_call == 0 {
            Action::Check
        } else if equity * (state.pot + state.to_call) as f64 >= state.to_call as f64 {
            Action::Call
        } else {
            Action::Fold
        };

        Recommendation {
            action,
            amount: self.amount_for(action, state),
            equity,
            distribution: vec![(action, 1.0)],
        }
    }

    /// Concrete chip amount for an abstract action in a live spot.
    fn amount_for(&self, action: Action, state: &LiveState) -> Option<u32> {
        let stack = state.hero_stack;
        match action {
            Action::Fold | Action::Check => None,
            Action::Call => Some(state.to_call.min(stack)),
            Action::Bet(size) => {
                let increment = match size {
                    BetSize::Min => state.pot.div_ceil(3).max(BIG_BLIND),
                    BetSize::Mid => state.pot,
                    BetSize::Max => stack.saturating_sub(state.to_call),
                };
                Some((state.to_call + increment).min(stack))
            }
        }
    }
}
