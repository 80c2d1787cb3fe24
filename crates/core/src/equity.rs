//! Monte-Carlo equity estimation.
//!
//! Equity is the probability that a holding wins at showdown against a
//! uniformly random opponent hand, given the visible board. Each sample
//! completes the board and deals one opponent holding from the live
//! deck; wins count 1 and ties 0.5.

use std::cmp::Ordering;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::abstraction::preflop::{representative_cards, PREFLOP_BUCKETS};
use crate::cards::Card;
use crate::evaluator::evaluate;

/// Default number of Monte-Carlo samples for equity estimates.
pub const DEFAULT_EQUITY_SAMPLES: u32 = 2_000;

/// Estimate the equity of `hole` on `board` with an explicit RNG.
///
/// `board` may hold 0-5 cards; the remainder is sampled per trial.
/// Deterministic for a given RNG state.
#[must_use]
pub fn equity<R: Rng>(hole: [Card; 2], board: &[Card], samples: u32, rng: &mut R) -> f64 {
    debug_assert!(board.len() <= 5);

    let mut dead: Vec<Card> = board.to_vec();
    dead.extend_from_slice(&hole);
    let live: Vec<Card> = (0..52)
        .map(|i| Card::from_index(i).expect("deck index"))
        .filter(|c| !dead.contains(c))
        .collect();

    let missing = 5 - board.len();
    let needed = missing + 2;
    let mut wins = 0.0_f64;

    let mut draw = live.clone();
    for _ in 0..samples {
        // Partial Fisher-Yates: only the first `needed` slots matter.
        for slot in 0..needed {
            let pick = rng.gen_range(slot..draw.len());
            draw.swap(slot, pick);
        }

        let mut full_board = [Card::from_rank_suit(0, 0); 5];
        full_board[..board.len()].copy_from_slice(board);
        full_board[board.len()..].copy_from_slice(&draw[..missing]);
        let villain = [draw[missing], draw[missing + 1]];

        match showdown(&full_board, hole, villain) {
            Ordering::Greater => wins += 1.0,
            Ordering::Equal => wins += 0.5,
            Ordering::Less => {}
        }
    }

    wins / f64::from(samples.max(1))
}

/// [`equity`] with a fixed seed, for reproducible results.
#[must_use]
pub fn equity_seeded(hole: [Card; 2], board: &[Card], samples: u32, seed: u64) -> f64 {
    let mut rng = SmallRng::seed_from_u64(seed);
    equity(hole, board, samples, &mut rng)
}

/// Compare two holdings on a full five-card board.
///
/// `Greater` means hand `a` wins the showdown.
#[must_use]
pub fn showdown(board: &[Card; 5], a: [Card; 2], b: [Card; 2]) -> Ordering {
    let mut cards = board.to_vec();
    cards.extend_from_slice(&a);
    let rank_a = evaluate(&cards);

    cards.truncate(5);
    cards.extend_from_slice(&b);
    let rank_b = evaluate(&cards);

    rank_a.cmp(&rank_b)
}

/// Preflop equity of each of the 169 canonical hand classes against a
/// uniformly random opponent.
///
/// Computed once per training run from the run seed; the preflop solver
/// prices its synthetic flop terminals from this table and the query
/// fallback uses it when no artifact is loaded.
#[derive(Debug, Clone)]
pub struct PreflopEquityTable {
    equities: Vec<f64>,
}

impl PreflopEquityTable {
    /// Compute the table with `samples` trials per class.
    #[must_use]
    pub fn compute(samples: u32, seed: u64) -> Self {
        let equities = (0..PREFLOP_BUCKETS)
            .into_par_iter()
            .map(|bucket| {
                #[allow(clippy::cast_possible_truncation)]
                let hole = representative_cards(bucket as u16);
                equity_seeded(hole, &[], samples, seed.wrapping_add(bucket as u64))
            })
            .collect();

        Self { equities }
    }

    /// Equity of a canonical preflop class.
    #[must_use]
    pub fn get(&self, bucket: u16) -> f64 {
        self.equities[bucket as usize]
    }
}
