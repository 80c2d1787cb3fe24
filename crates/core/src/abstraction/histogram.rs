//! Equity-distribution features for postflop clustering.
//!
//! The feature for a (holding, board) situation is a histogram of the
//! equities it realizes across Monte-Carlo run-outs of the remaining
//! streets. Holdings that make their strength now and holdings that are
//! drawing to it produce different histogram shapes even at the same
//! mean equity, which is what the clustering keys on.

use std::hash::{Hash, Hasher};

use rand::Rng;
use rustc_hash::FxHasher;

use crate::cards::{Card, Deck};
use crate::equity::equity;

/// Number of equity bins in a feature histogram.
pub const EQUITY_BINS: usize = 10;

/// A normalized equity histogram.
pub type EquityHistogram = [f32; EQUITY_BINS];

/// Build the equity histogram for `hole` on `board`.
///
/// Each of the `rollouts` trials completes the board to five cards at
/// random and estimates showdown equity with `samples_per_rollout`
/// opponent deals. On the river the board is already complete, so the
/// trials sample only opponents and the histogram collapses toward the
/// holding's point equity.
#[must_use]
pub fn equity_histogram<R: Rng>(
    hole: [Card; 2],
    board: &[Card],
    rollouts: u32,
    samples_per_rollout: u32,
    rng: &mut R,
) -> EquityHistogram {
    debug_assert!(board.len() >= 3 && board.len() <= 5);

    let mut dead: Vec<Card> = board.to_vec();
    dead.extend_from_slice(&hole);
    let live = Deck::without(&dead);
    let missing = 5 - board.len();

    let mut counts = [0u32; EQUITY_BINS];
    let mut full_board: Vec<Card> = board.to_vec();

    for _ in 0..rollouts {
        full_board.truncate(board.len());
        if missing > 0 {
            let mut runout = live.clone();
            runout.shuffle(rng);
            full_board.extend(runout.deal(missing));
        }

        let eq = equity(hole, &full_board, samples_per_rollout, rng);
        counts[equity_bin(eq)] += 1;
    }

    normalize(&counts)
}

/// Bin index for an equity value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn equity_bin(eq: f64) -> usize {
    ((eq * EQUITY_BINS as f64) as usize).min(EQUITY_BINS - 1)
}

/// Convert raw bin counts to a probability histogram.
#[allow(clippy::cast_precision_loss)]
fn normalize(counts: &[u32; EQUITY_BINS]) -> EquityHistogram {
    let total: u32 = counts.iter().sum();
    if total == 0 {
        return [0.0; EQUITY_BINS];
    }
    std::array::from_fn(|i| counts[i] as f32 / total as f32)
}

/// Squared Euclidean distance between two histograms.
#[must_use]
pub fn distance_sq(a: &EquityHistogram, b: &EquityHistogram) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Deterministic RNG seed derived from the cards themselves, so runtime
/// bucket assignment is identical across runs and processes.
#[must_use]
pub fn feature_seed(hole: [Card; 2], board: &[Card]) -> u64 {
    let mut hasher = FxHasher::default();
    let mut sorted_hole = [hole[0].index(), hole[1].index()];
    sorted_hole.sort_unstable();
    sorted_hole.hash(&mut hasher);
    for card in board {
        card.index().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use test_macros::timed_test;

    fn hole(s: &str) -> [Card; 2] {
        let cards = parse_cards(s).unwrap();
        [cards[0], cards[1]]
    }

    #[timed_test]
    fn histogram_is_normalized() {
        let board = parse_cards("Ks9d4c").unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        let hist = equity_histogram(hole("AhAd"), &board, 50, 40, &mut rng);
        let sum: f32 = hist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "histogram sums to {sum}");
    }

    #[timed_test]
    fn strong_hands_mass_high_weak_hands_mass_low() {
        let board = parse_cards("Ks9d4c").unwrap();
        let mut rng = SmallRng::seed_from_u64(5);

        let strong = equity_histogram(hole("KhKd"), &board, 50, 40, &mut rng);
        let weak = equity_histogram(hole("2h7d"), &board, 50, 40, &mut rng);

        let mean = |h: &EquityHistogram| -> f32 {
            h.iter()
                .enumerate()
                .map(|(i, p)| p * (i as f32 + 0.5) / EQUITY_BINS as f32)
                .sum()
        };
        assert!(
            mean(&strong) > mean(&weak) + 0.2,
            "set {strong:?} vs air {weak:?}"
        );
    }

    #[timed_test]
    fn equity_bin_boundaries() {
        assert_eq!(equity_bin(0.0), 0);
        assert_eq!(equity_bin(0.09), 0);
        assert_eq!(equity_bin(0.55), 5);
        assert_eq!(equity_bin(1.0), EQUITY_BINS - 1);
    }

    #[timed_test]
    fn feature_seed_ignores_hole_order() {
        let board = parse_cards("Ks9d4c").unwrap();
        assert_eq!(
            feature_seed(hole("AhKd"), &board),
            feature_seed(hole("KdAh"), &board),
        );
    }

    #[timed_test]
    fn feature_seed_distinguishes_boards() {
        let a = parse_cards("Ks9d4c").unwrap();
        let b = parse_cards("Ks9d4h").unwrap();
        assert_ne!(feature_seed(hole("AhAd"), &a), feature_seed(hole("AhAd"), &b));
    }

    #[timed_test]
    fn distance_is_zero_on_self() {
        let board = parse_cards("Ks9d4c2h").unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let hist = equity_histogram(hole("QsQc"), &board, 30, 30, &mut rng);
        assert_eq!(distance_sq(&hist, &hist), 0.0);
    }
}
