//! Centroid tables: the persisted postflop abstraction.
//!
//! An offline [`CentroidTrainer`] samples (holding, board) situations,
//! computes their equity histograms, and k-means-clusters each street
//! into its bucket count (50/50/10 by convention). The resulting
//! [`CentroidTable`] is saved next to the strategy artifact and loaded
//! read-only by the trainer and the query service.

use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::rngs::{SmallRng, StdRng};
use rand::SeedableRng;
use rayon::prelude::*;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::cards::{Card, Deck};
use crate::equity::equity_seeded;
use crate::error::SolverError;
use crate::game::Street;

use super::histogram::{equity_histogram, feature_seed, EquityHistogram};
use super::kmeans::{cluster, nearest};
use super::preflop::preflop_bucket;

/// Histogram roll-outs used for runtime bucket assignment.
const RUNTIME_ROLLOUTS: u32 = 80;
/// Equity samples per roll-out at runtime.
const RUNTIME_SAMPLES: u32 = 50;

/// Per-street centroid tables for the postflop abstraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidTable {
    pub flop: Vec<EquityHistogram>,
    pub turn: Vec<EquityHistogram>,
    pub river: Vec<EquityHistogram>,
}

impl CentroidTable {
    /// Centroids for a postflop street, or `None` preflop/at showdown
    /// board sizes without a table.
    fn for_street(&self, street: Street) -> Option<&[EquityHistogram]> {
        let table = match street {
            Street::Preflop => return None,
            Street::Flop => &self.flop,
            Street::Turn => &self.turn,
            Street::River | Street::Showdown => &self.river,
        };
        if table.is_empty() {
            None
        } else {
            Some(table)
        }
    }

    /// Number of buckets on a street (169 preflop).
    #[must_use]
    pub fn num_buckets(&self, street: Street) -> usize {
        match street {
            Street::Preflop => super::preflop::PREFLOP_BUCKETS,
            Street::Flop => self.flop.len(),
            Street::Turn => self.turn.len(),
            Street::River | Street::Showdown => self.river.len(),
        }
    }

    /// The bucket for a live (holding, board) pair.
    ///
    /// Preflop boards use the lossless canonical index; postflop boards
    /// use the nearest centroid under Euclidean distance on the equity
    /// histogram. The feature RNG is seeded from the cards, so the
    /// assignment is identical across runs for the same centroids.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidState`] for impossible board sizes, and
    /// [`SolverError::AbstractionMiss`] when the street has no centroids.
    pub fn bucket_for(&self, hole: [Card; 2], board: &[Card]) -> Result<u16, SolverError> {
        let street = Street::from_board_len(board.len())?;
        if street == Street::Preflop {
            return Ok(preflop_bucket(hole));
        }

        let centroids = self
            .for_street(street)
            .ok_or(SolverError::AbstractionMiss(street))?;

        let mut rng = SmallRng::seed_from_u64(feature_seed(hole, board));
        let hist = equity_histogram(hole, board, RUNTIME_ROLLOUTS, RUNTIME_SAMPLES, &mut rng);
        #[allow(clippy::cast_possible_truncation)]
        Ok(nearest(centroids, &hist) as u16)
    }

    /// Checksum over the full table, recorded in artifact headers so a
    /// strategy can refuse to run against the wrong abstraction.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = FxHasher::default();
        for table in [&self.flop, &self.turn, &self.river] {
            table.len().hash(&mut hasher);
            for centroid in table {
                for &v in centroid {
                    v.to_bits().hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    /// Save the table via write-to-temp plus atomic rename.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or serialization failure.
    pub fn save(&self, path: &Path) -> Result<(), SolverError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, self)
                .map_err(|e| SolverError::Artifact(format!("centroid encode: {e}")))?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| SolverError::Io(e.error))?;
        Ok(())
    }

    /// Load a table saved by [`CentroidTable::save`].
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Artifact`] on missing or corrupt tables.
    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SolverError::Artifact(format!("open {}: {e}", path.display())))?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| SolverError::Artifact(format!("centroid decode: {e}")))
    }
}

/// Offline generator for [`CentroidTable`]s.
#[derive(Debug, Clone)]
pub struct CentroidTrainer {
    pub flop_buckets: usize,
    pub turn_buckets: usize,
    pub river_buckets: usize,
    /// Situations sampled per street.
    pub samples_per_street: u32,
    /// Board run-outs per sampled situation.
    pub rollouts: u32,
    /// Equity samples per run-out.
    pub samples_per_rollout: u32,
    pub seed: u64,
}

impl Default for CentroidTrainer {
    fn default() -> Self {
        Self {
            flop_buckets: 50,
            turn_buckets: 50,
            river_buckets: 10,
            samples_per_street: 5_000,
            rollouts: 80,
            samples_per_rollout: 50,
            seed: 1,
        }
    }
}

impl CentroidTrainer {
    /// Sample situations and cluster every street.
    ///
    /// Expensive; meant to run offline once. Progress goes to stderr.
    #[must_use]
    pub fn generate(&self) -> CentroidTable {
        let streets = [
            (Street::Flop, self.flop_buckets),
            (Street::Turn, self.turn_buckets),
            (Street::River, self.river_buckets),
        ];

        let mut tables = Vec::with_capacity(3);
        for (street, buckets) in streets {
            eprintln!(
                "clustering {street:?}: {} samples into {buckets} buckets...",
                self.samples_per_street
            );
            let features = self.sample_street(street);
            let mut rng = StdRng::seed_from_u64(self.seed ^ u64::from(street.index()));
            tables.push(cluster(&features, buckets, 30, &mut rng));
        }

        let mut iter = tables.into_iter();
        CentroidTable {
            flop: iter.next().unwrap_or_default(),
            turn: iter.next().unwrap_or_default(),
            river: iter.next().unwrap_or_default(),
        }
    }

    /// Equity histograms for random situations on one street.
    fn sample_street(&self, street: Street) -> Vec<EquityHistogram> {
        let board_size = street.board_cards();
        (0..self.samples_per_street)
            .into_par_iter()
            .map(|i| {
                let mut rng = SmallRng::seed_from_u64(
                    self.seed
                        .wrapping_add(u64::from(i).wrapping_mul(0x9E37_79B9_7F4A_7C15))
                        ^ (u64::from(street.index()) << 56),
                );
                let mut deck = Deck::new();
                deck.shuffle(&mut rng);
                let cards = deck.deal(board_size + 2);
                let hole = [cards[board_size], cards[board_size + 1]];
                equity_histogram(
                    hole,
                    &cards[..board_size],
                    self.rollouts,
                    self.samples_per_rollout,
                    &mut rng,
                )
            })
            .collect()
    }
}

/// Degraded bucket assignment used when no centroid table is loaded:
/// scale the holding's point equity straight into `k` buckets.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn equity_bucket(hole: [Card; 2], board: &[Card], k: usize, samples: u32) -> u16 {
    let eq = equity_seeded(hole, board, samples, feature_seed(hole, board));
    #[allow(clippy::cast_precision_loss)]
    let bucket = ((eq * k as f64) as usize).min(k - 1);
    bucket as u16
}
