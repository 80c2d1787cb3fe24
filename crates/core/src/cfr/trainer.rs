//! External-sampling MCCFR training driver.
//!
//! Each iteration samples one chance outcome (both holdings plus the
//! full board) and traverses the betting tree twice, once per updating
//! seat. At the updating player's nodes every action is explored and
//! regrets accumulate; at the opponent's nodes one action is sampled
//! from the current strategy and the strategy average accumulates.
//!
//! A run is `batches x iterations`; the averaged strategy is flushed to
//! the artifact after every batch, so batches are durable checkpoints
//! and additive across runs.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::abstraction::centroids::{CentroidTable, CentroidTrainer};
use crate::abstraction::preflop::{preflop_bucket, PREFLOP_BUCKETS};
use crate::artifact::{ArtifactHeader, StrategyArtifact, Variant};
use crate::cards::{Card, Deck};
use crate::config::TrainingConfig;
use crate::equity::{PreflopEquityTable, DEFAULT_EQUITY_SAMPLES};
use crate::error::SolverError;
use crate::game::{HandState, Player, Street};

use super::store::{info_key, InfoSetStore};

/// Splitmix-style stream separation constant for per-iteration RNGs.
const STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// One sampled chance outcome, shared by both traversals of an
/// iteration. Postflop buckets are precomputed per deal so traversal
/// never runs Monte-Carlo inside the tree.
struct Deal {
    holes: [[Card; 2]; 2],
    board: [Card; 5],
    /// Bucket per player per postflop street (flop/turn/river).
    buckets: [[u16; 3]; 2],
}

/// Progress facts handed to the batch callback.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// 1-based batch number within this run.
    pub batch: u32,
    pub batches: u32,
    /// Iterations accumulated across all runs against this artifact.
    pub total_iterations: u64,
    pub info_sets: usize,
    /// Traversals discarded for non-fatal errors this batch.
    pub discarded: u64,
}

/// The training entry point: owns the store, the abstraction, and the
/// run configuration.
pub struct Trainer {
    config: TrainingConfig,
    store: InfoSetStore,
    centroids: Option<CentroidTable>,
    preflop_equity: Option<PreflopEquityTable>,
    prior_iterations: u64,
}

impl Trainer {
    /// Prepare a trainer: build or load the abstraction for the variant
    /// and resume from an existing compatible artifact if one is at the
    /// output path.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid configuration or an unloadable
    /// centroid table.
    pub fn new(config: TrainingConfig) -> Result<Self, SolverError> {
        config.validate().map_err(SolverError::from)?;

        let (centroids, preflop_equity) = match config.variant {
            Variant::Preflop => {
                eprintln!("computing preflop equity table...");
                let table = PreflopEquityTable::compute(DEFAULT_EQUITY_SAMPLES, config.seed);
                (None, Some(table))
            }
            Variant::Postflop => {
                let table = match &config.centroid_path {
                    Some(path) => CentroidTable::load(path)?,
                    None => {
                        let trainer = CentroidTrainer {
                            flop_buckets: config.flop_buckets,
                            turn_buckets: config.turn_buckets,
                            river_buckets: config.river_buckets,
                            seed: config.seed,
                            ..CentroidTrainer::default()
                        };
                        let table = trainer.generate();
                        let path = config.output_path.with_extension("centroids");
                        table.save(&path)?;
                        eprintln!("saved generated centroids to {}", path.display());
                        table
                    }
                };
                (Some(table), None)
            }
        };

        let checksum = abstraction_checksum(config.variant, centroids.as_ref());
        let (store, prior_iterations) = resume_store(&config, checksum);

        Ok(Self {
            config,
            store,
            centroids,
            preflop_equity,
            prior_iterations,
        })
    }

    /// Run all configured batches and return the final artifact.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; already-flushed batches stay on
    /// disk.
    pub fn train(&mut self) -> Result<StrategyArtifact, SolverError> {
        self.train_with_callback(|_| true)
    }

    /// [`Trainer::train`] with a per-batch callback.
    ///
    /// The callback sees a [`BatchReport`] after each flush; returning
    /// `false` cancels the run at that batch boundary. The artifact of
    /// the last completed batch is returned either way.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error ([`SolverError::InvariantViolation`]
    /// or an I/O failure while flushing).
    pub fn train_with_callback<F>(&mut self, mut on_batch: F) -> Result<StrategyArtifact, SolverError>
    where
        F: FnMut(&BatchReport) -> bool,
    {
        let mut trained = self.prior_iterations;
        let mut last = None;

        for batch in 0..self.config.batches {
            let deals = self.generate_deals(batch)?;
            let discarded = self.run_batch(batch, &deals)?;

            trained += self.config.iterations;
            let artifact = self.flush(trained)?;

            let report = BatchReport {
                batch: batch + 1,
                batches: self.config.batches,
                total_iterations: trained,
                info_sets: self.store.len(),
                discarded,
            };
            self.prior_iterations = trained;
            last = Some(artifact);
            if !on_batch(&report) {
                break;
            }
        }

        last.ok_or_else(|| SolverError::Config("no batches configured".into()))
    }

    /// Snapshot the store into an artifact and write it out.
    fn flush(&self, total_iterations: u64) -> Result<StrategyArtifact, SolverError> {
        let checksum = abstraction_checksum(self.config.variant, self.centroids.as_ref());
        let header = ArtifactHeader::new(self.config.variant, total_iterations, checksum);
        let artifact = StrategyArtifact::from_snapshot(header, self.store.snapshot());
        artifact.save(&self.config.output_path)?;
        Ok(artifact)
    }

    /// Deal the batch's chance outcomes up front, postflop buckets
    /// included. Iterations wrap around this pool.
    fn generate_deals(&self, batch: u32) -> Result<Vec<Deal>, SolverError> {
        let base = self
            .config
            .seed
            .wrapping_add(u64::from(batch).wrapping_mul(0xD1B5_4A32_D192_ED03));

        (0..self.config.samples)
            .into_par_iter()
            .map(|i| {
                let mut rng =
                    SmallRng::seed_from_u64(base.wrapping_add(u64::from(i).wrapping_mul(STREAM)));
                let mut deck = Deck::new();
                deck.shuffle(&mut rng);
                let cards = deck.deal(9);
                let holes = [[cards[0], cards[1]], [cards[2], cards[3]]];
                let board = [cards[4], cards[5], cards[6], cards[7], cards[8]];

                let mut buckets = [[0u16; 3]; 2];
                if let Some(table) = &self.centroids {
                    for (player, hole) in holes.iter().enumerate() {
                        for (slot, street) in
                            [Street::Flop, Street::Turn, Street::River].iter().enumerate()
                        {
                            buckets[player][slot] =
                                table.bucket_for(*hole, &board[..street.board_cards()])?;
                        }
                    }
                }

                Ok(Deal {
                    holes,
                    board,
                    buckets,
                })
            })
            .collect()
    }

    /// Run one batch of iterations over the deal pool in parallel.
    ///
    /// Non-fatal traversal errors discard that traversal and are
    /// counted; a fatal error stops the batch.
    fn run_batch(&self, batch: u32, deals: &[Deal]) -> Result<u64, SolverError> {
        let progress = ProgressBar::new(self.config.iterations);
        progress.set_style(
            ProgressStyle::with_template(
                "  batch [{bar:40}] {pos}/{len} iterations [{elapsed} < {eta}]",
            )
            .expect("static template"),
        );

        let discarded = AtomicU64::new(0);
        let fatal: Mutex<Option<SolverError>> = Mutex::new(None);
        let base = self
            .config
            .seed
            .wrapping_mul(STREAM)
            .wrapping_add(u64::from(batch));

        (0..self.config.iterations).into_par_iter().for_each(|i| {
            if fatal.lock().is_some() {
                return;
            }

            let mut rng = SmallRng::seed_from_u64(base.wrapping_add(i.wrapping_mul(STREAM)));
            #[allow(clippy::cast_possible_truncation)]
            let deal = &deals[(i % deals.len() as u64) as usize];

            for hero in [Player::Button, Player::BigBlind] {
                let root = self.root_state(deal);
                match self.traverse(deal, &root, hero, &mut rng) {
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => {
                        *fatal.lock() = Some(e);
                        return;
                    }
                    Err(_) => {
                        discarded.fetch_add(1, AtomicOrdering::Relaxed);
                    }
                }
            }
            progress.inc(1);
        });
        progress.finish_and_clear();

        match fatal.into_inner() {
            Some(e) => Err(e),
            None => Ok(discarded.into_inner()),
        }
    }

    /// The chance-node root for the configured variant.
    fn root_state(&self, deal: &Deal) -> HandState {
        match self.config.variant {
            Variant::Preflop => HandState::new(deal.holes, deal.board, self.config.stack_depth),
            Variant::Postflop => {
                HandState::new_at_flop(deal.holes, deal.board, self.config.stack_depth)
            }
        }
    }

    /// One external-sampling traversal, returning the updating player's
    /// expected utility.
    fn traverse(
        &self,
        deal: &Deal,
        state: &HandState,
        hero: Player,
        rng: &mut SmallRng,
    ) -> Result<f64, SolverError> {
        // The preflop-only game prices anything past the preflop betting
        // round (a seen flop or an all-in runout) as an equity terminal.
        if self.config.variant == Variant::Preflop && state.street() != Street::Preflop {
            return Ok(self.preflop_terminal(state, hero));
        }

        if state.is_terminal() {
            return Ok(state.utility(hero));
        }

        let actor = state.to_act().expect("non-terminal state has an actor");
        let actions = state.legal_actions();
        let bucket = self.bucket(deal, state.street(), actor);
        let key = info_key(state.street(), bucket, &state.history_string());
        let strategy = self.store.strategy(&key, &actions)?;

        if actor == hero {
            // Updating player: full width.
            let mut utilities = vec![0.0; actions.len()];
            for (i, &action) in actions.iter().enumerate() {
                let next = state.apply(action)?;
                utilities[i] = self.traverse(deal, &next, hero, rng)?;
            }

            let node_value: f64 = utilities
                .iter()
                .zip(&strategy)
                .map(|(u, p)| u * p)
                .sum();

            let deltas: Vec<f64> = utilities.iter().map(|u| u - node_value).collect();
            self.store.add_regrets(&key, &deltas)?;

            Ok(node_value)
        } else {
            // Opponent: sample one branch, average the strategy.
            self.store.add_strategy(&key, &strategy)?;
            let picked = sample_index(&strategy, rng);
            let next = state.apply(actions[picked])?;
            self.traverse(deal, &next, hero, rng)
        }
    }

    /// Synthetic terminal for the preflop variant: the hero's class
    /// equity against a uniform class, weighted by the current pot.
    /// Both players' commitments are level here, so the value is
    /// zero-sum by construction.
    #[allow(clippy::cast_lossless)]
    fn preflop_terminal(&self, state: &HandState, hero: Player) -> f64 {
        let table = self
            .preflop_equity
            .as_ref()
            .expect("preflop variant always builds the equity table");
        let eq = table.get(preflop_bucket(state.hole(hero)));
        eq * state.pot() as f64 - state.committed(hero) as f64
    }

    /// The acting player's bucket on the current street.
    fn bucket(&self, deal: &Deal, street: Street, actor: Player) -> u16 {
        match street {
            Street::Preflop => preflop_bucket(deal.holes[actor.index()]),
            Street::Flop => deal.buckets[actor.index()][0],
            Street::Turn => deal.buckets[actor.index()][1],
            Street::River | Street::Showdown => deal.buckets[actor.index()][2],
        }
    }

    /// The live store, for inspection after training.
    #[must_use]
    pub fn store(&self) -> &InfoSetStore {
        &self.store
    }
}

/// The checksum stamped into artifact headers: the lossless class count
/// preflop, the centroid digest postflop.
fn abstraction_checksum(variant: Variant, centroids: Option<&CentroidTable>) -> u64 {
    match variant {
        Variant::Preflop => PREFLOP_BUCKETS as u64,
        Variant::Postflop => centroids.map_or(0, CentroidTable::checksum),
    }
}

/// Continue from a compatible artifact at the output path, otherwise
/// start fresh.
fn resume_store(config: &TrainingConfig, checksum: u64) -> (InfoSetStore, u64) {
    if !StrategyArtifact::exists(&config.output_path) {
        return (InfoSetStore::new(), 0);
    }

    match StrategyArtifact::load(&config.output_path) {
        Ok(artifact)
            if artifact.header.variant == config.variant
                && artifact.header.abstraction_checksum == checksum =>
        {
            let iterations = artifact.header.trained_iterations;
            eprintln!(
                "resuming from {} ({} info sets, {} iterations)",
                config.output_path.display(),
                artifact.len(),
                iterations,
            );
            (InfoSetStore::from_entries(artifact.into_entries()), iterations)
        }
        Ok(_) => {
            eprintln!("existing artifact is for a different game; starting fresh");
            (InfoSetStore::new(), 0)
        }
        Err(e) => {
            eprintln!("could not resume from existing artifact ({e}); starting fresh");
            (InfoSetStore::new(), 0)
        }
    }
}

/// Sample an index from a probability vector.
fn sample_index(strategy: &[f64], rng: &mut SmallRng) -> usize {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, &p) in strategy.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return i;
        }
    }
    strategy.len() - 1
}
