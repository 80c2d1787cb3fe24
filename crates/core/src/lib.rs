#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! CFR solver core for heads-up no-limit Texas Hold'em.
//!
//! Computes an approximate Nash-equilibrium strategy by external-sampling
//! Monte-Carlo CFR self-play and answers runtime queries from the trained
//! artifact.
//!
//! # Modules
//!
//! - `cards` - card/deck primitives and text encoding
//! - `evaluator` - 5-7 card hand ranking
//! - `equity` - Monte-Carlo win-probability estimation
//! - `abstraction` - preflop canonical classes and postflop equity clustering
//! - `game` - the heads-up betting tree and action abstraction
//! - `cfr` - regret matching, the info-set store, and the MCCFR trainer
//! - `artifact` - the persisted strategy format
//! - `config` - training run configuration
//! - `query` - the action-recommendation service
//! - `error` - error types

pub mod abstraction;
pub mod artifact;
pub mod cards;
pub mod cfr;
pub mod config;
pub mod equity;
pub mod error;
pub mod evaluator;
pub mod game;
pub mod query;

pub use artifact::{StrategyArtifact, Variant};
pub use cards::{Card, Deck};
pub use cfr::Trainer;
pub use config::TrainingConfig;
pub use error::SolverError;
pub use evaluator::{evaluate, HandRank};
pub use game::{Action, HandState, Player, Street};
pub use query::{Advisor, LiveState, Recommendation};
