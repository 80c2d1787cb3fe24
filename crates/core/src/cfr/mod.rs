//! External-sampling Monte-Carlo CFR.
//!
//! [`regret`] holds the regret-matching rule, [`store`] the concurrent
//! info-set store, and [`trainer`] the batch training driver.

pub mod regret;
pub mod store;
pub mod trainer;

pub use regret::{regret_match, regret_match_into};
pub use store::{info_key, InfoSet, InfoSetStore};
pub use trainer::{BatchReport, Trainer};
