//! Concurrent information-set store.
//!
//! Keys are the exact strings that end up in the artifact:
//! `"{street}|{bucket}|{history}"`. The map is sharded by key hash with
//! a mutex per shard; every update locks only the owning shard, so
//! parallel traversers accumulate deltas without lost updates and a
//! flush sees a point-in-time snapshot.

use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::SolverError;
use crate::game::{Action, Street};

use super::regret::regret_match;

const SHARDS: usize = 64;

/// Build the canonical info-set key.
#[must_use]
pub fn info_key(street: Street, bucket: u16, history: &str) -> String {
    format!("{}|{}|{}", street.index(), bucket, history)
}

/// Per-key CFR state.
///
/// The action list is fixed at first visit; `regret_sum` may go
/// negative, `strategy_sum` never does.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoSet {
    pub actions: Vec<Action>,
    pub regret_sum: Vec<f64>,
    pub strategy_sum: Vec<f64>,
}

impl InfoSet {
    fn new(actions: &[Action]) -> Self {
        Self {
            actions: actions.to_vec(),
            regret_sum: vec![0.0; actions.len()],
            strategy_sum: vec![0.0; actions.len()],
        }
    }

    /// Normalized average strategy; uniform before any accumulation.
    #[must_use]
    pub fn average_strategy(&self) -> Vec<f64> {
        average_of(&self.strategy_sum)
    }
}

/// Normalize a strategy-sum vector, falling back to uniform when empty.
#[must_use]
pub fn average_of(strategy_sum: &[f64]) -> Vec<f64> {
    let total: f64 = strategy_sum.iter().sum();
    if total > 0.0 {
        strategy_sum.iter().map(|&s| s / total).collect()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / strategy_sum.len() as f64;
        vec![uniform; strategy_sum.len()]
    }
}

/// Shard-locked map from info-set key to [`InfoSet`].
pub struct InfoSetStore {
    shards: Vec<Mutex<FxHashMap<String, InfoSet>>>,
}

impl InfoSetStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| Mutex::new(FxHashMap::default())).collect(),
        }
    }

    fn shard(&self, key: &str) -> &Mutex<FxHashMap<String, InfoSet>> {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARDS]
    }

    /// Current regret-matched strategy for a key, creating the info set
    /// on first visit.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvariantViolation`] if the key already exists
    /// with a different action list.
    pub fn strategy(&self, key: &str, actions: &[Action]) -> Result<Vec<f64>, SolverError> {
        let mut shard = self.shard(key).lock();
        let entry = shard
            .entry(key.to_owned())
            .or_insert_with(|| InfoSet::new(actions));

        if entry.actions != actions {
            return Err(SolverError::InvariantViolation(format!(
                "action list mismatch at {key}: {:?} vs {actions:?}",
                entry.actions,
            )));
        }

        Ok(regret_match(&entry.regret_sum))
    }

    /// Accumulate regret deltas for an existing key.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvariantViolation`] on NaN deltas, unknown keys,
    /// or a length mismatch.
    pub fn add_regrets(&self, key: &str, deltas: &[f64]) -> Result<(), SolverError> {
        self.accumulate(key, deltas, select_regrets)
    }

    /// Accumulate strategy weights for an existing key.
    ///
    /// Weights are probabilities, so the accumulated sums stay
    /// non-negative for the life of the run.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvariantViolation`] on NaN or negative weights,
    /// unknown keys, or a length mismatch.
    pub fn add_strategy(&self, key: &str, weights: &[f64]) -> Result<(), SolverError> {
        if weights.iter().any(|w| *w < 0.0) {
            return Err(SolverError::InvariantViolation(format!(
                "negative strategy weight at {key}"
            )));
        }
        self.accumulate(key, weights, select_strategy)
    }

    fn accumulate(
        &self,
        key: &str,
        deltas: &[f64],
        field: fn(&mut InfoSet) -> &mut Vec<f64>,
    ) -> Result<(), SolverError> {
        if deltas.iter().any(|d| d.is_nan()) {
            return Err(SolverError::InvariantViolation(format!("NaN delta at {key}")));
        }

        let mut shard = self.shard(key).lock();
        let entry = shard.get_mut(key).ok_or_else(|| {
            SolverError::InvariantViolation(format!("update for unvisited key {key}"))
        })?;

        let sums = field(entry);
        if sums.len() != deltas.len() {
            return Err(SolverError::InvariantViolation(format!(
                "delta length {} vs {} actions at {key}",
                deltas.len(),
                sums.len(),
            )));
        }
        for (sum, delta) in sums.iter_mut().zip(deltas) {
            *sum += delta;
        }
        Ok(())
    }

    /// Number of info sets created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of every info set, for batch flushes.
    ///
    /// Shards are snapshotted one at a time; updates racing with the
    /// flush land in either this snapshot or the next one.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, InfoSet)> {
        let mut out = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let guard = shard.lock();
            out.extend(guard.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        out
    }

    /// Rebuild a store from artifact entries, so additional batches can
    /// continue on top of a previous run.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, InfoSet)>) -> Self {
        let store = Self::new();
        for (key, set) in entries {
            store.shard(&key).lock().insert(key, set);
        }
        store
    }
}

fn select_regrets(set: &mut InfoSet) -> &mut Vec<f64> {
    &mut set.regret_sum
}

fn select_strategy(set: &mut InfoSet) -> &mut Vec<f64> {
    &mut set.strategy_sum
}

impl Default for InfoSetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::BetSize;
    use test_macros::timed_test;

    const ACTIONS: [Action; 3] = [Action::Fold, Action::Call, Action::Bet(BetSize::Max)];

    #[timed_test]
    fn info_key_layout() {
        assert_eq!(info_key(Street::Preflop, 0, "c"), "0|0|c");
        assert_eq!(info_key(Street::Flop, 42, "ck/k"), "1|42|ck/k");
    }

    #[timed_test]
    fn first_visit_is_uniform() {
        let store = InfoSetStore::new();
        let strategy = store.strategy("0|0|", &ACTIONS).unwrap();
        for p in strategy {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
        assert_eq!(store.len(), 1);
    }

    #[timed_test]
    fn regrets_drive_the_returned_strategy() {
        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();
        store.add_regrets("0|0|", &[0.0, 3.0, 1.0]).unwrap();

        let strategy = store.strategy("0|0|", &ACTIONS).unwrap();
        assert_eq!(strategy[0], 0.0);
        assert!((strategy[1] - 0.75).abs() < 1e-12);
        assert!((strategy[2] - 0.25).abs() < 1e-12);
    }

    #[timed_test]
    fn action_list_is_immutable_after_first_write() {
        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();

        let err = store
            .strategy("0|0|", &[Action::Check, Action::Bet(BetSize::Mid)])
            .unwrap_err();
        assert!(matches!(err, SolverError::InvariantViolation(_)));
    }

    #[timed_test]
    fn nan_deltas_are_fatal() {
        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();
        let err = store.add_regrets("0|0|", &[f64::NAN, 0.0, 0.0]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[timed_test]
    fn negative_strategy_weights_are_fatal() {
        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();
        let err = store.add_strategy("0|0|", &[-0.1, 0.6, 0.5]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[timed_test]
    fn updates_for_unknown_keys_are_rejected() {
        let store = InfoSetStore::new();
        assert!(store.add_regrets("9|9|x", &[1.0]).is_err());
    }

    #[timed_test]
    fn snapshot_roundtrips_through_from_entries() {
        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();
        store.strategy("1|7|ck/", &ACTIONS).unwrap();
        store.add_regrets("0|0|", &[1.0, 2.0, 3.0]).unwrap();
        store.add_strategy("0|0|", &[0.2, 0.3, 0.5]).unwrap();

        let rebuilt = InfoSetStore::from_entries(store.snapshot());
        assert_eq!(rebuilt.len(), 2);

        let mut a = store.snapshot();
        let mut b = rebuilt.snapshot();
        a.sort_by(|x, y| x.0.cmp(&y.0));
        b.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(a, b);
    }

    #[timed_test]
    fn parallel_accumulation_loses_nothing() {
        use rayon::prelude::*;

        let store = InfoSetStore::new();
        store.strategy("0|0|", &ACTIONS).unwrap();

        (0..1_000).into_par_iter().for_each(|_| {
            store.add_regrets("0|0|", &[1.0, 0.0, 0.0]).unwrap();
        });

        let snapshot = store.snapshot();
        let (_, set) = snapshot.iter().find(|(k, _)| k == "0|0|").unwrap();
        assert!((set.regret_sum[0] - 1_000.0).abs() < 1e-9);
    }

    #[timed_test]
    fn average_strategy_normalizes() {
        let mut set = InfoSet::new(&ACTIONS);
        set.strategy_sum = vec![1.0, 1.0, 2.0];
        let avg = set.average_strategy();
        assert!((avg[2] - 0.5).abs() < 1e-12);

        let fresh = InfoSet::new(&ACTIONS);
        let uniform = fresh.average_strategy();
        assert!((uniform[0] - 1.0 / 3.0).abs() < 1e-12);
    }
}
