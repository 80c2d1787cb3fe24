//! Strategy artifact: the trained output on disk.
//!
//! A keyed map from info-set key to `{actions, regret_sum,
//! strategy_sum}` plus a header describing how it was trained. The wire
//! format is bincode over plain-`HashMap` wire structs; writes go to a
//! temp file in the target directory followed by an atomic rename, so
//! readers never observe a torn artifact.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::store::{average_of, InfoSet};
use crate::error::SolverError;
use crate::game::Action;

/// Current artifact format version; bumped on incompatible changes.
pub const ARTIFACT_VERSION: u32 = 1;

/// Which game the artifact was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Preflop-only: reaching the flop is a synthetic equity terminal.
    Preflop,
    /// Postflop: conditions on a reached flop and plays to showdown.
    Postflop,
}

/// How `strategy_sum` was weighted during accumulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weighting {
    /// One unit per visit.
    Uniform,
    /// Weighted by iteration index (linear CFR).
    Linear,
}

/// Artifact metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub version: u32,
    pub trained_iterations: u64,
    /// Seconds since the Unix epoch at flush time.
    pub timestamp: u64,
    pub variant: Variant,
    pub weighting: Weighting,
    /// Checksum of the card abstraction the keys were derived under.
    pub abstraction_checksum: u64,
}

impl ArtifactHeader {
    /// A header stamped with the current time.
    #[must_use]
    pub fn new(variant: Variant, trained_iterations: u64, abstraction_checksum: u64) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            version: ARTIFACT_VERSION,
            trained_iterations,
            timestamp,
            variant,
            weighting: Weighting::Uniform,
            abstraction_checksum,
        }
    }
}

/// One persisted info set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSetRecord {
    pub actions: Vec<Action>,
    pub regret_sum: Vec<f64>,
    pub strategy_sum: Vec<f64>,
}

/// A trained strategy, in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyArtifact {
    pub header: ArtifactHeader,
    entries: FxHashMap<String, InfoSetRecord>,
}

/// Bincode-friendly wire form with a std `HashMap`.
#[derive(Serialize, Deserialize)]
struct WireArtifact {
    header: ArtifactHeader,
    entries: HashMap<String, InfoSetRecord>,
}

impl StrategyArtifact {
    /// An empty artifact with the given header.
    #[must_use]
    pub fn new(header: ArtifactHeader) -> Self {
        Self {
            header,
            entries: FxHashMap::default(),
        }
    }

    /// Build an artifact from an info-set store snapshot.
    #[must_use]
    pub fn from_snapshot(header: ArtifactHeader, snapshot: Vec<(String, InfoSet)>) -> Self {
        let entries = snapshot
            .into_iter()
            .map(|(key, set)| {
                (
                    key,
                    InfoSetRecord {
                        actions: set.actions,
                        regret_sum: set.regret_sum,
                        strategy_sum: set.strategy_sum,
                    },
                )
            })
            .collect();
        Self { header, entries }
    }

    /// Convert back into store entries to resume training.
    #[must_use]
    pub fn into_entries(self) -> Vec<(String, InfoSet)> {
        self.entries
            .into_iter()
            .map(|(key, record)| {
                (
                    key,
                    InfoSet {
                        actions: record.actions,
                        regret_sum: record.regret_sum,
                        strategy_sum: record.strategy_sum,
                    },
                )
            })
            .collect()
    }

    /// Look up a raw record.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&InfoSetRecord> {
        self.entries.get(key)
    }

    /// The published average strategy for a key: normalized
    /// `strategy_sum` over the record's actions.
    #[must_use]
    pub fn average_strategy(&self, key: &str) -> Option<(&[Action], Vec<f64>)> {
        self.entries
            .get(key)
            .map(|record| (record.actions.as_slice(), average_of(&record.strategy_sum)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Save via write-to-temp + atomic rename.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O or serialization failure.
    pub fn save(&self, path: &Path) -> Result<(), SolverError> {
        let wire = WireArtifact {
            header: self.header.clone(),
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut writer, &wire)
                .map_err(|e| SolverError::Artifact(format!("encode: {e}")))?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| SolverError::Io(e.error))?;
        Ok(())
    }

    /// Load an artifact, verifying the format version.
    ///
    /// # Errors
    ///
    /// [`SolverError::Artifact`] on missing/corrupt files and
    /// [`SolverError::ArtifactVersion`] on a version mismatch.
    pub fn load(path: &Path) -> Result<Self, SolverError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SolverError::Artifact(format!("open {}: {e}", path.display())))?;
        let wire: WireArtifact = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| SolverError::Artifact(format!("decode: {e}")))?;

        if wire.header.version != ARTIFACT_VERSION {
            return Err(SolverError::ArtifactVersion {
                expected: ARTIFACT_VERSION,
                actual: wire.header.version,
            });
        }

        Ok(Self {
            header: wire.header,
            entries: wire.entries.into_iter().collect(),
        })
    }

    /// Whether a readable artifact exists at `path`.
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::BetSize;
    use tempfile::TempDir;
    use test_macros::timed_test;

    fn sample() -> StrategyArtifact {
        let mut artifact = StrategyArtifact::new(ArtifactHeader::new(Variant::Preflop, 500, 169));
        artifact.entries.insert(
            "0|0|c".to_owned(),
            InfoSetRecord {
                actions: vec![Action::Check, Action::Bet(BetSize::Mid)],
                regret_sum: vec![-1.5, 4.0],
                strategy_sum: vec![10.0, 30.0],
            },
        );
        artifact.entries.insert(
            "0|91|".to_owned(),
            InfoSetRecord {
                actions: vec![Action::Fold, Action::Call, Action::Bet(BetSize::Max)],
                regret_sum: vec![0.0, 0.0, 0.0],
                strategy_sum: vec![0.0, 0.0, 0.0],
            },
        );
        artifact
    }

    #[timed_test]
    fn save_load_roundtrip_is_lossless() {
        let artifact = sample();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strategy.bin");

        artifact.save(&path).unwrap();
        assert!(StrategyArtifact::exists(&path));

        let loaded = StrategyArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[timed_test]
    fn version_mismatch_is_detected() {
        let mut artifact = sample();
        artifact.header.version = ARTIFACT_VERSION + 1;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strategy.bin");
        artifact.save(&path).unwrap();

        let err = StrategyArtifact::load(&path).unwrap_err();
        assert!(matches!(
            err,
            SolverError::ArtifactVersion { expected: ARTIFACT_VERSION, .. }
        ));
    }

    #[timed_test]
    fn corrupt_artifact_is_an_artifact_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("strategy.bin");
        std::fs::write(&path, b"not an artifact").unwrap();

        let err = StrategyArtifact::load(&path).unwrap_err();
        assert!(matches!(err, SolverError::Artifact(_)));
    }

    #[timed_test]
    fn missing_artifact_is_an_artifact_error() {
        let err = StrategyArtifact::load(Path::new("/nonexistent/strategy.bin")).unwrap_err();
        assert!(matches!(err, SolverError::Artifact(_)));
        assert!(!StrategyArtifact::exists(Path::new("/nonexistent/strategy.bin")));
    }

    #[timed_test]
    fn average_strategy_normalizes_sums() {
        let artifact = sample();
        let (actions, avg) = artifact.average_strategy("0|0|c").unwrap();
        assert_eq!(actions.len(), 2);
        assert!((avg[0] - 0.25).abs() < 1e-12);
        assert!((avg[1] - 0.75).abs() < 1e-12);
    }

    #[timed_test]
    fn untouched_entries_average_to_uniform() {
        let artifact = sample();
        let (_, avg) = artifact.average_strategy("0|91|").unwrap();
        for p in avg {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[timed_test]
    fn entries_roundtrip_through_a_store() {
        let artifact = sample();
        let header = artifact.header.clone();
        let store = crate::cfr::InfoSetStore::from_entries(artifact.clone().into_entries());
        let rebuilt = StrategyArtifact::from_snapshot(header, store.snapshot());
        assert_eq!(rebuilt, artifact);
    }

    #[timed_test]
    fn header_records_training_facts() {
        let header = ArtifactHeader::new(Variant::Postflop, 12_345, 0xABCD);
        assert_eq!(header.version, ARTIFACT_VERSION);
        assert_eq!(header.variant, Variant::Postflop);
        assert_eq!(header.weighting, Weighting::Uniform);
        assert_eq!(header.trained_iterations, 12_345);
        assert_eq!(header.abstraction_checksum, 0xABCD);
        assert!(header.timestamp > 0);
    }
}
