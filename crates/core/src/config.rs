//! Training configuration.
//!
//! A single descriptor covers one training run: variant, batch shape,
//! sampling budgets, and output paths. Loadable from YAML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::artifact::Variant;

/// Configuration for a training run.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Which solver to train.
    pub variant: Variant,
    /// CFR iterations per batch; each iteration deals one hand and
    /// traverses it once per seat.
    pub iterations: u64,
    /// Number of batches; the artifact is flushed after each.
    #[serde(default = "default_batches")]
    pub batches: u32,
    /// Monte-Carlo samples for equity estimates (preflop table, query
    /// fallback).
    #[serde(default = "default_samples")]
    pub samples: u32,
    /// Master seed; every worker RNG stream derives from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Starting stacks in big blinds.
    #[serde(default = "default_stack_depth")]
    pub stack_depth: u32,
    /// Where the strategy artifact is written.
    pub output_path: PathBuf,
    /// Optional pre-trained centroid table. When absent, a postflop run
    /// generates one from scratch (slow) and saves it next to the
    /// artifact.
    #[serde(default)]
    pub centroid_path: Option<PathBuf>,
    #[serde(default = "default_flop_buckets")]
    pub flop_buckets: usize,
    #[serde(default = "default_turn_buckets")]
    pub turn_buckets: usize,
    #[serde(default = "default_river_buckets")]
    pub river_buckets: usize,
}

fn default_batches() -> u32 {
    1
}
fn default_samples() -> u32 {
    2_000
}
fn default_seed() -> u64 {
    1
}
fn default_stack_depth() -> u32 {
    100
}
fn default_flop_buckets() -> usize {
    50
}
fn default_turn_buckets() -> usize {
    50
}
fn default_river_buckets() -> usize {
    10
}

impl TrainingConfig {
    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_yaml(&content)
    }

    /// Parse a configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or fails validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.batches == 0 {
            return Err(ConfigError::ZeroBatches);
        }
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.stack_depth < 2 {
            return Err(ConfigError::StackTooShallow(self.stack_depth));
        }
        for (street, buckets) in [
            ("flop", self.flop_buckets),
            ("turn", self.turn_buckets),
            ("river", self.river_buckets),
        ] {
            if buckets == 0 {
                return Err(ConfigError::ZeroBuckets(street));
            }
        }
        Ok(())
    }

    /// A small default run writing to `strategy.bin` in the working
    /// directory.
    #[must_use]
    pub fn preflop_default() -> Self {
        Self {
            variant: Variant::Preflop,
            iterations: 50_000,
            batches: 1,
            samples: default_samples(),
            seed: default_seed(),
            stack_depth: default_stack_depth(),
            output_path: PathBuf::from("strategy.bin"),
            centroid_path: None,
            flop_buckets: default_flop_buckets(),
            turn_buckets: default_turn_buckets(),
            river_buckets: default_river_buckets(),
        }
    }
}

/// Errors from loading or validating a [`TrainingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("iterations must be > 0")]
    ZeroIterations,

    #[error("batches must be > 0")]
    ZeroBatches,

    #[error("samples must be > 0")]
    ZeroSamples,

    #[error("stack depth {0} bb cannot cover the blinds")]
    StackTooShallow(u32),

    #[error("{0} bucket count must be > 0")]
    ZeroBuckets(&'static str),
}

impl From<ConfigError> for crate::error::SolverError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::timed_test;

    const VALID_YAML: &str = r#"
variant: preflop
iterations: 10000
batches: 4
samples: 500
seed: 42
output_path: "out/preflop.bin"
"#;

    #[timed_test]
    fn parse_valid_config() {
        let config = TrainingConfig::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.variant, Variant::Preflop);
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.batches, 4);
        assert_eq!(config.seed, 42);
        assert_eq!(config.output_path, PathBuf::from("out/preflop.bin"));
    }

    #[timed_test]
    fn defaults_fill_optional_fields() {
        let yaml = r#"
variant: postflop
iterations: 100
output_path: "postflop.bin"
"#;
        let config = TrainingConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.batches, 1);
        assert_eq!(config.stack_depth, 100);
        assert_eq!(config.flop_buckets, 50);
        assert_eq!(config.turn_buckets, 50);
        assert_eq!(config.river_buckets, 10);
        assert!(config.centroid_path.is_none());
    }

    #[timed_test]
    fn zero_iterations_fails() {
        let yaml = r#"
variant: preflop
iterations: 0
output_path: "x.bin"
"#;
        assert!(matches!(
            TrainingConfig::from_yaml(yaml),
            Err(ConfigError::ZeroIterations)
        ));
    }

    #[timed_test]
    fn shallow_stack_fails() {
        let yaml = r#"
variant: preflop
iterations: 10
stack_depth: 1
output_path: "x.bin"
"#;
        assert!(matches!(
            TrainingConfig::from_yaml(yaml),
            Err(ConfigError::StackTooShallow(1))
        ));
    }

    #[timed_test]
    fn zero_buckets_fails() {
        let yaml = r#"
variant: postflop
iterations: 10
river_buckets: 0
output_path: "x.bin"
"#;
        assert!(matches!(
            TrainingConfig::from_yaml(yaml),
            Err(ConfigError::ZeroBuckets("river"))
        ));
    }

    #[timed_test]
    fn unknown_variant_fails_to_parse() {
        let yaml = r#"
variant: omaha
iterations: 10
output_path: "x.bin"
"#;
        assert!(matches!(
            TrainingConfig::from_yaml(yaml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[timed_test]
    fn default_config_validates() {
        assert!(TrainingConfig::preflop_default().validate().is_ok());
    }
}
