//! Card abstraction: mapping holdings to small bucket indices.
//!
//! Preflop uses the lossless 169-class canonical hand index. Postflop
//! streets use equity-distribution clustering: an offline trainer
//! k-means-clusters equity histograms into 50/50/10 buckets for
//! flop/turn/river, and at runtime a holding is assigned to its nearest
//! centroid. Identical centroids always produce identical buckets.

pub mod centroids;
pub mod histogram;
pub mod kmeans;
pub mod preflop;

pub use centroids::{equity_bucket, CentroidTable, CentroidTrainer};
pub use histogram::{equity_histogram, EquityHistogram, EQUITY_BINS};
pub use preflop::{bucket_from_name, bucket_name, preflop_bucket, PREFLOP_BUCKETS};
