//! Lloyd's k-means over equity histograms.
//!
//! Small, self-contained clustering used by the offline abstraction
//! trainer. Point counts are in the tens of thousands and k is at most
//! 50, so the plain algorithm is fast enough.

use rand::seq::SliceRandom;
use rand::Rng;

use super::histogram::{distance_sq, EquityHistogram, EQUITY_BINS};

/// Cluster `points` into `k` centroids.
///
/// Initial centroids are drawn uniformly from the points; iteration
/// stops when assignments settle or after `max_iters` rounds. A cluster
/// that goes empty is reseeded from a random point. Centroids are
/// returned sorted by mean equity so that the
/// same data always yields the same table regardless of init order.
#[must_use]
pub fn cluster<R: Rng>(
    points: &[EquityHistogram],
    k: usize,
    max_iters: usize,
    rng: &mut R,
) -> Vec<EquityHistogram> {
    assert!(k > 0, "need at least one cluster");

    if points.len() <= k {
        let mut centroids: Vec<EquityHistogram> = points.to_vec();
        sort_by_mean(&mut centroids);
        return centroids;
    }

    let mut indices: Vec<usize> = (0..points.len()).collect();
    indices.shuffle(rng);
    let mut centroids: Vec<EquityHistogram> =
        indices[..k].iter().map(|&i| points[i]).collect();

    let mut assignment = vec![0usize; points.len()];
    for _ in 0..max_iters {
        let mut changed = false;
        for (point, slot) in points.iter().zip(assignment.iter_mut()) {
            let best = nearest(&centroids, point);
            if best != *slot {
                *slot = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        // Recompute means.
        let mut sums = vec![[0.0f64; EQUITY_BINS]; k];
        let mut counts = vec![0u32; k];
        for (point, &slot) in points.iter().zip(&assignment) {
            counts[slot] += 1;
            for (acc, &v) in sums[slot].iter_mut().zip(point.iter()) {
                *acc += f64::from(v);
            }
        }

        for (slot, (sum, &count)) in sums.iter().zip(&counts).enumerate() {
            if count == 0 {
                // Reseed a dead cluster from a random point.
                centroids[slot] = points[rng.gen_range(0..points.len())];
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            let mean: EquityHistogram =
                std::array::from_fn(|i| (sum[i] / f64::from(count)) as f32);
            centroids[slot] = mean;
        }
    }

    sort_by_mean(&mut centroids);
    centroids
}

/// Index of the centroid nearest to `point`.
#[must_use]
pub fn nearest(centroids: &[EquityHistogram], point: &EquityHistogram) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance_sq(c, point);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Expected equity implied by a histogram (bin midpoints).
#[allow(clippy::cast_precision_loss)]
fn histogram_mean(h: &EquityHistogram) -> f32 {
    h.iter()
        .enumerate()
        .map(|(i, p)| p * (i as f32 + 0.5) / EQUITY_BINS as f32)
        .sum()
}

fn sort_by_mean(centroids: &mut [EquityHistogram]) {
    centroids.sort_by(|a, b| {
        histogram_mean(a)
            .partial_cmp(&histogram_mean(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
