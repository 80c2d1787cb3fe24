//! Regret matching: cumulative regrets to a strategy.

/// Convert a regret vector into a probability distribution.
///
/// Positive regrets are normalized to sum to one; negative regrets get
/// zero mass. With no positive regret anywhere the strategy is uniform.
#[must_use]
pub fn regret_match(regrets: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; regrets.len()];
    regret_match_into(regrets, &mut out);
    out
}

/// [`regret_match`] into a caller-provided buffer, for the hot loop.
///
/// # Panics
///
/// Panics if `out.len() != regrets.len()`.
pub fn regret_match_into(regrets: &[f64], out: &mut [f64]) {
    assert_eq!(regrets.len(), out.len());

    let positive_total: f64 = regrets.iter().filter(|&&r| r > 0.0).sum();
    if positive_total > 0.0 {
        for (slot, &r) in out.iter_mut().zip(regrets) {
            *slot = if r > 0.0 { r / positive_total } else { 0.0 };
        }
    } else {
        #[allow(clippy::cast_precision_loss)]
        let uniform = 1.0 / regrets.len() as f64;
        out.fill(uniform);
    }
}
