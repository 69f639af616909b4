use super::*;
use crate::Loss;

/// What the training loop needs from a classifier.
pub trait Model: Send {
    fn parameters(&self) -> &[Parameter];
    fn parameters_mut(&mut self) -> &mut [Parameter];
    /// Log-probabilities over classes for one input.
    fn forward(&self, pixels: &[f32]) -> Vec<f32>;
    /// Add `scale * ∂loss/∂θ` for one labelled input into `gradients`
    /// and return the unscaled negative log-likelihood.
    fn backward(&self, pixels: &[f32], label: usize, scale: f32, gradients: &mut Gradients) -> Loss;
}

/// Index of the most likely class.
pub fn argmax(scores: &[f32]) -> usize {
    scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
        .unwrap_or_default()
}

/// Numerically stable log-softmax.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum = logits.iter().map(|z| (z - max).exp()).sum::<f32>();
    let log = max + sum.ln();
    logits.iter().map(|z| z - log).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_softmax_normalizes() {
        let logp = log_softmax(&[1.0, 2.0, 3.0, 1000.0]);
        let total = logp.iter().map(|l| l.exp()).sum::<f32>();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(logp.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
