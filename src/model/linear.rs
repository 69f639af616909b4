use super::*;
use crate::Loss;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

const WEIGHT: usize = 0;
const BIAS: usize = 1;

/// Softmax regression: `log_softmax(W x + b)`.
#[derive(Debug, Clone)]
pub struct Linear {
    inputs: usize,
    classes: usize,
    parameters: Vec<Parameter>,
}

impl Linear {
    /// Uniform initialization in `±1/√inputs`, seeded.
    pub fn new(inputs: usize, classes: usize, seed: u64) -> Self {
        let ref mut rng = SmallRng::seed_from_u64(seed);
        let bound = 1.0 / (inputs as f32).sqrt();
        let mut init = |n: usize| {
            (0..n)
                .map(|_| rng.random_range(-bound..bound))
                .collect::<Vec<f32>>()
        };
        let weight = init(inputs * classes);
        let bias = init(classes);
        Self {
            inputs,
            classes,
            parameters: vec![
                Parameter::new("fc.weight", weight),
                Parameter::new("fc.bias", bias),
            ],
        }
    }

    fn logits(&self, pixels: &[f32]) -> Vec<f32> {
        let weight = self.parameters[WEIGHT].values();
        let bias = self.parameters[BIAS].values();
        weight
            .chunks(self.inputs)
            .zip(bias)
            .map(|(row, b)| b + row.iter().zip(pixels).map(|(w, x)| w * x).sum::<f32>())
            .collect()
    }
}

impl Model for Linear {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
    fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }
    fn forward(&self, pixels: &[f32]) -> Vec<f32> {
        log_softmax(&self.logits(pixels))
    }
    fn backward(&self, pixels: &[f32], label: usize, scale: f32, gradients: &mut Gradients) -> Loss {
        let logp = self.forward(pixels);
        // ∂nll/∂z = softmax(z) - onehot(label)
        let delta = logp
            .iter()
            .enumerate()
            .map(|(c, l)| l.exp() - if c == label { 1.0 } else { 0.0 })
            .map(|d| d * scale)
            .collect::<Vec<f32>>();
        gradients
            .buffer_mut(WEIGHT)
            .chunks_mut(self.inputs)
            .zip(delta.iter())
            .for_each(|(row, d)| row.iter_mut().zip(pixels).for_each(|(g, x)| *g += d * x));
        gradients
            .buffer_mut(BIAS)
            .iter_mut()
            .zip(delta.iter())
            .for_each(|(g, d)| *g += d);
        debug_assert!(delta.len() == self.classes);
        -logp[label]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_initialization() {
        let a = Linear::new(4, 3, 1);
        let b = Linear::new(4, 3, 1);
        assert_eq!(a.parameters(), b.parameters());
        assert_eq!(a.parameters()[0].len(), 12);
        assert_eq!(a.parameters()[1].len(), 3);
        assert!(a.parameters()[0].values().iter().all(|w| w.abs() <= 0.5));
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let model = Linear::new(3, 4, 9);
        let pixels = [0.5, -1.0, 2.0];
        let label = 2;
        let ref mut grads = Gradients::zeros(model.parameters());
        let loss = model.backward(&pixels, label, 1.0, grads);
        let h = 1e-2;
        for (p, i) in [(0usize, 0usize), (0, 7), (1, 2), (1, 3)] {
            let mut nudged = model.clone();
            nudged.parameters_mut()[p].values_mut()[i] += h;
            let numeric = (-nudged.forward(&pixels)[label] - loss) / h;
            assert!((numeric - grads.buffer(p)[i]).abs() < 2e-2, "parameter {} index {}", p, i);
        }
    }

    #[test]
    fn backward_accumulates() {
        let model = Linear::new(2, 2, 3);
        let ref mut grads = Gradients::zeros(model.parameters());
        model.backward(&[1.0, 1.0], 0, 1.0, grads);
        let once = grads.flatten();
        model.backward(&[1.0, 1.0], 0, 1.0, grads);
        let twice = grads.flatten();
        once.iter()
            .zip(twice.iter())
            .for_each(|(a, b)| assert!((2.0 * a - b).abs() < 1e-6));
    }
}
