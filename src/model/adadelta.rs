use super::*;
use crate::Weight;

/// Adadelta (Zeiler, 2012) with a learning-rate multiplier on the update.
#[derive(Debug, Clone)]
pub struct Adadelta {
    lr: f32,
    rho: Weight,
    eps: Weight,
    square_avg: Vec<Vec<Weight>>,
    acc_delta: Vec<Vec<Weight>>,
}

impl Adadelta {
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            rho: crate::ADADELTA_RHO,
            eps: crate::ADADELTA_EPS,
            square_avg: Vec::new(),
            acc_delta: Vec::new(),
        }
    }

    /// Lazily shape running averages after the parameters.
    fn ensure(&mut self, parameters: &[Parameter]) {
        if self.square_avg.len() != parameters.len() {
            self.square_avg = parameters.iter().map(|p| vec![0.0; p.len()]).collect();
            self.acc_delta = parameters.iter().map(|p| vec![0.0; p.len()]).collect();
        }
    }
}

impl Optimizer for Adadelta {
    fn step(&mut self, parameters: &mut [Parameter], gradients: &Gradients) {
        self.ensure(parameters);
        let (rho, eps, lr) = (self.rho, self.eps, self.lr);
        for (i, parameter) in parameters.iter_mut().enumerate() {
            let grads = gradients.buffer(i);
            let square = &mut self.square_avg[i];
            let accum = &mut self.acc_delta[i];
            for (j, theta) in parameter.values_mut().iter_mut().enumerate() {
                let g = grads[j];
                square[j] = rho * square[j] + (1.0 - rho) * g * g;
                let delta = ((accum[j] + eps).sqrt() / (square[j] + eps).sqrt()) * g;
                accum[j] = rho * accum[j] + (1.0 - rho) * delta * delta;
                *theta -= lr * delta;
            }
        }
    }
    fn learning_rate(&self) -> f32 {
        self.lr
    }
    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }
}
