use crate::model::Optimizer;

/// Multiply the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone, Copy)]
pub struct StepLr {
    gamma: f32,
    step_size: usize,
    epoch: usize,
}

impl StepLr {
    pub fn new(gamma: f32, step_size: usize) -> Self {
        Self {
            gamma,
            step_size: step_size.max(1),
            epoch: 0,
        }
    }

    /// Called once at the end of every epoch.
    pub fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.epoch += 1;
        if self.epoch % self.step_size == 0 {
            let lr = optimizer.learning_rate() * self.gamma;
            log::debug!("learning rate decays to {:.6}", lr);
            optimizer.set_learning_rate(lr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Adadelta;

    #[test]
    fn decays_every_step_size_epochs() {
        let mut optimizer = Adadelta::new(1.0);
        let mut decay = StepLr::new(0.5, 2);
        decay.step(&mut optimizer);
        assert_eq!(optimizer.learning_rate(), 1.0);
        decay.step(&mut optimizer);
        assert_eq!(optimizer.learning_rate(), 0.5);
        decay.step(&mut optimizer);
        decay.step(&mut optimizer);
        assert_eq!(optimizer.learning_rate(), 0.25);
    }
}
