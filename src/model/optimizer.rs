use super::*;

/// Applies accumulated gradients to parameters.
pub trait Optimizer: Send {
    fn step(&mut self, parameters: &mut [Parameter], gradients: &Gradients);
    fn learning_rate(&self) -> f32;
    fn set_learning_rate(&mut self, lr: f32);
}
