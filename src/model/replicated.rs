use super::*;
use crate::Loss;
use crate::data::Dataset;
use crate::group::Collective;
use std::ops::Range;

/// A local model copy whose gradients are averaged across ranks before
/// each optimizer step.
///
/// Gradient buffers are never cleared here. Callers zero them at the
/// points their accumulation schedule dictates; skipping that silently
/// carries stale gradients into the next cycle.
pub struct Replicated<M> {
    model: M,
    gradients: Gradients,
}

impl<M> Replicated<M>
where
    M: Model,
{
    pub fn new(model: M) -> Self {
        Self {
            gradients: Gradients::zeros(model.parameters()),
            model,
        }
    }
    pub fn model(&self) -> &M {
        &self.model
    }
    pub fn gradients(&self) -> &Gradients {
        &self.gradients
    }

    /// Forward and backward over one batch, adding the gradient of the
    /// batch-mean loss into the buffers. Returns the batch-mean loss.
    pub fn backward(&mut self, dataset: &dyn Dataset, batch: Range<usize>) -> Loss {
        let scale = 1.0 / batch.len().max(1) as f32;
        let total = batch
            .map(|i| dataset.get(i))
            .map(|s| self.model.backward(s.pixels, s.label, scale, &mut self.gradients))
            .sum::<Loss>();
        self.gradients.contribute();
        total * scale
    }

    /// Replace local gradients with their mean across all ranks.
    pub async fn synchronize(&mut self, collective: &mut dyn Collective) -> crate::Result<()> {
        let mut flat = self.gradients.flatten();
        collective.all_reduce_mean(&mut flat).await?;
        self.gradients.assign(&flat)
    }

    /// Apply the current gradients.
    pub fn step<O>(&mut self, optimizer: &mut O)
    where
        O: Optimizer,
    {
        optimizer.step(self.model.parameters_mut(), &self.gradients);
    }

    pub async fn synchronize_and_step<O>(
        &mut self,
        collective: &mut dyn Collective,
        optimizer: &mut O,
    ) -> crate::Result<()>
    where
        O: Optimizer,
    {
        self.synchronize(collective).await?;
        self.step(optimizer);
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        self.gradients.zero();
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::from(self.model.parameters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Images;
    use crate::group::Local;

    fn replica() -> (Replicated<Linear>, Images) {
        (
            Replicated::new(Linear::new(crate::PIXELS, crate::CLASSES, 1)),
            Images::synthetic(16, 1),
        )
    }

    #[test]
    fn contributions_grow_until_cleared() {
        let (mut replica, images) = replica();
        let mut counts = Vec::new();
        for k in 0..3 {
            replica.backward(&images, 4 * k..4 * k + 4);
            counts.push(replica.gradients().contributions());
        }
        assert_eq!(counts, vec![1, 2, 3]);
        replica.zero_grad();
        assert!(replica.gradients().is_zero());
    }

    #[tokio::test]
    async fn synchronization_keeps_gradients() {
        let (mut replica, images) = replica();
        replica.backward(&images, 0..8);
        let before = replica.gradients().clone();
        let mut optimizer = Adadelta::new(1.0);
        replica
            .synchronize_and_step(&mut Local, &mut optimizer)
            .await
            .unwrap();
        assert_eq!(replica.gradients(), &before);
    }

    #[tokio::test]
    async fn step_lowers_loss() {
        let (mut replica, images) = replica();
        let mut optimizer = Adadelta::new(1.0);
        let first = replica.backward(&images, 0..16);
        for _ in 0..20 {
            replica.synchronize_and_step(&mut Local, &mut optimizer).await.unwrap();
            replica.zero_grad();
            replica.backward(&images, 0..16);
        }
        replica.zero_grad();
        let last = replica.backward(&images, 0..16);
        assert!(last < first, "{} !< {}", last, first);
    }
}
