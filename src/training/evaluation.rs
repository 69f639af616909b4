use crate::Loss;
use crate::data::Dataset;
use crate::data::Shard;
use crate::model::Model;
use crate::model::argmax;

/// Loss and accuracy over one rank's test shard. Not reduced across ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    loss: Loss,
    correct: usize,
    total: usize,
}

impl Evaluation {
    pub fn run<M>(model: &M, dataset: &dyn Dataset, shard: &Shard, batch_size: usize) -> crate::Result<Self>
    where
        M: Model,
    {
        let mut evaluation = Self {
            loss: 0.0,
            correct: 0,
            total: 0,
        };
        for batch in shard.batches(batch_size)? {
            for sample in batch.map(|i| dataset.get(i)) {
                let ref logp = model.forward(sample.pixels);
                evaluation.loss -= logp[sample.label];
                evaluation.correct += usize::from(argmax(logp) == sample.label);
                evaluation.total += 1;
            }
        }
        Ok(evaluation)
    }

    /// Mean negative log-likelihood.
    pub fn loss(&self) -> Loss {
        match self.total {
            0 => 0.0,
            n => self.loss / n as Loss,
        }
    }
    pub fn correct(&self) -> usize {
        self.correct
    }
    pub fn total(&self) -> usize {
        self.total
    }
    pub fn accuracy(&self) -> f32 {
        match self.total {
            0 => 0.0,
            n => self.correct as f32 / n as f32,
        }
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "test set: average loss: {:.4}, accuracy: {}/{} ({:.0}%)",
            self.loss(),
            self.correct,
            self.total,
            100.0 * self.accuracy()
        )
    }
}
