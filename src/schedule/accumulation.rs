use crate::Error;
use std::num::NonZeroUsize;

/// What to do with the optimizer after a batch's backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Keep adding into the gradient buffers.
    Accumulate,
    /// Synchronize, step, then zero the buffers.
    Step,
}

/// Steps every `period` batches and always on an epoch's last batch, so
/// a trailing partial cycle is never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulation {
    period: NonZeroUsize,
}

impl Accumulation {
    /// Non-positive periods are rejected rather than silently disabling
    /// accumulation.
    pub fn new(period: i64) -> crate::Result<Self> {
        usize::try_from(period)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(|period| Self { period })
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "accumulation period must be positive, got {}",
                    period
                ))
            })
    }

    pub fn period(&self) -> usize {
        self.period.get()
    }

    /// Transition for batch `batch` of an epoch with `total` batches.
    pub fn transition(&self, batch: usize, total: usize) -> Transition {
        match batch % self.period() == 0 || batch + 1 == total {
            true => Transition::Step,
            false => Transition::Accumulate,
        }
    }

    /// Batch indices that step in an epoch of `total` batches.
    pub fn steps(&self, total: usize) -> impl Iterator<Item = usize> + '_ {
        (0..total).filter(move |i| self.transition(*i, total) == Transition::Step)
    }
}

impl Default for Accumulation {
    fn default() -> Self {
        Self {
            period: NonZeroUsize::MIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_batch_is_forced() {
        let schedule = Accumulation::new(3).unwrap();
        assert_eq!(schedule.steps(10).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(schedule.steps(8).collect::<Vec<_>>(), vec![0, 3, 6, 7]);
    }

    #[test]
    fn step_count_is_ceiling_plus_forced() {
        for k in 1..6i64 {
            let schedule = Accumulation::new(k).unwrap();
            for total in 1..40usize {
                let k = k as usize;
                let forced = usize::from((total - 1) % k != 0);
                assert_eq!(schedule.steps(total).count(), total.div_ceil(k) + forced);
            }
        }
    }

    #[test]
    fn period_one_always_steps() {
        let schedule = Accumulation::default();
        assert!((0..7).all(|i| schedule.transition(i, 7) == Transition::Step));
    }

    #[test]
    fn accumulates_between_steps() {
        let schedule = Accumulation::new(4).unwrap();
        assert_eq!(schedule.transition(0, 10), Transition::Step);
        assert_eq!(schedule.transition(1, 10), Transition::Accumulate);
        assert_eq!(schedule.transition(3, 10), Transition::Accumulate);
        assert_eq!(schedule.transition(4, 10), Transition::Step);
    }

    #[test]
    fn rejects_non_positive_period() {
        assert!(matches!(Accumulation::new(0), Err(Error::Configuration(_))));
        assert!(matches!(Accumulation::new(-2), Err(Error::Configuration(_))));
    }
}
