use crate::Error;

/// Where a step falls in the sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not recording.
    Idle,
    /// Recording, results discarded.
    Warmup,
    /// Recording, results kept.
    Active,
    /// All cycles spent; never records again.
    Done,
}

/// `(skip_first, wait, warmup, active, repeat)` sampling schedule.
///
/// After `skip_first` steps, each cycle is `wait` idle steps, `warmup`
/// discarded steps and `active` recorded steps. `repeat` bounds the number
/// of cycles; zero means cycles never run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    skip_first: usize,
    wait: usize,
    warmup: usize,
    active: usize,
    repeat: usize,
}

impl Window {
    pub fn new(skip_first: usize, wait: usize, warmup: usize, active: usize, repeat: usize) -> crate::Result<Self> {
        match active {
            0 => Err(Error::Configuration("profiler window needs at least one active step".into())),
            _ => Ok(Self {
                skip_first,
                wait,
                warmup,
                active,
                repeat,
            }),
        }
    }

    pub fn cycle(&self) -> usize {
        self.wait + self.warmup + self.active
    }

    pub fn phase(&self, step: usize) -> Phase {
        match step.checked_sub(self.skip_first) {
            None => Phase::Idle,
            Some(s) if self.repeat > 0 && s >= self.repeat * self.cycle() => Phase::Done,
            Some(s) => match s % self.cycle() {
                p if p < self.wait => Phase::Idle,
                p if p < self.wait + self.warmup => Phase::Warmup,
                _ => Phase::Active,
            },
        }
    }

    /// Zero-based cycle a step belongs to, if it is past `skip_first`.
    pub fn ordinal(&self, step: usize) -> Option<usize> {
        step.checked_sub(self.skip_first).map(|s| s / self.cycle())
    }

    /// Whether `step` is the last active step of its cycle.
    pub fn completes(&self, step: usize) -> bool {
        self.phase(step) == Phase::Active
            && step
                .checked_sub(self.skip_first)
                .is_some_and(|s| s % self.cycle() + 1 == self.cycle())
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            skip_first: crate::TRACE_SKIP_FIRST,
            wait: crate::TRACE_WAIT,
            warmup: crate::TRACE_WARMUP,
            active: crate::TRACE_ACTIVE,
            repeat: crate::TRACE_REPEAT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cycle() {
        let window = Window::new(0, 1, 1, 1, 1).unwrap();
        let phases = (0..6).map(|s| window.phase(s)).collect::<Vec<_>>();
        assert_eq!(
            phases,
            vec![Phase::Idle, Phase::Warmup, Phase::Active, Phase::Done, Phase::Done, Phase::Done]
        );
        assert_eq!((0..6).filter(|s| window.completes(*s)).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn skip_then_repeat() {
        let window = Window::new(2, 1, 0, 2, 2).unwrap();
        assert_eq!(window.cycle(), 3);
        assert_eq!(window.phase(0), Phase::Idle);
        assert_eq!(window.phase(1), Phase::Idle);
        assert_eq!(window.phase(2), Phase::Idle);
        assert_eq!(window.phase(3), Phase::Active);
        assert_eq!(window.phase(4), Phase::Active);
        assert_eq!(window.phase(5), Phase::Idle);
        assert_eq!(window.phase(8), Phase::Done);
        assert_eq!((0..12).filter(|s| window.completes(*s)).collect::<Vec<_>>(), vec![4, 7]);
        assert_eq!(window.ordinal(7), Some(1));
        assert_eq!(window.ordinal(1), None);
    }

    #[test]
    fn zero_repeat_never_ends() {
        let window = Window::new(0, 0, 0, 1, 0).unwrap();
        assert!((0..100).all(|s| window.phase(s) == Phase::Active && window.completes(s)));
    }

    #[test]
    fn rejects_empty_active_phase() {
        assert!(matches!(Window::new(0, 1, 1, 0, 1), Err(Error::Configuration(_))));
    }

    #[test]
    fn default_window() {
        assert_eq!(Window::default(), Window::new(0, 1, 1, 1, 1).unwrap());
    }
}
