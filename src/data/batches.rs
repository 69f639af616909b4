use crate::Error;
use std::ops::Range;

/// Lazy, finite iterator of consecutive index ranges.
/// Iteration order depends only on the index range and batch size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batches {
    remaining: Range<usize>,
    size: usize,
}

impl Batches {
    pub fn new(indices: Range<usize>, size: usize) -> crate::Result<Self> {
        match size {
            0 => Err(Error::Configuration("batch size must be positive".into())),
            size => Ok(Self {
                remaining: indices,
                size,
            }),
        }
    }
}

impl Iterator for Batches {
    type Item = Range<usize>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.remaining.is_empty() {
            true => None,
            false => {
                let start = self.remaining.start;
                let end = self.remaining.end.min(start + self.size);
                self.remaining.start = end;
                Some(start..end)
            }
        }
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.len().div_ceil(self.size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Batches {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Shard;

    #[test]
    fn last_batch_is_short() {
        let batches = Batches::new(3..13, 4).unwrap().collect::<Vec<_>>();
        assert_eq!(batches, vec![3..7, 7..11, 11..13]);
    }

    #[test]
    fn restartable() {
        let shard = Shard::new(50, 1, 3).unwrap();
        let first = shard.batches(8).unwrap().collect::<Vec<_>>();
        let again = shard.batches(8).unwrap().collect::<Vec<_>>();
        assert_eq!(first, again);
        assert_eq!(first.iter().map(|b| b.len()).sum::<usize>(), shard.len());
    }

    #[test]
    fn exact_size() {
        let mut batches = Batches::new(0..10, 3).unwrap();
        assert_eq!(batches.len(), 4);
        batches.next();
        assert_eq!(batches.len(), 3);
    }

    #[test]
    fn empty_range() {
        assert_eq!(Batches::new(5..5, 2).unwrap().next(), None);
        assert!(Batches::new(0..5, 0).is_err());
    }
}
