use super::*;
use crate::Error;
use crate::Rank;
use std::ops::Range;

/// The contiguous block of sample indices owned by one rank.
///
/// The first `len % world_size` ranks take one extra index, so shard sizes
/// differ by at most one and the blocks tile `0..len` in rank order. No
/// shuffling: the same inputs always give the same block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    rank: Rank,
    world_size: usize,
    indices: Range<usize>,
}

impl Shard {
    pub fn new(len: usize, rank: Rank, world_size: usize) -> crate::Result<Self> {
        if world_size == 0 {
            return Err(Error::Configuration("cannot shard across zero ranks".into()));
        }
        if rank >= world_size {
            return Err(Error::Configuration(format!(
                "rank {} outside world of size {}",
                rank, world_size
            )));
        }
        let base = len / world_size;
        let extra = len % world_size;
        let start = rank * base + rank.min(extra);
        let end = start + base + usize::from(rank < extra);
        Ok(Self {
            rank,
            world_size,
            indices: start..end,
        })
    }

    /// Shard of the whole dataset for a single process.
    pub fn whole(len: usize) -> Self {
        Self {
            rank: 0,
            world_size: 1,
            indices: 0..len,
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }
    pub fn world_size(&self) -> usize {
        self.world_size
    }
    pub fn indices(&self) -> Range<usize> {
        self.indices.clone()
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Mini-batches over this shard, in index order.
    pub fn batches(&self, batch_size: usize) -> crate::Result<Batches> {
        Batches::new(self.indices(), batch_size)
    }

    /// Batches per epoch on the largest shard.
    ///
    /// Every rank runs this many scheduler rounds so that all ranks reach
    /// the same number of synchronization points, even when their shards
    /// differ in size by one sample.
    pub fn rounds(len: usize, world_size: usize, batch_size: usize) -> usize {
        match (world_size, batch_size) {
            (0, _) | (_, 0) => 0,
            (w, b) => len.div_ceil(w).div_ceil(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiling(len: usize, world_size: usize) -> Vec<usize> {
        (0..world_size)
            .map(|r| Shard::new(len, r, world_size).unwrap())
            .flat_map(|s| s.indices())
            .collect()
    }

    #[test]
    fn partition_is_exact() {
        for len in [0, 1, 7, 10, 64, 1001] {
            for world_size in 1..=9 {
                assert_eq!(tiling(len, world_size), (0..len).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn sizes_are_balanced() {
        let sizes = (0..4)
            .map(|r| Shard::new(10, r, 4).unwrap().len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn deterministic() {
        assert_eq!(Shard::new(100, 2, 3).unwrap(), Shard::new(100, 2, 3).unwrap());
        assert_eq!(Shard::new(100, 2, 3).unwrap().indices(), 67..100);
    }

    #[test]
    fn rejects_bad_world() {
        assert!(matches!(Shard::new(10, 0, 0), Err(Error::Configuration(_))));
        assert!(matches!(Shard::new(10, 3, 3), Err(Error::Configuration(_))));
    }

    #[test]
    fn rounds_cover_largest_shard() {
        assert_eq!(Shard::rounds(129, 2, 64), 2);
        assert_eq!(Shard::rounds(130, 2, 64), 2);
        assert_eq!(Shard::rounds(131, 2, 64), 2);
        assert_eq!(Shard::rounds(129, 1, 64), 3);
        assert_eq!(Shard::rounds(0, 2, 64), 0);
        for rank in 0..2 {
            let shard = Shard::new(129, rank, 2).unwrap();
            assert!(shard.batches(64).unwrap().len() <= Shard::rounds(129, 2, 64));
        }
    }
}
