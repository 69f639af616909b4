use crate::Rank;

/// Collective operations a replica needs from its group.
#[async_trait::async_trait]
pub trait Collective: Send {
    fn rank(&self) -> Rank;
    fn world_size(&self) -> usize;
    /// Replace `values` on every rank with the elementwise mean across ranks.
    /// Blocks until every rank has contributed.
    async fn all_reduce_mean(&mut self, values: &mut [f32]) -> crate::Result<()>;
    /// Block until every rank arrives.
    async fn barrier(&mut self) -> crate::Result<()> {
        self.all_reduce_mean(&mut []).await
    }
}

/// Single-process stand-in. Every collective is a pass-through.
#[derive(Debug, Default, Clone, Copy)]
pub struct Local;

#[async_trait::async_trait]
impl Collective for Local {
    fn rank(&self) -> Rank {
        0
    }
    fn world_size(&self) -> usize {
        1
    }
    async fn all_reduce_mean(&mut self, _: &mut [f32]) -> crate::Result<()> {
        Ok(())
    }
}
