use super::*;
use crate::Rank;
use crate::group::Address;
use crate::profiler::Window;
use crate::schedule::Accumulation;
use std::path::PathBuf;

/// Data-parallel MNIST-style training with gradient accumulation and
/// step-sampled profiling.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "trainer", args_override_self = true)]
pub struct Args {
    /// Input batch size for training.
    #[arg(long, default_value_t = 64, value_name = "N")]
    pub batch_size: usize,
    /// Input batch size for testing.
    #[arg(long, default_value_t = 1000, value_name = "N")]
    pub test_batch_size: usize,
    /// Number of epochs to train.
    #[arg(long, default_value_t = 3, value_name = "N")]
    pub epochs: usize,
    /// Learning rate.
    #[arg(long, default_value_t = 1.0, value_name = "LR")]
    pub lr: f32,
    /// Learning rate step gamma.
    #[arg(long, default_value_t = 0.7, value_name = "M")]
    pub gamma: f32,
    /// Quickly check a single pass.
    #[arg(long)]
    pub dry_run: bool,
    /// Random seed.
    #[arg(long, default_value_t = 1, value_name = "S")]
    pub seed: u64,
    /// How many batches to wait before logging training status.
    #[arg(long, default_value_t = 10, value_name = "N")]
    pub log_interval: usize,
    /// Save the trained parameters from rank 0.
    #[arg(long)]
    pub save_model: bool,
    /// Whether to train data-parallel (1) or single-process (0).
    #[arg(long, alias = "use_ddp", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub use_ddp: u8,
    /// Batches whose gradients are accumulated per optimizer step.
    #[arg(long, alias = "accumulate_grad_batches", default_value_t = 2, allow_negative_numbers = true)]
    pub accumulate_grad_batches: i64,
    /// This process's rank; required unless spawning.
    #[arg(long, env = "LOCAL_RANK")]
    pub rank: Option<Rank>,
    /// Number of ranks.
    #[arg(long, env = "WORLD_SIZE", default_value_t = 2)]
    pub world_size: usize,
    /// Coordination host (rank 0 listens here).
    #[arg(long, env = "MASTER_ADDR", default_value = crate::DEFAULT_ADDRESS)]
    pub address: String,
    /// Coordination port.
    #[arg(long, env = "MASTER_PORT", default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,
    /// Spawn one child process per rank (1) or run a single rank (0).
    #[arg(long, env = "USE_SPAWN", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub spawn: u8,
    /// Directory holding uncompressed MNIST IDX files; synthetic data otherwise.
    #[arg(long)]
    pub data: Option<PathBuf>,
    /// Where trace files go; the system temp directory otherwise.
    #[arg(long)]
    pub trace_dir: Option<PathBuf>,
}

impl Args {
    pub fn distributed(&self) -> bool {
        self.use_ddp == 1
    }

    pub fn spawning(&self) -> bool {
        self.distributed() && self.spawn == 1
    }

    /// Group address for `rank`, if training data-parallel.
    pub fn address(&self, rank: Rank) -> crate::Result<Option<Address>> {
        match self.distributed() {
            true => Address::new(rank, self.world_size, self.address.clone(), self.port).map(Some),
            false => Ok(None),
        }
    }

    pub fn config(&self, rank: Rank) -> crate::Result<Config> {
        Config {
            batch_size: self.batch_size,
            test_batch_size: self.test_batch_size,
            epochs: self.epochs,
            lr: self.lr,
            gamma: self.gamma,
            accumulation: Accumulation::new(self.accumulate_grad_batches)?,
            log_interval: self.log_interval,
            dry_run: self.dry_run,
            seed: self.seed,
            save_model: self.save_model,
            window: Window::default(),
            address: self.address(rank)?,
        }
        .validate()
    }

    /// Trace directory for `rank`. Ranks sharing a machine get their own
    /// subdirectory so cycle files do not collide.
    pub fn trace_dir(&self, rank: Rank) -> PathBuf {
        let root = self.trace_dir.clone().unwrap_or_else(std::env::temp_dir);
        match self.distributed() && self.world_size > 1 {
            true => root.join(format!("rank{}", rank)),
            false => root,
        }
    }
}
