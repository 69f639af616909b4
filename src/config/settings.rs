use crate::Error;
use crate::group::Address;
use crate::profiler::Window;
use crate::schedule::Accumulation;

/// Validated settings for one rank's training run.
#[derive(Debug, Clone)]
pub struct Config {
    pub batch_size: usize,
    pub test_batch_size: usize,
    pub epochs: usize,
    pub lr: f32,
    /// Multiplicative learning rate decay applied after every epoch.
    pub gamma: f32,
    pub accumulation: Accumulation,
    /// Batches between progress lines.
    pub log_interval: usize,
    /// Stop each epoch after its first progress line.
    pub dry_run: bool,
    pub seed: u64,
    pub save_model: bool,
    pub window: Window,
    /// Group to join; `None` trains single-process.
    pub address: Option<Address>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 64,
            test_batch_size: 1000,
            epochs: 3,
            lr: 1.0,
            gamma: 0.7,
            accumulation: Accumulation::default(),
            log_interval: 10,
            dry_run: false,
            seed: 1,
            save_model: false,
            window: Window::default(),
            address: None,
        }
    }
}

impl Config {
    pub fn validate(self) -> crate::Result<Self> {
        let fail = |what: &str| Err(Error::Configuration(format!("{} must be positive", what)));
        match () {
            _ if self.batch_size == 0 => fail("batch size"),
            _ if self.test_batch_size == 0 => fail("test batch size"),
            _ if self.log_interval == 0 => fail("log interval"),
            _ if !(self.lr > 0.0) => fail("learning rate"),
            _ if !(self.gamma > 0.0) => fail("decay factor"),
            _ => Ok(self),
        }
    }

    pub fn rank(&self) -> crate::Rank {
        self.address.as_ref().map(Address::rank).unwrap_or_default()
    }

    pub fn world_size(&self) -> usize {
        self.address.as_ref().map(Address::world_size).unwrap_or(1)
    }
}
