use crate::Rank;

/// Everything a rank needs to join a group.
/// Passed explicitly into initialization instead of living in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    rank: Rank,
    world_size: usize,
    host: String,
    port: u16,
}

impl Address {
    pub fn new(rank: Rank, world_size: usize, host: impl Into<String>, port: u16) -> crate::Result<Self> {
        match (rank, world_size) {
            (_, 0) => Err(crate::Error::Configuration("world size must be positive".into())),
            (r, n) if r >= n => Err(crate::Error::Configuration(format!(
                "rank {} outside world of size {}",
                r, n
            ))),
            _ => Ok(Self {
                rank,
                world_size,
                host: host.into(),
                port,
            }),
        }
    }
    pub fn rank(&self) -> Rank {
        self.rank
    }
    pub fn world_size(&self) -> usize {
        self.world_size
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rank {}/{} @ {}", self.rank, self.world_size, self.endpoint())
    }
}
