use super::*;
use crate::Error;
use crate::Rank;

/// Whether the run ended up distributed after initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Distributed { rank: Rank, world_size: usize },
    /// Single-process mode. No collectives may be issued.
    Local,
}

impl Membership {
    pub fn rank(&self) -> Rank {
        match self {
            Self::Distributed { rank, .. } => *rank,
            Self::Local => 0,
        }
    }
    pub fn world_size(&self) -> usize {
        match self {
            Self::Distributed { world_size, .. } => *world_size,
            Self::Local => 1,
        }
    }
    /// The rank allowed to write shared artifacts.
    pub fn is_leader(&self) -> bool {
        self.rank() == 0
    }
}

/// Whether this platform can host the TCP transport.
pub fn available() -> bool {
    cfg!(not(any(target_os = "windows", target_arch = "wasm32")))
}

/// Owns the lifecycle of at most one process group.
#[derive(Default)]
pub struct Manager {
    group: Option<Group>,
    local: Local,
}

impl Manager {
    pub fn is_active(&self) -> bool {
        self.group.is_some()
    }

    /// Join the group described by `address`.
    ///
    /// On platforms without the transport this downgrades to
    /// [`Membership::Local`] and no context is created.
    pub async fn initialize(&mut self, address: Address) -> crate::Result<Membership> {
        if self.is_active() {
            return Err(Error::Initialization(
                "a process group is already active on this manager".into(),
            ));
        }
        log::info!("registering {}", address);
        if !available() {
            log::warn!("distributed transport unavailable here, continuing single-process");
            return Ok(Membership::Local);
        }
        let group = Group::connect(address).await?;
        let membership = Membership::Distributed {
            rank: group.rank(),
            world_size: group.world_size(),
        };
        log::info!("process group ready ({} ranks)", membership.world_size());
        self.group = Some(group);
        Ok(membership)
    }

    /// Teardown barrier, then release the context.
    pub async fn destroy(&mut self) -> crate::Result<()> {
        match self.group.take() {
            Some(group) => {
                log::info!("tearing down process group ({})", group.address());
                group.close().await
            }
            None => Err(Error::State("destroy called without an active process group".into())),
        }
    }

    /// The active group, or a pass-through when there is none.
    pub fn collective(&mut self) -> &mut dyn Collective {
        match self.group.as_mut() {
            Some(group) => group as &mut dyn Collective,
            None => &mut self.local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singleton() -> Address {
        Address::new(0, 1, "127.0.0.1", 0).unwrap()
    }

    #[tokio::test]
    async fn destroy_requires_active_group() {
        let mut manager = Manager::default();
        assert!(matches!(manager.destroy().await, Err(Error::State(_))));
    }

    #[tokio::test]
    async fn lifecycle() {
        let mut manager = Manager::default();
        let membership = manager.initialize(singleton()).await.unwrap();
        assert_eq!(membership, Membership::Distributed { rank: 0, world_size: 1 });
        assert!(manager.is_active());
        manager.destroy().await.unwrap();
        assert!(!manager.is_active());
        assert!(matches!(manager.destroy().await, Err(Error::State(_))));
    }

    #[tokio::test]
    async fn double_initialization_fails() {
        let mut manager = Manager::default();
        manager.initialize(singleton()).await.unwrap();
        assert!(matches!(
            manager.initialize(singleton()).await,
            Err(Error::Initialization(_))
        ));
        manager.destroy().await.unwrap();
    }

    #[tokio::test]
    async fn collective_without_group_is_local() {
        let mut manager = Manager::default();
        let mut values = vec![4.0, 2.0];
        manager.collective().all_reduce_mean(&mut values).await.unwrap();
        assert_eq!(values, vec![4.0, 2.0]);
        assert_eq!(manager.collective().world_size(), 1);
    }

    #[test]
    fn local_membership_leads() {
        assert!(Membership::Local.is_leader());
        assert_eq!(Membership::Local.world_size(), 1);
        assert!(!Membership::Distributed { rank: 1, world_size: 2 }.is_leader());
    }
}
