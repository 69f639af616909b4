use super::*;
use crate::Error;
use crate::Rank;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

/// Connections held by one rank.
enum Links {
    /// Rank 0: one stream per peer, ordered by peer rank.
    Root(Vec<TcpStream>),
    /// Everyone else: a single stream to rank 0.
    Leaf(TcpStream),
}

/// An active communication context for one rank.
///
/// Reductions are gathered at the root, summed in rank order, divided by
/// the world size and scattered back. There are no timeouts: a rank that
/// never contributes blocks every other rank indefinitely.
pub struct Group {
    address: Address,
    links: Links,
}

impl Group {
    /// Rendezvous with every other rank. Returns once all ranks have joined.
    pub async fn connect(address: Address) -> crate::Result<Self> {
        match address.is_root() {
            true => Self::host(address).await,
            false => Self::join(address).await,
        }
    }

    async fn host(address: Address) -> crate::Result<Self> {
        let endpoint = address.endpoint();
        let listener = TcpListener::bind(&endpoint)
            .await
            .map_err(|e| Error::Initialization(format!("bind {}: {}", endpoint, e)))?;
        let mut peers = (1..address.world_size())
            .map(|_| None)
            .collect::<Vec<Option<TcpStream>>>();
        while peers.iter().any(Option::is_none) {
            let (mut stream, from) = listener.accept().await.map_err(Self::bootstrap("accept"))?;
            stream.set_nodelay(true).map_err(Self::bootstrap("configure peer stream"))?;
            let hello = Frame::read(&mut stream).await.map_err(Self::bootstrap("read handshake"))?;
            match hello {
                Frame::Hello(rank) if Self::vacant(&peers, rank) => {
                    log::debug!("rank {} joined from {}", rank, from);
                    peers[rank - 1] = Some(stream);
                }
                frame => {
                    return Err(Error::Initialization(format!(
                        "unexpected handshake {:?} from {}",
                        frame, from
                    )));
                }
            }
        }
        let mut peers = peers.into_iter().flatten().collect::<Vec<_>>();
        futures::future::try_join_all(peers.iter_mut().map(|s| Frame::Ready.write(s)))
            .await
            .map_err(Self::bootstrap("announce ready"))?;
        Ok(Self {
            address,
            links: Links::Root(peers),
        })
    }

    async fn join(address: Address) -> crate::Result<Self> {
        let endpoint = address.endpoint();
        let mut attempts = 0;
        let mut stream = loop {
            match TcpStream::connect(&endpoint).await {
                Ok(stream) => break stream,
                Err(_) if attempts + 1 < crate::CONNECT_ATTEMPTS => {
                    attempts += 1;
                    tokio::time::sleep(crate::CONNECT_BACKOFF).await;
                }
                Err(e) => {
                    return Err(Error::Initialization(format!(
                        "connect {} after {} attempts: {}",
                        endpoint,
                        attempts + 1,
                        e
                    )));
                }
            }
        };
        stream.set_nodelay(true).map_err(Self::bootstrap("configure root stream"))?;
        Frame::Hello(address.rank())
            .write(&mut stream)
            .await
            .map_err(Self::bootstrap("send handshake"))?;
        let ready = Frame::read(&mut stream).await.map_err(Self::bootstrap("await ready"))?;
        match ready {
            Frame::Ready => Ok(Self {
                address,
                links: Links::Leaf(stream),
            }),
            frame => Err(Error::Initialization(format!(
                "expected ready from root, received {:?}",
                frame
            ))),
        }
    }

    /// Anything that goes wrong before the group forms is fatal to it.
    fn bootstrap<E>(stage: &'static str) -> impl FnOnce(E) -> Error
    where
        E: std::fmt::Display,
    {
        move |e| Error::Initialization(format!("{}: {}", stage, e))
    }

    fn vacant(peers: &[Option<TcpStream>], rank: Rank) -> bool {
        rank > 0 && peers.get(rank - 1).is_some_and(Option::is_none)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Teardown barrier. Every rank sends goodbye to the root, the root
    /// answers once all have arrived, then connections drop.
    pub async fn close(self) -> crate::Result<()> {
        match self.links {
            Links::Root(mut peers) => {
                let farewells =
                    futures::future::try_join_all(peers.iter_mut().map(|s| Frame::read(s))).await?;
                for frame in farewells {
                    if frame != Frame::Goodbye {
                        return Err(Error::Protocol(format!("expected goodbye, received {:?}", frame)));
                    }
                }
                futures::future::try_join_all(peers.iter_mut().map(|s| Frame::Goodbye.write(s))).await?;
                Ok(())
            }
            Links::Leaf(mut root) => {
                Frame::Goodbye.write(&mut root).await?;
                match Frame::read(&mut root).await? {
                    Frame::Goodbye => Ok(()),
                    frame => Err(Error::Protocol(format!("expected goodbye, received {:?}", frame))),
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Collective for Group {
    fn rank(&self) -> Rank {
        self.address.rank()
    }
    fn world_size(&self) -> usize {
        self.address.world_size()
    }
    async fn all_reduce_mean(&mut self, values: &mut [f32]) -> crate::Result<()> {
        let n = self.address.world_size();
        match &mut self.links {
            Links::Root(peers) => {
                let contributions =
                    futures::future::try_join_all(peers.iter_mut().map(|s| Frame::read(s))).await?;
                let mut sum = values.to_vec();
                for contribution in contributions {
                    sum.iter_mut()
                        .zip(contribution.into_values(values.len())?)
                        .for_each(|(s, c)| *s += c);
                }
                sum.iter_mut().for_each(|s| *s /= n as f32);
                values.copy_from_slice(&sum);
                let reply = Frame::Reduce(sum);
                futures::future::try_join_all(peers.iter_mut().map(|s| reply.write(s))).await?;
                Ok(())
            }
            Links::Leaf(root) => {
                Frame::Reduce(values.to_vec()).write(root).await?;
                let mean = Frame::read(root).await?.into_values(values.len())?;
                values.copy_from_slice(&mean);
                Ok(())
            }
        }
    }
}
