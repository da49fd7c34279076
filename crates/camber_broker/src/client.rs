//! Broker client channels.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::BrokerError;
use crate::protocol::{Channel, DEFAULT_ADDR};

/// A handle on the broker endpoint; opens one connection per channel.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    addr: String,
}

impl BrokerClient {
    /// A client for the given broker address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Opens the global lock channel under a source label.
    pub async fn lock(&self, source: &str) -> Result<LockChannel, BrokerError> {
        let link = Link::open(
            &self.addr,
            Channel::Lock {
                source: source.to_string(),
            },
        )
        .await?;
        Ok(LockChannel { link })
    }

    /// Opens a status store channel.
    pub async fn store(&self) -> Result<StoreChannel, BrokerError> {
        let link = Link::open(&self.addr, Channel::Store).await?;
        Ok(StoreChannel { link })
    }

    /// Subscribes to a broadcast topic.
    pub async fn topic(&self, name: &str) -> Result<TopicChannel, BrokerError> {
        let link = Link::open(
            &self.addr,
            Channel::Topic {
                name: name.to_string(),
            },
        )
        .await?;
        Ok(TopicChannel { link })
    }
}

impl Default for BrokerClient {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR)
    }
}

/// One persistent line-framed connection.
struct Link {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl Link {
    async fn open(addr: &str, channel: Channel) -> Result<Self, BrokerError> {
        let stream = TcpStream::connect(addr).await?;
        let (read, write) = stream.into_split();
        let mut link = Self {
            lines: BufReader::new(read).lines(),
            write,
        };
        link.send(&channel.encode()).await?;
        Ok(link)
    }

    async fn send(&mut self, frame: &str) -> Result<(), BrokerError> {
        self.write.write_all(format!("{frame}\n").as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, BrokerError> {
        Ok(self.lines.next_line().await?)
    }

    async fn expect(&mut self, ack: &str) -> Result<(), BrokerError> {
        match self.recv().await? {
            Some(frame) if frame == ack => Ok(()),
            Some(frame) => Err(BrokerError::Protocol {
                expected: ack.to_string(),
                got: frame,
            }),
            None => Err(BrokerError::Closed),
        }
    }
}

/// The global mutual-exclusion lock.
///
/// `acquire` blocks (FIFO at the broker) until the lock is granted. Dropping
/// the channel while holding the lock releases it broker-side, by design.
pub struct LockChannel {
    link: Link,
}

impl LockChannel {
    /// Acquires the global lock, blocking until granted.
    pub async fn acquire(&mut self) -> Result<(), BrokerError> {
        self.link.send("acquire").await?;
        self.link.expect("lock").await
    }

    /// Releases the global lock.
    pub async fn release(&mut self) -> Result<(), BrokerError> {
        self.link.send("release").await?;
        self.link.expect("release").await
    }
}

/// The last-write-wins key/value status store.
pub struct StoreChannel {
    link: Link,
}

impl StoreChannel {
    /// Stores a value under a key, replacing any previous value.
    ///
    /// Values are single-line; use [`put_json`](Self::put_json) for
    /// structured payloads.
    pub async fn put(&mut self, key: &str, value: &str) -> Result<(), BrokerError> {
        self.link.send(&format!("PUT {key} {value}")).await?;
        self.link.expect("ok").await
    }

    /// Stores a JSON payload under a key.
    pub async fn put_json(
        &mut self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), BrokerError> {
        self.put(key, &value.to_string()).await
    }

    /// Fetches the current value for a key, if any.
    pub async fn get(&mut self, key: &str) -> Result<Option<String>, BrokerError> {
        self.link.send(&format!("GET {key}")).await?;
        match self.link.recv().await? {
            Some(frame) if frame == "nil" => Ok(None),
            Some(frame) => Ok(Some(frame)),
            None => Err(BrokerError::Closed),
        }
    }
}

/// A broadcast topic subscription.
pub struct TopicChannel {
    link: Link,
}

impl TopicChannel {
    /// Publishes a message to every other subscriber of this topic.
    ///
    /// Fire-and-forget: there is no acknowledgement, no backlog, and a
    /// subscriber connecting later never sees it.
    pub async fn publish(&mut self, message: &str) -> Result<(), BrokerError> {
        self.link.send(message).await
    }

    /// Waits for the next message broadcast by another subscriber.
    pub async fn recv(&mut self) -> Result<Option<String>, BrokerError> {
        self.link.recv().await
    }
}
