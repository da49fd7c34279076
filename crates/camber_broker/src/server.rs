//! The broker service.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::BrokerError;
use crate::protocol::Channel;

/// The global lock: at most one holder, FIFO waiters.
#[derive(Default)]
struct LockState {
    holder: Option<u64>,
    waiters: VecDeque<(u64, oneshot::Sender<()>)>,
}

impl LockState {
    /// Requests the lock. Returns `None` when granted immediately, or a
    /// receiver that resolves when this client's turn comes.
    fn acquire(&mut self, client: u64) -> Option<oneshot::Receiver<()>> {
        if self.holder.is_none() && self.waiters.is_empty() {
            self.holder = Some(client);
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.waiters.push_back((client, tx));
        Some(rx)
    }

    /// Releases the lock if held by `client` and grants the next waiter.
    fn release(&mut self, client: u64) {
        if self.holder != Some(client) {
            return;
        }
        self.grant_next();
    }

    /// Drops a client entirely: releases a held lock and forgets any
    /// queued request.
    fn disconnect(&mut self, client: u64) {
        self.waiters.retain(|(id, _)| *id != client);
        if self.holder == Some(client) {
            self.grant_next();
        }
    }

    fn grant_next(&mut self) {
        // A waiter whose connection died meanwhile fails to receive; skip
        // it and keep granting.
        while let Some((next, tx)) = self.waiters.pop_front() {
            if tx.send(()).is_ok() {
                self.holder = Some(next);
                return;
            }
        }
        self.holder = None;
    }
}

/// Shared broker state.
#[derive(Default)]
struct State {
    lock: Mutex<LockState>,
    store: Mutex<HashMap<String, String>>,
    topics: Mutex<HashMap<String, HashMap<u64, mpsc::UnboundedSender<String>>>>,
    next_client: AtomicU64,
}

/// The coordination service.
///
/// One instance per host; every cooperating process connects to it. The
/// broker is intentionally unauthenticated and single-host — both are
/// declared non-goals.
pub struct BrokerServer {
    listener: TcpListener,
    state: Arc<State>,
}

impl BrokerServer {
    /// Binds the broker to an address (e.g. [`crate::DEFAULT_ADDR`]).
    pub async fn bind(addr: &str) -> Result<Self, BrokerError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "broker listening");
        Ok(Self {
            listener,
            state: Arc::new(State::default()),
        })
    }

    /// The bound address, useful when binding to an ephemeral port.
    pub fn local_addr(&self) -> Result<SocketAddr, BrokerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and serves client connections until the task is dropped.
    pub async fn serve(self) -> Result<(), BrokerError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = serve_client(stream, state).await {
                    debug!(%peer, error = %e, "client connection ended");
                }
            });
        }
    }
}

async fn serve_client(stream: TcpStream, state: Arc<State>) -> Result<(), BrokerError> {
    let client = state.next_client.fetch_add(1, Ordering::Relaxed);
    let (read, write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    let Some(hello) = lines.next_line().await? else {
        return Ok(());
    };
    match Channel::parse(&hello) {
        Some(Channel::Lock { source }) => serve_lock(lines, write, state, client, source).await,
        Some(Channel::Store) => serve_store(lines, write, state).await,
        Some(Channel::Topic { name }) => serve_topic(lines, write, state, client, name).await,
        None => Err(BrokerError::Protocol {
            expected: "channel declaration".to_string(),
            got: hello,
        }),
    }
}

/// The lock channel: strict binary semaphore with FIFO hand-off.
///
/// If a holder disconnects without releasing, the lock is force-released so
/// a crashed client cannot deadlock the system. The accepted risk: a holder
/// that is still running but lost its connection can race the next grantee.
async fn serve_lock(
    mut lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    mut write: OwnedWriteHalf,
    state: Arc<State>,
    client: u64,
    source: String,
) -> Result<(), BrokerError> {
    debug!(client, %source, "lock channel opened");
    let result = loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "acquire" => {
                    let pending = state.lock.lock().unwrap().acquire(client);
                    if let Some(granted) = pending {
                        if granted.await.is_err() {
                            break Err(BrokerError::Closed);
                        }
                    }
                    debug!(client, %source, "lock acquired");
                    if let Err(e) = write.write_all(b"lock\n").await {
                        break Err(BrokerError::Io(e));
                    }
                }
                "release" => {
                    state.lock.lock().unwrap().release(client);
                    debug!(client, %source, "lock released");
                    if let Err(e) = write.write_all(b"release\n").await {
                        break Err(BrokerError::Io(e));
                    }
                }
                other => {
                    warn!(client, frame = other, "unknown lock frame");
                }
            },
            Ok(None) => break Ok(()),
            Err(e) => break Err(BrokerError::Io(e)),
        }
    };
    state.lock.lock().unwrap().disconnect(client);
    result
}

/// The status store: last-write-wins, no history.
async fn serve_store(
    mut lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    mut write: OwnedWriteHalf,
    state: Arc<State>,
) -> Result<(), BrokerError> {
    while let Some(line) = lines.next_line().await? {
        let mut words = line.splitn(3, ' ');
        match (words.next(), words.next(), words.next()) {
            (Some("PUT"), Some(key), Some(value)) => {
                state
                    .store
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), value.to_string());
                write.write_all(b"ok\n").await?;
            }
            (Some("GET"), Some(key), None) => {
                let value = state.store.lock().unwrap().get(key).cloned();
                match value {
                    Some(v) => write.write_all(format!("{v}\n").as_bytes()).await?,
                    None => write.write_all(b"nil\n").await?,
                }
            }
            _ => {
                warn!(frame = %line, "unknown store frame");
            }
        }
    }
    Ok(())
}

/// A topic channel: every inbound frame fans out to all other subscribers.
async fn serve_topic(
    mut lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    mut write: OwnedWriteHalf,
    state: Arc<State>,
    client: u64,
    name: String,
) -> Result<(), BrokerError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state
        .topics
        .lock()
        .unwrap()
        .entry(name.clone())
        .or_default()
        .insert(client, tx);

    // Forward broadcasts from other subscribers out to this client.
    let forwarder = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if write.write_all(format!("{message}\n").as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let result = loop {
        match lines.next_line().await {
            Ok(Some(message)) => {
                let subscribers = state.topics.lock().unwrap();
                if let Some(topic) = subscribers.get(&name) {
                    for (id, subscriber) in topic {
                        if *id != client {
                            let _ = subscriber.send(message.clone());
                        }
                    }
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(BrokerError::Io(e)),
        }
    };

    if let Some(topic) = state.topics.lock().unwrap().get_mut(&name) {
        topic.remove(&client);
    }
    forwarder.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_grant_when_free() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        assert_eq!(lock.holder, Some(1));
    }

    #[test]
    fn second_acquire_queues_fifo() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        let mut rx2 = lock.acquire(2).unwrap();
        let mut rx3 = lock.acquire(3).unwrap();

        assert!(rx2.try_recv().is_err());
        lock.release(1);
        assert!(rx2.try_recv().is_ok());
        assert_eq!(lock.holder, Some(2));

        lock.release(2);
        assert!(rx3.try_recv().is_ok());
        assert_eq!(lock.holder, Some(3));
    }

    #[test]
    fn release_by_non_holder_is_ignored() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        lock.release(2);
        assert_eq!(lock.holder, Some(1));
    }

    #[test]
    fn disconnect_of_holder_fail_opens() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        let mut rx2 = lock.acquire(2).unwrap();
        lock.disconnect(1);
        assert!(rx2.try_recv().is_ok());
        assert_eq!(lock.holder, Some(2));
    }

    #[test]
    fn disconnect_of_waiter_forgets_request() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        let _rx2 = lock.acquire(2).unwrap();
        let mut rx3 = lock.acquire(3).unwrap();
        lock.disconnect(2);
        lock.release(1);
        assert!(rx3.try_recv().is_ok());
        assert_eq!(lock.holder, Some(3));
    }

    #[test]
    fn dead_waiter_is_skipped_when_granting() {
        let mut lock = LockState::default();
        assert!(lock.acquire(1).is_none());
        let rx2 = lock.acquire(2).unwrap();
        drop(rx2);
        lock.release(1);
        assert_eq!(lock.holder, None);
    }
}
