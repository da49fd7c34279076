//! The broker wire contract.
//!
//! One persistent TCP connection per logical channel, line-delimited text
//! frames. The first line a client sends declares the channel:
//!
//! ```text
//! lock <source-label>     the global lock channel
//! store                   the key/value status store
//! topic <name>            broadcast on a named topic
//! ```
//!
//! Lock channels then exchange `acquire` / `release` requests, each answered
//! by a single `lock` / `release` acknowledgement. Store channels exchange
//! `PUT <key> <value>` (acknowledged with `ok`) and `GET <key>` (answered
//! with the value, or `nil`). Topic channels carry fire-and-forget frames
//! fanned out to every other current subscriber.

/// Default broker endpoint, shared by all cooperating processes on a host.
pub const DEFAULT_ADDR: &str = "127.0.0.1:4190";

/// A parsed channel declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// The global lock channel, labeled with the client's source for
    /// auditing.
    Lock {
        /// Human-readable label identifying the acquiring party.
        source: String,
    },
    /// The key/value status store.
    Store,
    /// Broadcast on a named topic.
    Topic {
        /// The topic name.
        name: String,
    },
}

impl Channel {
    /// Parses a hello line into a channel declaration.
    pub fn parse(line: &str) -> Option<Channel> {
        let mut words = line.trim().splitn(2, ' ');
        match (words.next()?, words.next()) {
            ("lock", source) => Some(Channel::Lock {
                source: source.unwrap_or("unknown").to_string(),
            }),
            ("store", None) => Some(Channel::Store),
            ("topic", Some(name)) if !name.is_empty() => Some(Channel::Topic {
                name: name.to_string(),
            }),
            _ => None,
        }
    }

    /// Encodes this declaration as a hello line.
    pub fn encode(&self) -> String {
        match self {
            Channel::Lock { source } => format!("lock {source}"),
            Channel::Store => "store".to_string(),
            Channel::Topic { name } => format!("topic {name}"),
        }
    }
}
