//! IPC Module
//!
//! Message-queue transport shared by clients and the server.
//!
//! ## Model (System V message queues)
//! - A queue is addressed by an integer key and created on first use
//! - Every message carries a positive type tag; receivers filter by tag
//! - Messages with the same tag are delivered FIFO
//! - Removing a queue discards its backlog; the next send or receive
//!   creates a fresh, empty queue under the same key

mod memory;
mod sysv;

pub use memory::MemoryTransport;
pub use sysv::SysVTransport;

use std::time::Duration;

use crate::error::{GpioError, Result};

/// Integer key naming a queue
pub type QueueKey = i32;

/// Parse a queue key given in decimal or as `0x`-prefixed hexadecimal
///
/// Hex keys are read as the 32 raw bits, so `0xFFFFFFFF` is `-1`.
pub fn parse_queue_key(s: &str) -> Result<QueueKey> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).map(|v| v as QueueKey),
        None => s.parse::<QueueKey>(),
    };
    parsed.map_err(|e| GpioError::Config(format!("invalid queue key '{}': {}", s, e)))
}

/// Message type tag
pub type MessageTag = i64;

/// A message taken off a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tag: MessageTag,
    pub payload: Vec<u8>,
}

/// Which messages a receive may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    /// Oldest message of any tag
    Any,

    /// Oldest message with exactly this tag
    Exact(MessageTag),
}

impl TagFilter {
    pub fn matches(self, tag: MessageTag) -> bool {
        match self {
            TagFilter::Any => true,
            TagFilter::Exact(wanted) => wanted == tag,
        }
    }
}

/// How long a receive may block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Return immediately when nothing matches
    NoWait,

    /// Block up to the given duration
    Timeout(Duration),
}

/// Message-queue operations used by the client and the server
pub trait Transport: Send + Sync {
    /// Transport name for diagnostics
    fn name(&self) -> &'static str;

    /// Largest payload a single message may carry
    fn max_payload(&self) -> usize;

    /// Append a message to the queue `key`, creating it if needed
    fn send(&self, key: QueueKey, tag: MessageTag, payload: &[u8]) -> Result<()>;

    /// Take the oldest matching message, creating the queue if needed
    ///
    /// `Ok(None)` means nothing matched within the wait.
    fn receive(&self, key: QueueKey, filter: TagFilter, wait: Wait) -> Result<Option<Message>>;

    /// Number of messages waiting; 0 for a queue that does not exist
    fn pending(&self, key: QueueKey) -> Result<usize>;

    /// Whether a queue currently exists under `key`
    fn exists(&self, key: QueueKey) -> Result<bool>;

    /// Destroy the queue and its backlog; no-op when absent
    fn remove(&self, key: QueueKey) -> Result<()>;
}

/// Discard every message on `key`; with `destroy` the queue is removed too
///
/// Returns the number of messages discarded. An absent queue is left absent.
pub fn drain_queue(transport: &dyn Transport, key: QueueKey, destroy: bool) -> Result<usize> {
    if !transport.exists(key)? {
        return Ok(0);
    }

    let mut discarded = 0;
    while transport.receive(key, TagFilter::Any, Wait::NoWait)?.is_some() {
        discarded += 1;
    }

    if destroy {
        transport.remove(key)?;
    }

    if discarded > 0 {
        tracing::debug!("Drained {} messages from queue 0x{:08x}", discarded, key);
    }
    Ok(discarded)
}
