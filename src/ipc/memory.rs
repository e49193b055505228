//! In-memory transport
//!
//! Process-local queues with System V semantics, for tests and dry runs.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{GpioError, Result};
use crate::protocol::MAX_MESSAGE_SIZE;

use super::{Message, MessageTag, QueueKey, TagFilter, Transport, Wait};

#[derive(Debug)]
struct Queue {
    /// Identity of this incarnation; changes when the key is re-created
    id: u64,
    messages: VecDeque<Message>,
}

#[derive(Debug, Default)]
struct Registry {
    queues: HashMap<QueueKey, Queue>,
    next_id: u64,
}

impl Registry {
    fn open(&mut self, key: QueueKey) -> &mut Queue {
        let next_id = &mut self.next_id;
        self.queues.entry(key).or_insert_with(|| {
            *next_id += 1;
            Queue {
                id: *next_id,
                messages: VecDeque::new(),
            }
        })
    }
}

/// Transport backed by process memory
///
/// ## Concurrency:
/// - One mutex guards every queue; a condvar wakes blocked receivers on
///   each send and each removal
/// - A receiver blocked on a queue that gets removed fails with `EIDRM`,
///   as `msgrcv` does
#[derive(Debug)]
pub struct MemoryTransport {
    registry: Mutex<Registry>,
    arrived: Condvar,
    max_payload: usize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_MESSAGE_SIZE)
    }

    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            arrived: Condvar::new(),
            max_payload,
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn send(&self, key: QueueKey, tag: MessageTag, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(GpioError::MessageTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }
        if tag < 1 {
            return Err(GpioError::Transport {
                op: "msgsnd",
                key,
                errno: libc::EINVAL,
            });
        }

        let mut registry = self.registry.lock();
        registry.open(key).messages.push_back(Message {
            tag,
            payload: payload.to_vec(),
        });
        self.arrived.notify_all();
        Ok(())
    }

    fn receive(&self, key: QueueKey, filter: TagFilter, wait: Wait) -> Result<Option<Message>> {
        let deadline = match wait {
            Wait::NoWait => None,
            Wait::Timeout(d) => Some(Instant::now() + d),
        };

        let mut registry = self.registry.lock();
        let id = registry.open(key).id;

        loop {
            let queue = match registry.queues.get_mut(&key) {
                Some(queue) if queue.id == id => queue,
                _ => {
                    return Err(GpioError::Transport {
                        op: "msgrcv",
                        key,
                        errno: libc::EIDRM,
                    })
                }
            };

            if let Some(pos) = queue.messages.iter().position(|m| filter.matches(m.tag)) {
                return Ok(queue.messages.remove(pos));
            }

            let Some(deadline) = deadline else {
                return Ok(None);
            };
            if Instant::now() >= deadline {
                return Ok(None);
            }
            self.arrived.wait_until(&mut registry, deadline);
        }
    }

    fn pending(&self, key: QueueKey) -> Result<usize> {
        Ok(self
            .registry
            .lock()
            .queues
            .get(&key)
            .map(|q| q.messages.len())
            .unwrap_or(0))
    }

    fn exists(&self, key: QueueKey) -> Result<bool> {
        Ok(self.registry.lock().queues.contains_key(&key))
    }

    fn remove(&self, key: QueueKey) -> Result<()> {
        let mut registry = self.registry.lock();
        if registry.queues.remove(&key).is_some() {
            self.arrived.notify_all();
        }
        Ok(())
    }
}
