//! Dispatch loop
//!
//! Receives requests, validates them, drives the pins and answers queries.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::driver::GpioDriver;
use crate::error::{GpioError, Result};
use crate::ipc::{Message, TagFilter, Transport, Wait};
use crate::pin::{PinId, PinValue};
use crate::protocol::{self, CommandName, Operation, ReplyTo, ResponseEnvelope};

use super::lifecycle::{drain_queues, Lifecycle, LifecycleEvent, LifecycleHandle};

/// Counters kept by the dispatch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Requests taken off the request queue
    pub received: u64,

    /// Operations executed against the driver
    pub executed: u64,

    /// Replies sent for queries
    pub replies: u64,

    /// Requests discarded without execution
    pub dropped: u64,

    /// Failed receives on the request queue
    pub receive_errors: u64,

    /// Messages discarded by queue drains
    pub drained: u64,
}

/// Why a request was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Message type other than the request tag
    WrongTag(i64),

    /// Frame or record could not be decoded, or names no known function
    Malformed(String),

    /// Parameters failed the schema
    Invalid(String),
}

/// Result of handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Mutation executed; `ok` is false when the driver failed part way
    Executed { function: CommandName, ok: bool },

    /// Query answered
    Replied { function: CommandName, reply: ReplyTo },

    /// Request discarded
    Dropped(DropReason),
}

/// The GPIO server
///
/// Owns the driver and is the only party that destroys the queues.
pub struct Server {
    config: Config,
    transport: Arc<dyn Transport>,
    driver: Arc<dyn GpioDriver>,
    lifecycle: Lifecycle,
    stats: ServerStats,
}

impl Server {
    pub fn new(config: Config, transport: Arc<dyn Transport>, driver: Arc<dyn GpioDriver>) -> Self {
        Self {
            config,
            transport,
            driver,
            lifecycle: Lifecycle::new(),
            stats: ServerStats::default(),
        }
    }

    /// Handle used to stop, drain or inspect the running server
    pub fn lifecycle(&self) -> LifecycleHandle {
        self.lifecycle.handle()
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serve until terminated, then drain and destroy both queues
    pub fn run(&mut self) -> Result<ServerStats> {
        self.config.validate()?;
        tracing::info!(
            "GPIO server listening on queue 0x{:08x} (transport={}, driver={})",
            self.config.request_queue_key,
            self.transport.name(),
            self.driver.name()
        );

        while self.lifecycle.is_running() {
            self.process_events();
            if !self.lifecycle.is_running() {
                break;
            }

            match self.poll(Wait::Timeout(self.config.poll_interval())) {
                Ok(Some(outcome)) => tracing::trace!("{:?}", outcome),
                Ok(None) => {}
                Err(e) => {
                    self.stats.receive_errors += 1;
                    tracing::error!("Receive failed: {}", e);
                    thread::sleep(self.config.poll_interval());
                }
            }
        }

        tracing::info!("Shutting down, draining queues");
        self.drain()?;
        tracing::info!(
            "Server stopped: {} received, {} executed, {} replies, {} dropped",
            self.stats.received,
            self.stats.executed,
            self.stats.replies,
            self.stats.dropped
        );
        Ok(self.stats)
    }

    /// Wait for one request and handle it
    ///
    /// `Ok(None)` when nothing arrived within `wait`.
    pub fn poll(&mut self, wait: Wait) -> Result<Option<Outcome>> {
        let message = self.transport.receive(
            self.config.request_queue_key,
            TagFilter::Exact(self.config.request_tag),
            wait,
        )?;
        Ok(message.map(|m| self.handle_message(m)))
    }

    /// Decode, validate and execute one request
    ///
    /// Never fails: bad requests are logged and dropped.
    pub fn handle_message(&mut self, message: Message) -> Outcome {
        self.stats.received += 1;

        let outcome = match self.decode(&message) {
            Ok(op) => self.execute(op),
            Err(reason) => Outcome::Dropped(reason),
        };

        match &outcome {
            Outcome::Executed { .. } => self.stats.executed += 1,
            Outcome::Replied { .. } => {
                self.stats.executed += 1;
                self.stats.replies += 1;
            }
            Outcome::Dropped(reason) => {
                self.stats.dropped += 1;
                tracing::warn!("Dropped request: {:?}", reason);
            }
        }
        outcome
    }

    fn decode(&self, message: &Message) -> std::result::Result<Operation, DropReason> {
        if message.tag != self.config.request_tag {
            return Err(DropReason::WrongTag(message.tag));
        }

        let command = protocol::decode_request(&message.payload)
            .map_err(|e| DropReason::Malformed(e.to_string()))?;
        tracing::debug!("Received {}", command.function);

        Operation::try_from(&command).map_err(|e| DropReason::Invalid(e.to_string()))
    }

    fn execute(&self, op: Operation) -> Outcome {
        let function = op.name();

        match &op {
            Operation::GetPin { pin, reply } => {
                let response = ResponseEnvelope::pin_status(self.read_pin(*pin));
                self.reply(function, *reply, &response)
            }
            Operation::GetPinArray { pins, reply } => {
                let levels = pins
                    .iter()
                    .map(|pin| self.read_pin(*pin).map(|level| (*pin, level)))
                    .collect::<Option<BTreeMap<PinId, PinValue>>>();
                let response = ResponseEnvelope::array_status(levels);
                self.reply(function, *reply, &response)
            }
            _ => {
                let ok = match op.pulse_sequence() {
                    Some(seq) => match seq.run(self.driver.as_ref()) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::error!("{} failed: {}", function, e);
                            false
                        }
                    },
                    None => true,
                };
                Outcome::Executed { function, ok }
            }
        }
    }

    fn read_pin(&self, pin: PinId) -> Option<PinValue> {
        match self.driver.get_input_pin(pin) {
            Ok(level) => Some(level),
            Err(e) => {
                tracing::error!("Reading pin {} failed: {}", pin, e);
                None
            }
        }
    }

    fn reply(&self, function: CommandName, reply: ReplyTo, response: &ResponseEnvelope) -> Outcome {
        let sent = protocol::encode_response(response, self.config.max_message_size)
            .and_then(|bytes| self.transport.send(reply.queue_key, reply.tag, &bytes));

        match sent {
            Ok(()) => {
                tracing::debug!(
                    "Replied to {} on queue 0x{:08x} tag {}",
                    function,
                    reply.queue_key,
                    reply.tag
                );
                Outcome::Replied { function, reply }
            }
            Err(e) => {
                tracing::error!("Reply to {} failed: {}", function, e);
                Outcome::Executed { function, ok: false }
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn process_events(&mut self) {
        while let Some(event) = self.lifecycle.next_event() {
            match event {
                LifecycleEvent::Terminate => {}
                LifecycleEvent::Hangup => {
                    if let Err(e) = self.drain() {
                        tracing::error!("Drain failed: {}", e);
                    }
                }
                LifecycleEvent::Diagnose => self.log_diagnostics(),
            }
        }
    }

    /// Drain and destroy the request and reply queues
    pub fn drain(&mut self) -> Result<usize> {
        let keys = [self.config.request_queue_key, self.config.reply_queue_key];
        let discarded = drain_queues(self.transport.as_ref(), &keys)?;
        self.stats.drained += discarded as u64;
        tracing::info!("Drained {} messages", discarded);
        Ok(discarded)
    }

    fn log_diagnostics(&self) {
        let pending = |key| {
            self.transport
                .pending(key)
                .map_err(|e: GpioError| tracing::warn!("{}", e))
                .unwrap_or(0)
        };
        tracing::info!(
            "Diagnostics: request queue {} pending, reply queue {} pending, stats {:?}",
            pending(self.config.request_queue_key),
            pending(self.config.reply_queue_key),
            self.stats
        );
    }
}
