//! Lifecycle Controller
//!
//! Running flag, signal handling and queue draining.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use nix::sys::signal::{SigSet, Signal};

use crate::error::{GpioError, Result};
use crate::ipc::{drain_queue, QueueKey, Transport};

/// Signals routed to the server
pub const HANDLED_SIGNALS: [Signal; 4] = [
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGHUP,
    Signal::SIGUSR1,
];

/// Requests delivered to the dispatch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Stop serving, drain and destroy both queues
    Terminate,

    /// Drain both queues and keep serving
    Hangup,

    /// Log a diagnostic snapshot
    Diagnose,
}

/// Owned by the server: the running flag and the receiving end of events
pub struct Lifecycle {
    running: Arc<AtomicBool>,
    events_tx: Sender<LifecycleEvent>,
    events_rx: Receiver<LifecycleEvent>,
}

impl Lifecycle {
    /// New controller in the running state
    pub fn new() -> Self {
        let (events_tx, events_rx) = channel::unbounded();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            events_tx,
            events_rx,
        }
    }

    /// Cloneable handle for signal listeners and other threads
    pub fn handle(&self) -> LifecycleHandle {
        LifecycleHandle {
            running: Arc::clone(&self.running),
            events: self.events_tx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Next pending event, without blocking
    pub fn next_event(&self) -> Option<LifecycleEvent> {
        self.events_rx.try_recv().ok()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle used to steer a running server
#[derive(Clone)]
pub struct LifecycleHandle {
    running: Arc<AtomicBool>,
    events: Sender<LifecycleEvent>,
}

impl LifecycleHandle {
    /// Clear the running flag; the loop exits within one poll window
    pub fn terminate(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.events.send(LifecycleEvent::Terminate);
    }

    /// Ask the loop to drain both queues and continue
    pub fn hangup(&self) {
        let _ = self.events.send(LifecycleEvent::Hangup);
    }

    /// Ask the loop to log a diagnostic snapshot
    pub fn diagnose(&self) {
        let _ = self.events.send(LifecycleEvent::Diagnose);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Apply a delivered signal; returns the event it mapped to
    pub fn handle_signal(&self, signal: Signal) -> Option<LifecycleEvent> {
        match signal {
            Signal::SIGTERM | Signal::SIGINT => {
                tracing::info!("Received {}, shutting down", signal);
                self.terminate();
                Some(LifecycleEvent::Terminate)
            }
            Signal::SIGHUP => {
                tracing::info!("Received SIGHUP, draining queues");
                self.hangup();
                Some(LifecycleEvent::Hangup)
            }
            Signal::SIGUSR1 => {
                tracing::info!("Caught SIGUSR1");
                self.diagnose();
                Some(LifecycleEvent::Diagnose)
            }
            other => {
                tracing::debug!("Ignoring {}", other);
                None
            }
        }
    }
}

/// Synchronous signal listener
///
/// Blocks [`HANDLED_SIGNALS`] on the calling thread and waits for them on a
/// dedicated thread. Threads spawned afterwards inherit the mask, so the
/// listener is the only receiver. Install it before spawning anything else.
pub struct SignalListener {
    _thread: thread::JoinHandle<()>,
}

impl SignalListener {
    pub fn install(handle: LifecycleHandle) -> Result<Self> {
        let mut set = SigSet::empty();
        for signal in HANDLED_SIGNALS {
            set.add(signal);
        }
        set.thread_block()
            .map_err(|e| GpioError::Io(std::io::Error::from(e)))?;

        let thread = thread::Builder::new()
            .name("gpiosysv-signals".to_string())
            .spawn(move || loop {
                match set.wait() {
                    Ok(signal) => {
                        handle.handle_signal(signal);
                    }
                    Err(e) => {
                        tracing::warn!("sigwait failed: {}", e);
                    }
                }
            })?;

        Ok(Self { _thread: thread })
    }
}

// =============================================================================
// Queue Draining
// =============================================================================

/// Drain and destroy every queue in `keys`
pub fn drain_queues(transport: &dyn Transport, keys: &[QueueKey]) -> Result<usize> {
    let mut discarded = 0;
    for &key in keys {
        discarded += drain_queue(transport, key, true)?;
    }
    Ok(discarded)
}
