//! Server Module
//!
//! The single process that owns the pins.
//!
//! ## Architecture
//! - One thread of control: receive → validate → execute → (reply)
//! - A bounded receive doubles as the liveness poll of the running flag
//! - A signal listener thread turns SIGTERM/SIGHUP/SIGUSR1 into lifecycle
//!   events the loop picks up between receives
//!
//! ## States
//! ```text
//!   Running ──SIGHUP──► drain both queues ──► Running
//!   Running ──SIGTERM─► drain + destroy both queues ──► Stopped
//! ```

mod dispatch;
mod lifecycle;

pub use dispatch::{DropReason, Outcome, Server, ServerStats};
pub use lifecycle::{
    drain_queues, Lifecycle, LifecycleEvent, LifecycleHandle, SignalListener, HANDLED_SIGNALS,
};
