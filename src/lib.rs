//! # GPIOSysV
//!
//! A privileged GPIO server driven by any number of unprivileged clients
//! over System V message queues:
//! - Declarative parameter schema enforced on both sides of the queue
//! - Pulse, strobe and shift-register patterns timed by the server
//! - Per-call reply tags so concurrent queries never cross
//! - Signal-driven lifecycle (SIGTERM stop, SIGHUP drain, SIGUSR1 diagnostics)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │   Client A   │  │   Client B   │  │   Client C   │
//! └──────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!        │ validate + encode                 │
//!        ▼                 ▼                 ▼
//! ┌─────────────────────────────────────────────────────┐
//! │         Request queue (key 0x26274746, tag 0x4746)  │
//! └─────────────────────────┬───────────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────┐
//! │   Server: decode → schema → Operation → pattern     │
//! └──────────┬───────────────────────────────┬──────────┘
//!            ▼                               ▼
//!     ┌─────────────┐            ┌──────────────────────┐
//!     │ GpioDriver  │            │ Reply queue          │
//!     │  (sysfs)    │            │ (key 0x47462627,     │
//!     └─────────────┘            │  tag per query)      │
//!                                └──────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod pin;

pub mod protocol;
pub mod pattern;
pub mod driver;
pub mod ipc;
pub mod client;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GpioError, Result, ERROR_SENTINEL};
pub use config::Config;
pub use pin::{PinId, PinValue, PulseOrder, ShiftPins};
pub use client::{Client, FlashTiming, StrobeTiming};
pub use server::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of GPIOSysV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
