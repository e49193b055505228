//! GPIO Driver Module
//!
//! The hardware seam. The server owns exactly one driver and is the only
//! process that touches the pins.
//!
//! ```text
//!              ┌─────────────────────────┐
//!              │    GpioDriver trait     │
//!              └───────────┬─────────────┘
//!                  ┌───────┴───────┐
//!                  ▼               ▼
//!             SysfsDriver     MemoryDriver
//!          (/sys/class/gpio)  (dry-run, tests)
//! ```

mod memory;
mod sysfs;

pub use memory::MemoryDriver;
pub use sysfs::{SysfsDriver, DEFAULT_SYSFS_BASE};

use crate::error::Result;
use crate::pin::{PinId, PinValue};

/// Pin access used by the server
///
/// Methods take `&self`; implementations handle their own interior state.
pub trait GpioDriver: Send + Sync {
    /// Driver name for diagnostics
    fn name(&self) -> &'static str;

    /// Configure `pin` as an output and drive it to `value`
    fn set_output_pin(&self, pin: PinId, value: PinValue) -> Result<()>;

    /// Read the current level of `pin`
    fn get_input_pin(&self, pin: PinId) -> Result<PinValue>;
}
