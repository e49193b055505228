//! Sysfs driver
//!
//! Legacy Linux GPIO interface under `/sys/class/gpio`.
//!
//! ## Layout
//! ```text
//!   {base}/export           write "N" to create gpioN/
//!   {base}/gpioN/direction  "in" | "out"
//!   {base}/gpioN/value      "0" | "1"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{GpioError, Result};
use crate::pin::{PinId, PinValue};

use super::GpioDriver;

/// Default sysfs GPIO root
pub const DEFAULT_SYSFS_BASE: &str = "/sys/class/gpio";

/// Direction a pin was last configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Driver writing to the sysfs GPIO tree
pub struct SysfsDriver {
    base: PathBuf,

    /// Direction cache so repeated writes skip the direction file
    directions: Mutex<[Option<Direction>; PinId::MAX as usize + 1]>,
}

impl SysfsDriver {
    /// Use the default `/sys/class/gpio` root
    pub fn new() -> Self {
        Self::with_base(DEFAULT_SYSFS_BASE)
    }

    /// Use a custom root (chroots, test fixtures)
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            directions: Mutex::new([None; PinId::MAX as usize + 1]),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn pin_dir(&self, pin: PinId) -> PathBuf {
        self.base.join(format!("gpio{}", pin))
    }

    fn driver_error(pin: PinId, what: &str, e: std::io::Error) -> GpioError {
        GpioError::Driver {
            pin: pin.get(),
            reason: format!("{}: {}", what, e),
        }
    }

    /// Export the pin if needed and set its direction once
    fn prepare(&self, pin: PinId, direction: Direction) -> Result<()> {
        let mut directions = self.directions.lock();
        let slot = &mut directions[pin.get() as usize];
        if *slot == Some(direction) {
            return Ok(());
        }

        let dir = self.pin_dir(pin);
        if !dir.exists() {
            tracing::debug!("Exporting GPIO {}", pin);
            fs::write(self.base.join("export"), pin.to_string())
                .map_err(|e| Self::driver_error(pin, "export", e))?;
        }

        fs::write(dir.join("direction"), direction.as_str())
            .map_err(|e| Self::driver_error(pin, "direction", e))?;
        *slot = Some(direction);
        Ok(())
    }
}

impl Default for SysfsDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioDriver for SysfsDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn set_output_pin(&self, pin: PinId, value: PinValue) -> Result<()> {
        self.prepare(pin, Direction::Out)?;
        fs::write(self.pin_dir(pin).join("value"), value.to_string())
            .map_err(|e| Self::driver_error(pin, "write value", e))
    }

    /// Reads the live level without touching the direction
    ///
    /// Output pins report what they are driving, which is how queries on
    /// pins the server itself drives are answered.
    fn get_input_pin(&self, pin: PinId) -> Result<PinValue> {
        if !self.pin_dir(pin).exists() {
            self.prepare(pin, Direction::In)?;
        }
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))
            .map_err(|e| Self::driver_error(pin, "read value", e))?;
        match raw.trim() {
            "0" => Ok(PinValue::Low),
            "1" => Ok(PinValue::High),
            other => Err(GpioError::Driver {
                pin: pin.get(),
                reason: format!("unexpected value '{}'", other),
            }),
        }
    }
}
