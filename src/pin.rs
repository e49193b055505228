//! Pin vocabulary
//!
//! Types shared by the protocol, the pattern codec and the drivers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GpioError, Result};

/// A GPIO pin number in the header range [1, 40]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PinId(u8);

impl PinId {
    /// Lowest valid pin number
    pub const MIN: u8 = 1;

    /// Highest valid pin number
    pub const MAX: u8 = 40;

    /// Create a pin id, rejecting anything outside [1, 40]
    pub fn new(id: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(GpioError::Protocol(format!(
                "pin id {} outside [{}, {}]",
                id,
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Raw pin number
    pub fn get(self) -> u8 {
        self.0
    }

    /// Check a raw integer against the valid range
    pub fn is_valid(raw: i64) -> bool {
        (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&raw)
    }
}

impl TryFrom<u8> for PinId {
    type Error = GpioError;

    fn try_from(id: u8) -> Result<Self> {
        PinId::new(id)
    }
}

impl TryFrom<i64> for PinId {
    type Error = GpioError;

    fn try_from(raw: i64) -> Result<Self> {
        let id = u8::try_from(raw)
            .map_err(|_| GpioError::Protocol(format!("pin id {} outside [1, 40]", raw)))?;
        PinId::new(id)
    }
}

impl From<PinId> for u8 {
    fn from(pin: PinId) -> u8 {
        pin.0
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum PinValue {
    #[default]
    Low = 0,
    High = 1,
}

impl PinValue {
    /// Level for a single bit
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            PinValue::High
        } else {
            PinValue::Low
        }
    }

    /// The opposite level
    pub fn invert(self) -> Self {
        match self {
            PinValue::Low => PinValue::High,
            PinValue::High => PinValue::Low,
        }
    }

    pub fn is_high(self) -> bool {
        self == PinValue::High
    }
}

impl TryFrom<u8> for PinValue {
    type Error = GpioError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(PinValue::Low),
            1 => Ok(PinValue::High),
            other => Err(GpioError::Protocol(format!(
                "pin value {} is neither 0 nor 1",
                other
            ))),
        }
    }
}

impl TryFrom<i64> for PinValue {
    type Error = GpioError;

    fn try_from(raw: i64) -> Result<Self> {
        match raw {
            0 => Ok(PinValue::Low),
            1 => Ok(PinValue::High),
            other => Err(GpioError::Protocol(format!(
                "pin value {} is neither 0 nor 1",
                other
            ))),
        }
    }
}

impl From<PinValue> for u8 {
    fn from(value: PinValue) -> u8 {
        value as u8
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Order of the two edges of a select-pin pulse
///
/// Encoded on the wire as `select_dir`: 0 pulses HIGH then LOW, anything
/// else LOW then HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulseOrder {
    #[default]
    HighLow,
    LowHigh,
}

impl PulseOrder {
    pub fn from_select_dir(dir: i64) -> Self {
        if dir == 0 {
            PulseOrder::HighLow
        } else {
            PulseOrder::LowHigh
        }
    }

    pub fn select_dir(self) -> i64 {
        match self {
            PulseOrder::HighLow => 0,
            PulseOrder::LowHigh => 1,
        }
    }
}

/// The three control lines of a serial-in/parallel-out shift register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPins {
    /// Serial data line
    pub shift_out: PinId,

    /// Shift clock: one pulse moves the data bit in
    pub sr_clk: PinId,

    /// Register (latch) clock: one pulse exposes the register on the outputs
    pub reg_clk: PinId,
}

/// Parse a list of raw pin numbers
pub fn pins(raw: &[u8]) -> Result<Vec<PinId>> {
    raw.iter().map(|&id| PinId::new(id)).collect()
}
