//! Typed operations
//!
//! A validated [`Command`] converted into the shape the server dispatches on.
//! Client and server derive pulse timing from the same value.

use std::time::Duration;

use crate::error::{GpioError, Result};
use crate::pattern::{self, PulseSequence, Step};
use crate::pin::{PinId, PinValue, PulseOrder, ShiftPins};

use super::{Command, CommandName, Param, ReplyTo};

/// A validated, typed request
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    SetPin {
        pin: PinId,
        value: PinValue,
    },
    SetPinHigh {
        pin: PinId,
    },
    SetPinLow {
        pin: PinId,
    },
    GetPin {
        pin: PinId,
        reply: ReplyTo,
    },
    GetPinArray {
        pins: Vec<PinId>,
        reply: ReplyTo,
    },
    SetArrayLow {
        pins: Vec<PinId>,
    },
    SetArrayHigh {
        pins: Vec<PinId>,
    },
    SetPinsBinary {
        value: u64,
        pins: Vec<PinId>,
    },
    FlashBinary {
        value: u64,
        pins: Vec<PinId>,
        select: PinId,
        order: PulseOrder,
        high_delay: u64,
        low_delay: u64,
    },
    StrobeBinary {
        value: u64,
        pins: Vec<PinId>,
        select: PinId,
        order: PulseOrder,
        count: u64,
        off_count: u64,
        period: u64,
    },
    FlashPinHighLow {
        pin: PinId,
        count: u64,
        high_delay: u64,
        low_delay: u64,
    },
    FlashPinLowHigh {
        pin: PinId,
        count: u64,
        high_delay: u64,
        low_delay: u64,
    },
    ShiftDataBit {
        pins: ShiftPins,
        bit: PinValue,
        delay: u64,
    },
    ShiftDataArray {
        pins: ShiftPins,
        bits: Vec<PinValue>,
        delay: u64,
    },
}

impl Operation {
    /// Function name of the operation
    pub fn name(&self) -> CommandName {
        match self {
            Operation::SetPin { .. } => CommandName::SetPin,
            Operation::SetPinHigh { .. } => CommandName::SetPinHigh,
            Operation::SetPinLow { .. } => CommandName::SetPinLow,
            Operation::GetPin { .. } => CommandName::GetPin,
            Operation::GetPinArray { .. } => CommandName::GetPinArray,
            Operation::SetArrayLow { .. } => CommandName::SetArrayLow,
            Operation::SetArrayHigh { .. } => CommandName::SetArrayHigh,
            Operation::SetPinsBinary { .. } => CommandName::SetPinsBinary,
            Operation::FlashBinary { .. } => CommandName::FlashBinary,
            Operation::StrobeBinary { .. } => CommandName::StrobeBinary,
            Operation::FlashPinHighLow { .. } => CommandName::FlashPinHighLow,
            Operation::FlashPinLowHigh { .. } => CommandName::FlashPinLowHigh,
            Operation::ShiftDataBit { .. } => CommandName::ShiftDataBit,
            Operation::ShiftDataArray { .. } => CommandName::ShiftDataArray,
        }
    }

    /// Reply address of a query
    pub fn reply_to(&self) -> Option<ReplyTo> {
        match self {
            Operation::GetPin { reply, .. } | Operation::GetPinArray { reply, .. } => Some(*reply),
            _ => None,
        }
    }

    /// Pin writes and waits a mutating operation performs; `None` for queries
    pub fn pulse_sequence(&self) -> Option<PulseSequence> {
        let seq = match self {
            Operation::GetPin { .. } | Operation::GetPinArray { .. } => return None,
            Operation::SetPin { pin, value } => {
                let mut seq = PulseSequence::new();
                seq.set(*pin, *value);
                seq
            }
            Operation::SetPinHigh { pin } => {
                let mut seq = PulseSequence::new();
                seq.set(*pin, PinValue::High);
                seq
            }
            Operation::SetPinLow { pin } => {
                let mut seq = PulseSequence::new();
                seq.set(*pin, PinValue::Low);
                seq
            }
            Operation::SetArrayLow { pins } => set_all(pins, PinValue::Low),
            Operation::SetArrayHigh { pins } => set_all(pins, PinValue::High),
            Operation::SetPinsBinary { value, pins } => pattern::bits_to_pins(*value, pins),
            Operation::FlashBinary {
                value,
                pins,
                select,
                order,
                high_delay,
                low_delay,
            } => pattern::flash_binary(*value, pins, *select, *order, *high_delay, *low_delay),
            Operation::StrobeBinary {
                value,
                pins,
                select,
                order,
                count,
                off_count,
                period,
            } => pattern::strobe_binary(*value, pins, *select, *order, *count, *off_count, *period),
            Operation::FlashPinHighLow {
                pin,
                count,
                high_delay,
                low_delay,
            } => pattern::flash_pin_high_low(*pin, *count, *high_delay, *low_delay),
            Operation::FlashPinLowHigh {
                pin,
                count,
                high_delay,
                low_delay,
            } => pattern::flash_pin_low_high(*pin, *count, *low_delay, *high_delay),
            Operation::ShiftDataBit { pins, bit, delay } => {
                pattern::shift_data_bit(*pins, *bit, *delay)
            }
            Operation::ShiftDataArray { pins, bits, delay } => {
                pattern::shift_data_array(*pins, bits, *delay)
            }
        };
        Some(seq)
    }

    /// How long a blocking client sleeps after sending this operation
    ///
    /// Only the timing commands block; everything else returns `None`.
    /// Repeated pulses are summed arithmetically, never expanded.
    pub fn blocking_duration(&self) -> Option<Duration> {
        match self {
            Operation::FlashBinary { .. }
            | Operation::StrobeBinary { .. }
            | Operation::FlashPinHighLow { .. }
            | Operation::FlashPinLowHigh { .. } => {
                self.pulse_sequence().map(|seq| seq.total_duration())
            }
            _ => None,
        }
    }
}

fn set_all(pins: &[PinId], value: PinValue) -> PulseSequence {
    pins.iter().map(|pin| Step::Set(*pin, value)).collect()
}

// =============================================================================
// Extraction
// =============================================================================

/// Reads typed fields out of a command that already passed the schema
struct Fields<'a> {
    cmd: &'a Command,
}

impl Fields<'_> {
    fn missing(&self, param: Param) -> GpioError {
        GpioError::validation(self.cmd.function.as_str(), format!("missing {}", param))
    }

    fn int(&self, param: Param) -> Result<i64> {
        self.cmd.parms.int(param).ok_or_else(|| self.missing(param))
    }

    fn uint(&self, param: Param) -> Result<u64> {
        let v = self.int(param)?;
        u64::try_from(v).map_err(|_| {
            GpioError::validation(self.cmd.function.as_str(), format!("{}: {} is negative", param, v))
        })
    }

    fn pin(&self, param: Param) -> Result<PinId> {
        PinId::try_from(self.int(param)?)
    }

    fn level(&self, param: Param) -> Result<PinValue> {
        PinValue::try_from(self.int(param)?)
    }

    fn pins(&self, param: Param) -> Result<Vec<PinId>> {
        let raw = self.cmd.parms.list(param).ok_or_else(|| self.missing(param))?;
        raw.iter().map(|&v| PinId::try_from(v)).collect()
    }

    fn levels(&self, param: Param) -> Result<Vec<PinValue>> {
        let raw = self.cmd.parms.list(param).ok_or_else(|| self.missing(param))?;
        raw.iter().map(|&v| PinValue::try_from(v)).collect()
    }

    fn shift_pins(&self) -> Result<ShiftPins> {
        Ok(ShiftPins {
            shift_out: self.pin(Param::ShiftOut)?,
            sr_clk: self.pin(Param::SrClk)?,
            reg_clk: self.pin(Param::RegClk)?,
        })
    }

    fn reply(&self) -> Result<ReplyTo> {
        self.cmd.reply_to().ok_or_else(|| self.missing(Param::MsgQueueId))
    }
}

impl TryFrom<&Command> for Operation {
    type Error = GpioError;

    /// Validate `cmd` against its schema and extract the typed operation
    fn try_from(cmd: &Command) -> Result<Self> {
        cmd.validate()?;
        let f = Fields { cmd };

        let op = match cmd.function {
            CommandName::SetPin => Operation::SetPin {
                pin: f.pin(Param::PinId)?,
                value: f.level(Param::PinValue)?,
            },
            CommandName::SetPinHigh => Operation::SetPinHigh {
                pin: f.pin(Param::PinId)?,
            },
            CommandName::SetPinLow => Operation::SetPinLow {
                pin: f.pin(Param::PinId)?,
            },
            CommandName::GetPin => Operation::GetPin {
                pin: f.pin(Param::PinId)?,
                reply: f.reply()?,
            },
            CommandName::GetPinArray => Operation::GetPinArray {
                pins: f.pins(Param::PinArray)?,
                reply: f.reply()?,
            },
            CommandName::SetArrayLow => Operation::SetArrayLow {
                pins: f.pins(Param::PinArray)?,
            },
            CommandName::SetArrayHigh => Operation::SetArrayHigh {
                pins: f.pins(Param::PinArray)?,
            },
            CommandName::SetPinsBinary => Operation::SetPinsBinary {
                value: f.uint(Param::Value)?,
                pins: f.pins(Param::PinArray)?,
            },
            CommandName::FlashBinary => Operation::FlashBinary {
                value: f.uint(Param::Value)?,
                pins: f.pins(Param::PinArray)?,
                select: f.pin(Param::SelectPin)?,
                order: PulseOrder::from_select_dir(f.int(Param::SelectDir)?),
                high_delay: f.uint(Param::HighDelay)?,
                low_delay: f.uint(Param::LowDelay)?,
            },
            CommandName::StrobeBinary => Operation::StrobeBinary {
                value: f.uint(Param::Value)?,
                pins: f.pins(Param::PinArray)?,
                select: f.pin(Param::SelectPin)?,
                order: PulseOrder::from_select_dir(f.int(Param::SelectDir)?),
                count: f.uint(Param::Count)?,
                off_count: f.uint(Param::OffCount)?,
                period: f.uint(Param::Period)?,
            },
            CommandName::FlashPinHighLow => Operation::FlashPinHighLow {
                pin: f.pin(Param::PinId)?,
                count: f.uint(Param::Count)?,
                high_delay: f.uint(Param::HighDelay)?,
                low_delay: f.uint(Param::LowDelay)?,
            },
            CommandName::FlashPinLowHigh => Operation::FlashPinLowHigh {
                pin: f.pin(Param::PinId)?,
                count: f.uint(Param::Count)?,
                high_delay: f.uint(Param::HighDelay)?,
                low_delay: f.uint(Param::LowDelay)?,
            },
            CommandName::ShiftDataBit => Operation::ShiftDataBit {
                pins: f.shift_pins()?,
                bit: f.level(Param::Bit)?,
                delay: f.uint(Param::Delay)?,
            },
            CommandName::ShiftDataArray => Operation::ShiftDataArray {
                pins: f.shift_pins()?,
                bits: f.levels(Param::BitArray)?,
                delay: f.uint(Param::Delay)?,
            },
        };
        Ok(op)
    }
}

impl TryFrom<Command> for Operation {
    type Error = GpioError;

    fn try_from(cmd: Command) -> Result<Self> {
        Operation::try_from(&cmd)
    }
}
