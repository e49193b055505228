//! Client Module
//!
//! Validates commands locally, posts them on the request queue and, for
//! queries, waits for the server's reply.
//!
//! ## Flow
//! ```text
//!   set_pin(..) ─► Command ─► schema ─► encode ─► request queue
//!                               │
//!                               └─ invalid: Validation error (code 9999), nothing sent
//!
//!   get_pin(..) ─► mint reply tag ─► send ─► receive(reply queue, tag, timeout)
//!                                              │
//!                                              └─ timeout: drain reply queue, Timeout (9999)
//! ```
//!
//! Every call takes raw integers so out-of-range values are caught by the
//! same schema the server applies.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::error::{GpioError, Result};
use crate::ipc::{drain_queue, SysVTransport, TagFilter, Transport, Wait};
use crate::pin::{PinId, PinValue};
use crate::protocol::{
    self, Command, CommandName, Operation, Param, ParamValue, ReplyTo, ResponseEnvelope,
};

/// Default on/off time of flash commands (µs)
pub const DEFAULT_DELAY_US: u64 = 50_000;

/// Default strobe period (µs)
pub const DEFAULT_STROBE_PERIOD_US: u64 = 1_000_000;

/// High/low hold times of a flash, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashTiming {
    pub high_delay: u64,
    pub low_delay: u64,
}

impl Default for FlashTiming {
    fn default() -> Self {
        Self {
            high_delay: DEFAULT_DELAY_US,
            low_delay: DEFAULT_DELAY_US,
        }
    }
}

/// Pulse count, idle count and overall period of a strobe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrobeTiming {
    pub count: u64,
    pub off_count: u64,
    pub period: u64,
}

impl Default for StrobeTiming {
    fn default() -> Self {
        Self {
            count: 1,
            off_count: 0,
            period: DEFAULT_STROBE_PERIOD_US,
        }
    }
}

/// Sequence part of per-call reply tags, shared by every client in the process
static REPLY_SEQUENCE: AtomicU32 = AtomicU32::new(1);

fn raw_list<T: Copy + Into<i64>>(items: &[T]) -> ParamValue {
    ParamValue::List(items.iter().map(|&v| v.into()).collect())
}

/// Scalar parameter from an unsigned value; above `i64::MAX` is a validation error
fn uint_param(function: CommandName, param: Param, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        GpioError::validation(function.as_str(), format!("{}: {} is too large", param, value))
    })
}

/// `value` cut down to the `width` least-significant bits a pin list can show
fn binary_value(function: CommandName, value: u64, width: usize) -> Result<i64> {
    let value = match u32::try_from(width) {
        Ok(w) if w < u64::BITS => value & ((1u64 << w) - 1),
        _ => value,
    };
    uint_param(function, Param::Value, value)
}

/// Client of the GPIO server
pub struct Client {
    config: Config,
    transport: Arc<dyn Transport>,
    pid: u32,
}

impl Client {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            pid: std::process::id(),
        }
    }

    /// Client over the kernel message queues
    pub fn sysv(config: Config) -> Self {
        let transport = Arc::new(SysVTransport::with_max_payload(config.max_message_size));
        Self::new(config, transport)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Validate and post a command without waiting for anything
    pub fn send_command(&self, command: &Command) -> Result<()> {
        command.validate()?;
        self.post(command)
    }

    /// Post a mutating command
    ///
    /// With `blocking`, the timing commands return only after the time the
    /// server needs to play them out.
    pub fn submit(&self, command: Command, blocking: bool) -> Result<()> {
        let op = Operation::try_from(&command)?;
        if op.reply_to().is_some() {
            return Err(GpioError::validation(
                command.function.as_str(),
                "queries must go through query()",
            ));
        }
        self.post(&command)?;

        if blocking {
            if let Some(duration) = op.blocking_duration() {
                tracing::debug!("Waiting {:?} for {} to play out", duration, command.function);
                thread::sleep(duration);
            }
        }
        Ok(())
    }

    fn post(&self, command: &Command) -> Result<()> {
        let bytes = protocol::encode_request(command, self.config.max_message_size)?;
        self.transport
            .send(self.config.request_queue_key, self.config.request_tag, &bytes)?;
        tracing::debug!("Sent {}", command.function);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Reply tag for the next query of kind `function`
    ///
    /// Per-call tags combine the process id with a sequence number so
    /// concurrent callers never take each other's replies.
    pub fn next_reply_tag(&self, function: CommandName) -> i64 {
        if !self.config.unique_reply_tags {
            if let Some(tag) = function.fixed_reply_tag() {
                return tag;
            }
        }
        let seq = REPLY_SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;
        (i64::from(self.pid & 0x007F_FFFF) << 24) | i64::from(seq)
    }

    /// Send a query and wait for its reply
    ///
    /// The reply address is filled in here. `Ok(None)` means a reply
    /// arrived but could not be decoded. On timeout the reply queue is
    /// drained so a late answer cannot be taken by the next caller.
    pub fn query(&self, mut command: Command) -> Result<Option<ResponseEnvelope>> {
        let function = command.function;
        if !function.is_query() {
            return Err(GpioError::validation(function.as_str(), "not a query"));
        }

        let reply = ReplyTo {
            queue_key: self.config.reply_queue_key,
            tag: self.next_reply_tag(function),
        };
        command.set_reply_to(reply);
        self.send_command(&command)?;

        let received = self.transport.receive(
            reply.queue_key,
            TagFilter::Exact(reply.tag),
            Wait::Timeout(self.config.reply_timeout()),
        )?;

        let Some(message) = received else {
            tracing::warn!(
                "No reply to {} within {} ms, draining reply queue",
                function,
                self.config.reply_timeout_ms
            );
            drain_queue(self.transport.as_ref(), reply.queue_key, false)?;
            return Err(GpioError::Timeout {
                key: reply.queue_key,
                tag: reply.tag,
                waited_ms: self.config.reply_timeout_ms,
            });
        };

        if message.tag != reply.tag {
            tracing::warn!("Reply tag mismatch: expected {}, got {}", reply.tag, message.tag);
        }

        match protocol::decode_response(&message.payload) {
            Ok(response) => {
                if response.is_empty() {
                    tracing::warn!("{} reply carries no status", function);
                }
                Ok(Some(response))
            }
            Err(e) => {
                tracing::warn!("Undecodable reply to {}: {}", function, e);
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Single Pins
    // =========================================================================

    pub fn set_pin(&self, pin: u8, value: u8) -> Result<()> {
        let command = Command::new(CommandName::SetPin)
            .with(Param::PinId, i64::from(pin))
            .with(Param::PinValue, i64::from(value));
        self.submit(command, false)
    }

    pub fn set_pin_high(&self, pin: u8) -> Result<()> {
        let command = Command::new(CommandName::SetPinHigh).with(Param::PinId, i64::from(pin));
        self.submit(command, false)
    }

    pub fn set_pin_low(&self, pin: u8) -> Result<()> {
        let command = Command::new(CommandName::SetPinLow).with(Param::PinId, i64::from(pin));
        self.submit(command, false)
    }

    /// Level of one pin; `None` when the server could not read it
    pub fn get_pin(&self, pin: u8) -> Result<Option<PinValue>> {
        let command = Command::new(CommandName::GetPin).with(Param::PinId, i64::from(pin));
        Ok(self.query(command)?.and_then(|r| r.pin_status))
    }

    // =========================================================================
    // Pin Arrays
    // =========================================================================

    /// Levels of several pins; `None` when any of them could not be read
    pub fn get_pin_array(&self, pins: &[u8]) -> Result<Option<BTreeMap<PinId, PinValue>>> {
        let command = Command::new(CommandName::GetPinArray).with(Param::PinArray, raw_list(pins));
        Ok(self.query(command)?.and_then(|r| r.array_status))
    }

    /// Levels of several pins as a number, `pins[0]` being the least-significant bit
    pub fn get_pin_array_dec(&self, pins: &[u8]) -> Result<Option<u64>> {
        let Some(levels) = self.get_pin_array(pins)? else {
            return Ok(None);
        };

        let mut value = 0u64;
        for (bit, &raw) in pins.iter().enumerate().take(64) {
            let pin = PinId::try_from(raw)?;
            match levels.get(&pin) {
                Some(level) if level.is_high() => value |= 1 << bit,
                Some(_) => {}
                None => return Ok(None),
            }
        }
        Ok(Some(value))
    }

    pub fn set_array_low(&self, pins: &[u8]) -> Result<()> {
        let command = Command::new(CommandName::SetArrayLow).with(Param::PinArray, raw_list(pins));
        self.submit(command, false)
    }

    pub fn set_array_high(&self, pins: &[u8]) -> Result<()> {
        let command = Command::new(CommandName::SetArrayHigh).with(Param::PinArray, raw_list(pins));
        self.submit(command, false)
    }

    /// Show the binary form of `value` on `pins`
    ///
    /// Bits above `pins.len()` are dropped before sending.
    pub fn set_pins_binary(&self, value: u64, pins: &[u8]) -> Result<()> {
        let function = CommandName::SetPinsBinary;
        let command = Command::new(function)
            .with(Param::Value, binary_value(function, value, pins.len())?)
            .with(Param::PinArray, raw_list(pins));
        self.submit(command, false)
    }

    // =========================================================================
    // Timed Patterns
    // =========================================================================

    /// Present `value` on `pins` and latch it with one pulse of `select_pin`
    ///
    /// `select_dir` 0 pulses HIGH then LOW, 1 pulses LOW then HIGH.
    pub fn flash_binary(
        &self,
        value: u64,
        pins: &[u8],
        select_pin: u8,
        select_dir: u8,
        timing: FlashTiming,
        blocking: bool,
    ) -> Result<()> {
        let function = CommandName::FlashBinary;
        let command = Command::new(function)
            .with(Param::Value, binary_value(function, value, pins.len())?)
            .with(Param::PinArray, raw_list(pins))
            .with(Param::SelectPin, i64::from(select_pin))
            .with(Param::SelectDir, i64::from(select_dir))
            .with(Param::HighDelay, uint_param(function, Param::HighDelay, timing.high_delay)?)
            .with(Param::LowDelay, uint_param(function, Param::LowDelay, timing.low_delay)?);
        self.submit(command, blocking)
    }

    /// Present `value` on `pins` and pulse `select_pin` `count` times
    pub fn strobe_binary(
        &self,
        value: u64,
        pins: &[u8],
        select_pin: u8,
        select_dir: u8,
        timing: StrobeTiming,
        blocking: bool,
    ) -> Result<()> {
        let function = CommandName::StrobeBinary;
        let command = Command::new(function)
            .with(Param::Value, binary_value(function, value, pins.len())?)
            .with(Param::PinArray, raw_list(pins))
            .with(Param::SelectPin, i64::from(select_pin))
            .with(Param::SelectDir, i64::from(select_dir))
            .with(Param::Count, uint_param(function, Param::Count, timing.count)?)
            .with(Param::OffCount, uint_param(function, Param::OffCount, timing.off_count)?)
            .with(Param::Period, uint_param(function, Param::Period, timing.period)?);
        self.submit(command, blocking)
    }

    /// Pulse `pin` HIGH then LOW, `count` times
    pub fn flash_pin_high_low(
        &self,
        pin: u8,
        count: u64,
        timing: FlashTiming,
        blocking: bool,
    ) -> Result<()> {
        self.submit(flash_pin(CommandName::FlashPinHighLow, pin, count, timing)?, blocking)
    }

    /// Pulse `pin` LOW then HIGH, `count` times
    pub fn flash_pin_low_high(
        &self,
        pin: u8,
        count: u64,
        timing: FlashTiming,
        blocking: bool,
    ) -> Result<()> {
        self.submit(flash_pin(CommandName::FlashPinLowHigh, pin, count, timing)?, blocking)
    }

    // =========================================================================
    // Shift Register
    // =========================================================================

    /// Clock one bit into a shift register and latch it
    pub fn shift_data_bit(&self, shift_out: u8, sr_clk: u8, reg_clk: u8, bit: u8, delay: u64) -> Result<()> {
        let function = CommandName::ShiftDataBit;
        let command = shift_command(function, shift_out, sr_clk, reg_clk)
            .with(Param::Bit, i64::from(bit))
            .with(Param::Delay, uint_param(function, Param::Delay, delay)?);
        self.submit(command, false)
    }

    /// Clock `bits` into a shift register, last element first, then latch once
    pub fn shift_data_array(
        &self,
        shift_out: u8,
        sr_clk: u8,
        reg_clk: u8,
        bits: &[u8],
        delay: u64,
    ) -> Result<()> {
        let function = CommandName::ShiftDataArray;
        let command = shift_command(function, shift_out, sr_clk, reg_clk)
            .with(Param::BitArray, raw_list(bits))
            .with(Param::Delay, uint_param(function, Param::Delay, delay)?);
        self.submit(command, false)
    }
}

fn flash_pin(function: CommandName, pin: u8, count: u64, timing: FlashTiming) -> Result<Command> {
    Ok(Command::new(function)
        .with(Param::PinId, i64::from(pin))
        .with(Param::Count, uint_param(function, Param::Count, count)?)
        .with(Param::HighDelay, uint_param(function, Param::HighDelay, timing.high_delay)?)
        .with(Param::LowDelay, uint_param(function, Param::LowDelay, timing.low_delay)?))
}

fn shift_command(function: CommandName, shift_out: u8, sr_clk: u8, reg_clk: u8) -> Command {
    Command::new(function)
        .with(Param::ShiftOut, i64::from(shift_out))
        .with(Param::SrClk, i64::from(sr_clk))
        .with(Param::RegClk, i64::from(reg_clk))
}
