//! Command definitions
//!
//! A command is a function name plus a mapping of named parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GpioError, Result};
use crate::pin::{PinId, PinValue};

use super::{schema, REPLY_TAG_ARRAY, REPLY_TAG_PIN};

/// Every function the server understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    SetPin,
    SetPinHigh,
    SetPinLow,
    GetPin,
    GetPinArray,
    SetArrayLow,
    SetArrayHigh,
    SetPinsBinary,
    FlashBinary,
    StrobeBinary,
    FlashPinHighLow,
    FlashPinLowHigh,
    ShiftDataBit,
    ShiftDataArray,
}

impl CommandName {
    pub const ALL: [CommandName; 14] = [
        CommandName::SetPin,
        CommandName::SetPinHigh,
        CommandName::SetPinLow,
        CommandName::GetPin,
        CommandName::GetPinArray,
        CommandName::SetArrayLow,
        CommandName::SetArrayHigh,
        CommandName::SetPinsBinary,
        CommandName::FlashBinary,
        CommandName::StrobeBinary,
        CommandName::FlashPinHighLow,
        CommandName::FlashPinLowHigh,
        CommandName::ShiftDataBit,
        CommandName::ShiftDataArray,
    ];

    /// Name carried in the `function` field of a request
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::SetPin => "setPin",
            CommandName::SetPinHigh => "setPinHigh",
            CommandName::SetPinLow => "setPinLow",
            CommandName::GetPin => "getPin",
            CommandName::GetPinArray => "getPinArray",
            CommandName::SetArrayLow => "setArrayLow",
            CommandName::SetArrayHigh => "setArrayHigh",
            CommandName::SetPinsBinary => "setPinsBinary",
            CommandName::FlashBinary => "flashBinary",
            CommandName::StrobeBinary => "strobeBinary",
            CommandName::FlashPinHighLow => "flashPinHighLow",
            CommandName::FlashPinLowHigh => "flashPinLowHigh",
            CommandName::ShiftDataBit => "shiftDataBit",
            CommandName::ShiftDataArray => "shiftDataArray",
        }
    }

    /// Queries expect a reply; everything else is fire-and-forget
    pub fn is_query(self) -> bool {
        matches!(self, CommandName::GetPin | CommandName::GetPinArray)
    }

    /// Reply tag used when per-call correlation is disabled
    pub fn fixed_reply_tag(self) -> Option<i64> {
        match self {
            CommandName::GetPin => Some(REPLY_TAG_PIN),
            CommandName::GetPinArray => Some(REPLY_TAG_ARRAY),
            _ => None,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = GpioError;

    fn from_str(s: &str) -> Result<Self> {
        CommandName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GpioError::Protocol(format!("unknown function '{}'", s)))
    }
}

/// Named parameters understood by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    PinId,
    PinValue,
    Value,
    PinArray,
    SelectPin,
    SelectDir,
    HighDelay,
    LowDelay,
    Count,
    OffCount,
    Period,
    ShiftOut,
    SrClk,
    RegClk,
    Bit,
    BitArray,
    Delay,
    MsgQueueId,
    MsgType,
}

impl Param {
    /// Key used in the `parms` mapping
    pub fn name(self) -> &'static str {
        match self {
            Param::PinId => "pin_id",
            Param::PinValue => "pin_value",
            Param::Value => "value",
            Param::PinArray => "pin_array",
            Param::SelectPin => "select_pin",
            Param::SelectDir => "select_dir",
            Param::HighDelay => "high_delay",
            Param::LowDelay => "low_delay",
            Param::Count => "count",
            Param::OffCount => "off_count",
            Param::Period => "period",
            Param::ShiftOut => "shift_out",
            Param::SrClk => "sr_clk",
            Param::RegClk => "reg_clk",
            Param::Bit => "bit",
            Param::BitArray => "bit_array",
            Param::Delay => "delay",
            Param::MsgQueueId => "msg_queue_id",
            Param::MsgType => "msg_type",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single parameter value: a scalar or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    List(Vec<i64>),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<PinId> for ParamValue {
    fn from(pin: PinId) -> Self {
        ParamValue::Int(i64::from(pin.get()))
    }
}

impl From<PinValue> for ParamValue {
    fn from(value: PinValue) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        ParamValue::List(v)
    }
}

impl From<&[PinId]> for ParamValue {
    fn from(pins: &[PinId]) -> Self {
        ParamValue::List(pins.iter().map(|p| i64::from(p.get())).collect())
    }
}

impl From<&[PinValue]> for ParamValue {
    fn from(bits: &[PinValue]) -> Self {
        ParamValue::List(bits.iter().map(|b| *b as i64).collect())
    }
}

/// Parameter mapping of a command, keyed by parameter name
///
/// Keys the schema does not know are carried along and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a known parameter
    pub fn set(&mut self, param: Param, value: impl Into<ParamValue>) {
        self.0.insert(param.name().to_string(), value.into());
    }

    /// Set a parameter by raw name
    pub fn insert_raw(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, param: Param) -> Option<&ParamValue> {
        self.0.get(param.name())
    }

    /// Scalar value of `param`, if present and scalar
    pub fn int(&self, param: Param) -> Option<i64> {
        match self.get(param) {
            Some(ParamValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// List value of `param`, if present and a list
    pub fn list(&self, param: Param) -> Option<&[i64]> {
        match self.get(param) {
            Some(ParamValue::List(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Where the server should send the answer to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTo {
    /// Queue key the reply goes to
    pub queue_key: i32,

    /// Message type the reply is tagged with
    pub tag: i64,
}

/// A request: function name plus parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub function: CommandName,
    pub parms: Params,
}

impl Command {
    /// Create a command with no parameters
    pub fn new(function: CommandName) -> Self {
        Self {
            function,
            parms: Params::new(),
        }
    }

    /// Add a parameter (builder style)
    pub fn with(mut self, param: Param, value: impl Into<ParamValue>) -> Self {
        self.parms.set(param, value);
        self
    }

    /// Reply address embedded in the parameters, if complete
    pub fn reply_to(&self) -> Option<ReplyTo> {
        let queue_key = self.parms.int(Param::MsgQueueId)?;
        let tag = self.parms.int(Param::MsgType)?;
        Some(ReplyTo {
            queue_key: i32::try_from(queue_key).ok()?,
            tag,
        })
    }

    /// Embed a reply address in the parameters
    pub fn set_reply_to(&mut self, reply: ReplyTo) {
        self.parms.set(Param::MsgQueueId, reply.queue_key);
        self.parms.set(Param::MsgType, reply.tag);
    }

    /// Check the parameters against the schema of `function`
    pub fn validate(&self) -> Result<()> {
        schema::validate(self.function, &self.parms)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
