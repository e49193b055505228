//! Parameter schema
//!
//! Range rules are data: each parameter name maps to one [`Rule`], and each
//! command lists the parameters it requires. New commands reuse the rules
//! by naming parameters, never by repeating range checks.

use crate::error::{GpioError, Result};
use crate::pin::PinId;

use super::{CommandName, Param, ParamValue, Params};

/// Constraint applied to a single parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Scalar pin id in [1, 40]
    Pin,
    /// Scalar 0 or 1
    Level,
    /// Scalar >= 0
    NonNegative,
    /// Scalar >= 1
    Positive,
    /// Non-empty list of pin ids
    PinList,
    /// Non-empty list of 0/1
    BitList,
    /// Scalar queue key: non-zero and representable as a 32-bit key
    QueueKey,
    /// Scalar message type >= 1
    Tag,
}

/// Rule table keyed by parameter
const PARAM_RULES: &[(Param, Rule)] = &[
    (Param::PinId, Rule::Pin),
    (Param::SelectPin, Rule::Pin),
    (Param::ShiftOut, Rule::Pin),
    (Param::SrClk, Rule::Pin),
    (Param::RegClk, Rule::Pin),
    (Param::PinValue, Rule::Level),
    (Param::Bit, Rule::Level),
    (Param::SelectDir, Rule::Level),
    (Param::Value, Rule::NonNegative),
    (Param::HighDelay, Rule::NonNegative),
    (Param::LowDelay, Rule::NonNegative),
    (Param::OffCount, Rule::NonNegative),
    (Param::Period, Rule::NonNegative),
    (Param::Delay, Rule::NonNegative),
    (Param::Count, Rule::Positive),
    (Param::PinArray, Rule::PinList),
    (Param::BitArray, Rule::BitList),
    (Param::MsgQueueId, Rule::QueueKey),
    (Param::MsgType, Rule::Tag),
];

/// Rule that applies to `param`
pub fn rule_for(param: Param) -> Rule {
    PARAM_RULES
        .iter()
        .find(|(p, _)| *p == param)
        .map(|(_, rule)| *rule)
        .unwrap_or(Rule::NonNegative)
}

/// Parameters a command must carry
pub fn required_params(function: CommandName) -> &'static [Param] {
    const PIN: Param = Param::PinId;
    const ARRAY: Param = Param::PinArray;

    match function {
        CommandName::SetPin => &[PIN, Param::PinValue],
        CommandName::SetPinHigh | CommandName::SetPinLow => &[PIN],
        CommandName::GetPin => &[PIN, Param::MsgQueueId, Param::MsgType],
        CommandName::GetPinArray => &[ARRAY, Param::MsgQueueId, Param::MsgType],
        CommandName::SetArrayLow | CommandName::SetArrayHigh => &[ARRAY],
        CommandName::SetPinsBinary => &[Param::Value, ARRAY],
        CommandName::FlashBinary => &[
            Param::Value,
            ARRAY,
            Param::SelectPin,
            Param::SelectDir,
            Param::HighDelay,
            Param::LowDelay,
        ],
        CommandName::StrobeBinary => &[
            Param::Value,
            ARRAY,
            Param::SelectPin,
            Param::SelectDir,
            Param::Count,
            Param::OffCount,
            Param::Period,
        ],
        CommandName::FlashPinHighLow | CommandName::FlashPinLowHigh => {
            &[PIN, Param::Count, Param::HighDelay, Param::LowDelay]
        }
        CommandName::ShiftDataBit => &[
            Param::ShiftOut,
            Param::SrClk,
            Param::RegClk,
            Param::Bit,
            Param::Delay,
        ],
        CommandName::ShiftDataArray => &[
            Param::ShiftOut,
            Param::SrClk,
            Param::RegClk,
            Param::BitArray,
            Param::Delay,
        ],
    }
}

impl Rule {
    /// Check a value, returning a human-readable reason on failure
    pub fn check(self, value: &ParamValue) -> std::result::Result<(), String> {
        match (self, value) {
            (Rule::Pin, ParamValue::Int(v)) => check_pin(*v),
            (Rule::Level, ParamValue::Int(v)) => check_level(*v),
            (Rule::NonNegative, ParamValue::Int(v)) if *v >= 0 => Ok(()),
            (Rule::NonNegative, ParamValue::Int(v)) => Err(format!("{} is negative", v)),
            (Rule::Positive, ParamValue::Int(v)) if *v >= 1 => Ok(()),
            (Rule::Positive, ParamValue::Int(v)) => Err(format!("{} is not positive", v)),
            (Rule::QueueKey, ParamValue::Int(v)) => match i32::try_from(*v) {
                Ok(key) if key != 0 => Ok(()),
                _ => Err(format!("{} is not a usable queue key", v)),
            },
            (Rule::Tag, ParamValue::Int(v)) if *v >= 1 => Ok(()),
            (Rule::Tag, ParamValue::Int(v)) => Err(format!("message type {} must be >= 1", v)),
            (Rule::PinList, ParamValue::List(items)) if items.is_empty() => {
                Err("pin list is empty".to_string())
            }
            (Rule::PinList, ParamValue::List(items)) => items.iter().try_for_each(|v| check_pin(*v)),
            (Rule::BitList, ParamValue::List(items)) if items.is_empty() => {
                Err("bit list is empty".to_string())
            }
            (Rule::BitList, ParamValue::List(items)) => {
                items.iter().try_for_each(|v| check_level(*v))
            }
            (Rule::PinList | Rule::BitList, ParamValue::Int(_)) => {
                Err("expected a list, got a scalar".to_string())
            }
            (_, ParamValue::List(_)) => Err("expected a scalar, got a list".to_string()),
        }
    }
}

fn check_pin(v: i64) -> std::result::Result<(), String> {
    if PinId::is_valid(v) {
        Ok(())
    } else {
        Err(format!("pin {} outside [{}, {}]", v, PinId::MIN, PinId::MAX))
    }
}

fn check_level(v: i64) -> std::result::Result<(), String> {
    if v == 0 || v == 1 {
        Ok(())
    } else {
        Err(format!("{} is neither 0 nor 1", v))
    }
}

/// Validate `parms` against the schema of `function`
pub fn validate(function: CommandName, parms: &Params) -> Result<()> {
    for &param in required_params(function) {
        let value = parms
            .get(param)
            .ok_or_else(|| GpioError::validation(function.as_str(), format!("missing {}", param)))?;

        rule_for(param)
            .check(value)
            .map_err(|reason| GpioError::validation(function.as_str(), format!("{}: {}", param, reason)))?;
    }
    Ok(())
}

/// Boolean form of [`validate`]
pub fn is_valid(function: CommandName, parms: &Params) -> bool {
    validate(function, parms).is_ok()
}
