//! Response definitions
//!
//! Answers to query commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pin::{PinId, PinValue};

/// Reply to a query, sent to the caller's (queue, tag) pair
///
/// Exactly one of the fields is set for a well-formed reply. A field left
/// empty by the server means the pin could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Level of a single pin (`GetPin`)
    pub pin_status: Option<PinValue>,

    /// Level of every requested pin (`GetPinArray`)
    pub array_status: Option<BTreeMap<PinId, PinValue>>,
}

impl ResponseEnvelope {
    /// Reply to `GetPin`
    pub fn pin_status(value: Option<PinValue>) -> Self {
        Self {
            pin_status: value,
            array_status: None,
        }
    }

    /// Reply to `GetPinArray`
    pub fn array_status(levels: Option<BTreeMap<PinId, PinValue>>) -> Self {
        Self {
            pin_status: None,
            array_status: levels,
        }
    }

    /// True when the reply carries no payload at all
    pub fn is_empty(&self) -> bool {
        self.pin_status.is_none() && self.array_status.is_none()
    }
}
