//! Single-pin pulses

use crate::pin::{PinId, PinValue, PulseOrder};

use super::PulseSequence;

/// Repeat `count` times: HIGH, wait `high_delay`, LOW, wait `low_delay`
pub fn flash_pin_high_low(pin: PinId, count: u64, high_delay: u64, low_delay: u64) -> PulseSequence {
    let mut seq = PulseSequence::new();
    seq.repeat(pin, PinValue::High, count, high_delay, low_delay);
    seq
}

/// Repeat `count` times: LOW, wait `low_delay`, HIGH, wait `high_delay`
///
/// Each level is held for its own delay. Servers that hold LOW for the
/// first delay argument of `flashPinLowHigh(pin, n, high, low)` keep it for
/// `high` instead; the time per pulse is the same.
pub fn flash_pin_low_high(pin: PinId, count: u64, low_delay: u64, high_delay: u64) -> PulseSequence {
    let mut seq = PulseSequence::new();
    seq.repeat(pin, PinValue::Low, count, low_delay, high_delay);
    seq
}

/// Pulse `pin` in the given edge order
///
/// `active` is how long the first level is held, `idle` the second.
pub fn pulse(pin: PinId, order: PulseOrder, count: u64, active: u64, idle: u64) -> PulseSequence {
    let first = match order {
        PulseOrder::HighLow => PinValue::High,
        PulseOrder::LowHigh => PinValue::Low,
    };
    let mut seq = PulseSequence::new();
    seq.repeat(pin, first, count, active, idle);
    seq
}
