//! Binary patterns over pin lists

use crate::pin::{PinId, PinValue, PulseOrder};

use super::{pulse, PulseSequence, Step};

/// Map the bits of `value` onto `pins`, `pins[0]` being the least-significant bit
///
/// Pins are written from the most-significant position down, the order a
/// zero-padded binary string is read in. Values wider than `pins.len()`
/// bits lose their high bits.
pub fn bits_to_pins(value: u64, pins: &[PinId]) -> PulseSequence {
    let n = pins.len();
    (0..n)
        .map(|p| {
            let bit_index = n - p - 1;
            let bit = bit_index < 64 && (value >> bit_index) & 1 == 1;
            Step::Set(pins[bit_index], PinValue::from_bit(bit))
        })
        .collect()
}

/// Present `value` on `pins`, then latch it with one pulse of `select`
///
/// `select` is driven LOW before the data lines change.
pub fn flash_binary(
    value: u64,
    pins: &[PinId],
    select: PinId,
    order: PulseOrder,
    high_delay: u64,
    low_delay: u64,
) -> PulseSequence {
    let mut seq = PulseSequence::new();
    seq.set(select, PinValue::Low);
    seq.extend(bits_to_pins(value, pins));
    let (active, idle) = match order {
        PulseOrder::HighLow => (high_delay, low_delay),
        PulseOrder::LowHigh => (low_delay, high_delay),
    };
    seq.extend(pulse(select, order, 1, active, idle));
    seq
}

/// Per-pulse (active, idle) delays of a strobe
///
/// `active = period·count / (count+off_count)²` and
/// `idle = period·off_count / (count+off_count)²`, integer microseconds.
/// A zero denominator yields zero delays.
pub fn strobe_delays(count: u64, off_count: u64, period: u64) -> (u64, u64) {
    let total = u128::from(count) + u128::from(off_count);
    if total == 0 {
        return (0, 0);
    }
    let denom = total * total;
    let active = u128::from(period) * u128::from(count) / denom;
    let idle = u128::from(period) * u128::from(off_count) / denom;
    (
        u64::try_from(active).unwrap_or(u64::MAX),
        u64::try_from(idle).unwrap_or(u64::MAX),
    )
}

/// Present `value` on `pins` once, then pulse `select` `count` times
pub fn strobe_binary(
    value: u64,
    pins: &[PinId],
    select: PinId,
    order: PulseOrder,
    count: u64,
    off_count: u64,
    period: u64,
) -> PulseSequence {
    let (active, idle) = strobe_delays(count, off_count, period);
    let mut seq = bits_to_pins(value, pins);
    seq.extend(pulse(select, order, count, active, idle));
    seq
}
