//! Shift-register output

use crate::pin::{PinValue, ShiftPins};

use super::{flash_pin_high_low, PulseSequence};

/// Shift one bit into the register and latch it
pub fn shift_data_bit(pins: ShiftPins, bit: PinValue, delay: u64) -> PulseSequence {
    let mut seq = PulseSequence::new();
    seq.set(pins.shift_out, bit);
    seq.extend(flash_pin_high_low(pins.sr_clk, 1, delay, delay));
    seq.extend(flash_pin_high_low(pins.reg_clk, 1, delay, delay));
    seq
}

/// Shift `bits` in from the last index to the first, then latch once
///
/// After the latch `bits[0]` sits on the first register output.
pub fn shift_data_array(pins: ShiftPins, bits: &[PinValue], delay: u64) -> PulseSequence {
    let mut seq = PulseSequence::new();
    for &bit in bits.iter().rev() {
        seq.set(pins.shift_out, bit);
        seq.extend(flash_pin_high_low(pins.sr_clk, 1, delay, delay));
    }
    seq.extend(flash_pin_high_low(pins.reg_clk, 1, delay, delay));
    seq
}
