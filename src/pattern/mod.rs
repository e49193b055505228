//! Pin-Pattern Codec
//!
//! Pure builders that turn values and bit sequences into timed pulse
//! sequences over an ordered pin list. Nothing here touches hardware:
//! the server runs a [`PulseSequence`] against a driver, and the client
//! reads [`PulseSequence::total_duration`] of the same sequence to know
//! how long to block.
//!
//! ## Bit Mapping
//! ```text
//!   value = 0b101, pins = [p0, p1, p2]
//!
//!   binary string  "1 0 1"      (MSB first, zero-padded to 3 digits)
//!                   │ │ └──► p0 HIGH   (bit 0)
//!                   │ └────► p1 LOW    (bit 1)
//!                   └──────► p2 HIGH   (bit 2)
//! ```
//! `pins[0]` is always bit 0. Bits above `pins.len()` are dropped.

mod sequence;
mod binary;
mod pulse;
mod shift;

pub use sequence::{PulseSequence, Step};
pub use binary::{bits_to_pins, flash_binary, strobe_binary, strobe_delays};
pub use pulse::{flash_pin_high_low, flash_pin_low_high, pulse};
pub use shift::{shift_data_array, shift_data_bit};
