//! In-memory driver
//!
//! Keeps pin levels in RAM and records every write in order.

use parking_lot::Mutex;

use crate::error::Result;
use crate::pin::{PinId, PinValue};

use super::GpioDriver;

const PIN_SLOTS: usize = PinId::MAX as usize + 1;

#[derive(Debug)]
struct State {
    levels: [PinValue; PIN_SLOTS],
    writes: Vec<(PinId, PinValue)>,
}

/// Driver backed by memory, for dry runs and tests
#[derive(Debug)]
pub struct MemoryDriver {
    state: Mutex<State>,
}

impl MemoryDriver {
    /// All pins start LOW
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                levels: [PinValue::Low; PIN_SLOTS],
                writes: Vec::new(),
            }),
        }
    }

    /// Force a pin level without recording a write (simulates an input)
    pub fn set_input(&self, pin: PinId, value: PinValue) {
        self.state.lock().levels[pin.get() as usize] = value;
    }

    /// Current level of `pin`
    pub fn level(&self, pin: PinId) -> PinValue {
        self.state.lock().levels[pin.get() as usize]
    }

    /// Every write since creation (or the last [`MemoryDriver::clear_writes`])
    pub fn writes(&self) -> Vec<(PinId, PinValue)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn set_output_pin(&self, pin: PinId, value: PinValue) -> Result<()> {
        let mut state = self.state.lock();
        state.levels[pin.get() as usize] = value;
        state.writes.push((pin, value));
        Ok(())
    }

    fn get_input_pin(&self, pin: PinId) -> Result<PinValue> {
        Ok(self.level(pin))
    }
}
