//! Pulse sequences
//!
//! An ordered list of pin writes and waits. Repeated pulses are kept as a
//! single segment and expanded step by step while iterating, so the memory
//! a sequence holds does not depend on its pulse count.

use std::iter;
use std::thread;
use std::time::Duration;

use crate::driver::GpioDriver;
use crate::error::Result;
use crate::pin::{PinId, PinValue};

/// One step of a pulse sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Drive a pin to a level
    Set(PinId, PinValue),

    /// Hold the current levels for a number of microseconds
    Wait(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Step(Step),

    /// `count` times: `first`, wait `active`, the opposite level, wait `idle`
    Repeat {
        pin: PinId,
        first: PinValue,
        count: u64,
        active: u64,
        idle: u64,
    },
}

impl Segment {
    fn step_count(&self) -> u64 {
        match self {
            Segment::Step(_) => 1,
            Segment::Repeat { count, .. } => count.saturating_mul(4),
        }
    }

    fn micros(&self) -> u64 {
        match *self {
            Segment::Step(Step::Wait(us)) => us,
            Segment::Step(Step::Set(..)) => 0,
            Segment::Repeat {
                count, active, idle, ..
            } => count.saturating_mul(active.saturating_add(idle)),
        }
    }

    fn steps(self) -> Box<dyn Iterator<Item = Step>> {
        match self {
            Segment::Step(step) => Box::new(iter::once(step)),
            Segment::Repeat {
                pin,
                first,
                count,
                active,
                idle,
            } => {
                let cycle = [
                    Step::Set(pin, first),
                    Step::Wait(active),
                    Step::Set(pin, first.invert()),
                    Step::Wait(idle),
                ];
                Box::new((0..count).flat_map(move |_| cycle))
            }
        }
    }
}

/// Ordered pin writes and waits produced by the pattern codec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseSequence {
    segments: Vec<Segment>,
}

impl PulseSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pin write
    pub fn set(&mut self, pin: PinId, value: PinValue) -> &mut Self {
        self.segments.push(Segment::Step(Step::Set(pin, value)));
        self
    }

    /// Append a wait; zero-length waits are kept so timing stays explicit
    pub fn wait(&mut self, micros: u64) -> &mut Self {
        self.segments.push(Segment::Step(Step::Wait(micros)));
        self
    }

    /// Append `count` pulses of `pin`, starting at `first`
    ///
    /// `first` is held for `active` microseconds, the opposite level for `idle`.
    pub fn repeat(
        &mut self,
        pin: PinId,
        first: PinValue,
        count: u64,
        active: u64,
        idle: u64,
    ) -> &mut Self {
        if count > 0 {
            self.segments.push(Segment::Repeat {
                pin,
                first,
                count,
                active,
                idle,
            });
        }
        self
    }

    /// Append every step of `other`
    pub fn extend(&mut self, other: PulseSequence) -> &mut Self {
        self.segments.extend(other.segments);
        self
    }

    /// Steps in execution order, expanded lazily
    pub fn steps(&self) -> impl Iterator<Item = Step> + '_ {
        self.segments.iter().flat_map(|segment| segment.steps())
    }

    /// Number of steps, saturating at `u64::MAX`
    pub fn len(&self) -> u64 {
        self.segments
            .iter()
            .map(Segment::step_count)
            .fold(0u64, u64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Pin writes only, in order
    pub fn writes(&self) -> impl Iterator<Item = (PinId, PinValue)> + '_ {
        self.steps().filter_map(|step| match step {
            Step::Set(pin, value) => Some((pin, value)),
            Step::Wait(_) => None,
        })
    }

    /// Sum of all waits in microseconds, saturating at `u64::MAX`
    pub fn total_micros(&self) -> u64 {
        self.segments
            .iter()
            .map(Segment::micros)
            .fold(0u64, u64::saturating_add)
    }

    /// Wall time the sequence takes when executed
    pub fn total_duration(&self) -> Duration {
        Duration::from_micros(self.total_micros())
    }

    /// Execute against a driver, sleeping through the waits
    ///
    /// Stops at the first driver failure; pins already written keep their level.
    pub fn run(&self, driver: &dyn GpioDriver) -> Result<()> {
        for step in self.steps() {
            match step {
                Step::Set(pin, value) => driver.set_output_pin(pin, value)?,
                Step::Wait(0) => {}
                Step::Wait(us) => thread::sleep(Duration::from_micros(us)),
            }
        }
        Ok(())
    }
}

impl FromIterator<Step> for PulseSequence {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Segment::Step).collect(),
        }
    }
}
