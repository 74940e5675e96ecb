//! Oscillator calibration against a slow reference clock
//!
//! A frequency-locked loop for chips whose CPU clock comes from a trimmable
//! RC oscillator (DCO). The timer captures the counter on every edge of a
//! slow, accurate reference (typically a 32.768 kHz crystal divided by 8);
//! the count between two edges is compared to the expected value and the
//! oscillator is nudged one step at a time until they match.
//!
//! Run this before [`SoftSerial::init`](crate::SoftSerial::init): bit
//! timing is derived from the calibrated clock.

use core::fmt;

use softserial_hal::Ticks;

/// Oscillator that can be trimmed one step at a time
pub trait TrimmableOscillator {
    /// Step the frequency up. Returns false if already at the maximum.
    fn faster(&mut self) -> bool;

    /// Step the frequency down. Returns false if already at the minimum.
    fn slower(&mut self) -> bool;
}

/// Timer input capture on the reference clock
pub trait ReferenceCapture {
    /// Wait for the next reference edge and return the captured counter
    ///
    /// `None` if the reference is not running.
    fn next_capture(&mut self) -> Option<Ticks>;
}

/// Calibration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// No edge arrived from the reference clock
    NoReference,
    /// Target not hit within the iteration budget, or the oscillator ran
    /// out of trim range
    DidNotConverge,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::NoReference => f.write_str("reference clock not running"),
            CalibrationError::DidNotConverge => f.write_str("oscillator did not converge"),
        }
    }
}

/// Result of a successful calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationReport {
    /// Reference periods measured
    pub iterations: u32,
    /// Counter ticks in the final reference period
    pub delta: Ticks,
}

/// Expected counter ticks per reference period at `cpu_hz`
///
/// Saturates at `Ticks::MAX`; a zero reference yields `Ticks::MAX`.
pub fn target_delta(cpu_hz: u32, reference_hz: u32) -> Ticks {
    if reference_hz == 0 {
        return Ticks::MAX;
    }
    (cpu_hz / reference_hz).min(u32::from(Ticks::MAX)) as Ticks
}

/// Trim `osc` until one reference period measures exactly `target` ticks
///
/// Takes a baseline capture, then adjusts the oscillator by one step per
/// measured period: too many ticks means the oscillator is fast.
pub fn calibrate<O, R>(
    osc: &mut O,
    reference: &mut R,
    target: Ticks,
    max_iterations: u32,
) -> Result<CalibrationReport, CalibrationError>
where
    O: TrimmableOscillator + ?Sized,
    R: ReferenceCapture + ?Sized,
{
    let mut previous = reference.next_capture().ok_or(CalibrationError::NoReference)?;

    for iteration in 1..=max_iterations {
        let capture = reference.next_capture().ok_or(CalibrationError::NoReference)?;
        let delta = capture.wrapping_sub(previous);
        previous = capture;

        let moved = match delta.cmp(&target) {
            core::cmp::Ordering::Equal => {
                return Ok(CalibrationReport {
                    iterations: iteration,
                    delta,
                })
            }
            core::cmp::Ordering::Greater => osc.slower(),
            core::cmp::Ordering::Less => osc.faster(),
        };

        if !moved {
            return Err(CalibrationError::DidNotConverge);
        }
    }

    Err(CalibrationError::DidNotConverge)
}

/// Highest range-select value
pub const MAX_DCO_RANGE: u8 = 15;

/// Range/step pair of an MSP430-style DCO
///
/// `range` picks one of 16 coarse frequency bands and `step` trims within
/// the band. Stepping past either end of `step` wraps it and moves `range`
/// one notch, so the pair behaves like one 12-bit trim value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DcoSetting {
    range: u8,
    step: u8,
}

impl DcoSetting {
    /// Create a setting; `range` is clamped to [`MAX_DCO_RANGE`]
    pub const fn new(range: u8, step: u8) -> Self {
        let range = if range > MAX_DCO_RANGE { MAX_DCO_RANGE } else { range };
        Self { range, step }
    }

    /// Coarse range select (0..=15)
    pub const fn range(&self) -> u8 {
        self.range
    }

    /// Fine step within the range
    pub const fn step(&self) -> u8 {
        self.step
    }

    /// Position on the combined trim scale, 0 slowest
    pub const fn code(&self) -> u16 {
        (self.range as u16) << 8 | self.step as u16
    }
}

impl TrimmableOscillator for DcoSetting {
    fn faster(&mut self) -> bool {
        if self.range == MAX_DCO_RANGE && self.step == u8::MAX {
            return false;
        }
        self.step = self.step.wrapping_add(1);
        if self.step == 0 {
            self.range += 1;
        }
        true
    }

    fn slower(&mut self) -> bool {
        if self.range == 0 && self.step == 0 {
            return false;
        }
        self.step = self.step.wrapping_sub(1);
        if self.step == u8::MAX {
            self.range -= 1;
        }
        true
    }
}
