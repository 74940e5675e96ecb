//! Clock reference abstraction
//!
//! The engine only needs to know how fast the capture/compare timer counts.
//! How that clock was obtained (crystal, calibrated DCO, PLL) is up to the
//! board.

/// Source of the timer's effective tick rate
pub trait ClockReference {
    /// Timer counts per second
    fn tick_rate_hz(&self) -> u32;
}

/// A clock whose rate is known at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedClock(pub u32);

impl ClockReference for FixedClock {
    fn tick_rate_hz(&self) -> u32 {
        self.0
    }
}

impl<C: ClockReference + ?Sized> ClockReference for &C {
    fn tick_rate_hz(&self) -> u32 {
        (**self).tick_rate_hz()
    }
}
