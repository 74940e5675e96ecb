//! Capture/compare timer abstraction
//!
//! The engine time-multiplexes one free-running 16-bit timer with two
//! capture/compare channels:
//!
//! - [`Channel::Tx`] always runs in compare mode and fires once per bit
//!   period to clock out transmit bits.
//! - [`Channel::Rx`] alternates between falling-edge capture on the RX pin
//!   (waiting for a start bit) and compare mode (sampling bit-cell centers).
//!
//! Both channels share one interrupt priority, so their handlers never
//! preempt each other.

/// Timer counter value
///
/// The counter free-runs and wraps; all deadline arithmetic is wrapping.
pub type Ticks = u16;

/// Check if the counter has reached or passed `deadline`
///
/// Deadlines are never set more than half the counter range ahead, so a
/// deadline that appears further ahead than that is really behind.
pub fn deadline_passed(now: Ticks, deadline: Ticks) -> bool {
    now.wrapping_sub(deadline) < 0x8000
}

/// One of the two capture/compare channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Transmit bit clock (compare only)
    Tx,
    /// Receive edge capture / sample clock
    Rx,
}

/// A free-running timer with two capture/compare channels
///
/// Implementations are called from interrupt context and must not block.
pub trait CaptureCompareTimer {
    /// Current counter value
    fn now(&self) -> Ticks;

    /// Put `channel` in compare mode and fire its interrupt when the
    /// counter reaches `at`
    ///
    /// If the counter is already at or past `at` the interrupt must fire
    /// right away instead of after a full counter wrap.
    fn schedule(&mut self, channel: Channel, at: Ticks);

    /// Put `channel` in capture mode, latching the counter on the next
    /// falling edge of the RX line
    fn arm_falling_edge(&mut self, channel: Channel);

    /// Counter value latched by the last capture on `channel`
    fn captured(&self, channel: Channel) -> Ticks;

    /// Stop interrupts from `channel`
    fn disarm(&mut self, channel: Channel);
}
