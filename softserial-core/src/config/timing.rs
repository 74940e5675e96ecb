//! Bit-rate derivation
//!
//! Converts a requested baud rate and the timer tick rate into the integer
//! compare intervals used by both state machines. Every check that could
//! reject a configuration happens here, before any traffic flows.

use core::fmt;

use softserial_hal::{DataBits, Ticks};

use super::SerialConfig;

/// Longest bit period in ticks
///
/// Half the 16-bit counter range, so wrap-aware deadline comparisons stay
/// unambiguous.
pub const MAX_TICKS_PER_BIT: u16 = 0x7FFF;

/// Shortest bit period in ticks, whatever the configured jitter budget
///
/// The start-bit sample lands half a bit after the captured edge; that
/// offset must be at least two ticks so it is never already behind the
/// counter when the receive handler schedules it.
pub const MIN_TICKS_PER_BIT: u16 = 4;

/// Largest tolerated difference between requested and achieved baud rate
/// (‰)
///
/// Both ends of an 8-N-1 link together may drift about 5 % before the
/// stop bit is sampled in the wrong cell; this side gets 2 %.
pub const MAX_BAUD_ERROR_PERMILLE: u32 = 20;

/// Errors from timing derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate cannot be represented with this timer clock
    UnsupportedBaudRate,
    /// Timer clock reported as 0 Hz
    UnsupportedClock,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedBaudRate => f.write_str("unsupported baud rate"),
            ConfigError::UnsupportedClock => f.write_str("unsupported timer clock"),
        }
    }
}

/// Immutable bit timing computed once at `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// Timer ticks per second
    pub clock_hz: u32,
    /// Requested baud rate
    pub baud_rate: u32,
    /// Timer ticks per bit period
    pub ticks_per_bit: Ticks,
    /// Ticks from a start-bit edge to the start bit's center
    pub half_bit_ticks: Ticks,
    /// Data bits per frame
    pub data_bits: DataBits,
}

impl BitTiming {
    /// Derive the bit timing for `config` on a timer counting at `clock_hz`
    pub fn new(clock_hz: u32, config: &SerialConfig) -> Result<Self, ConfigError> {
        if clock_hz == 0 {
            return Err(ConfigError::UnsupportedClock);
        }
        if config.baud_rate == 0 || config.baud_rate > clock_hz {
            return Err(ConfigError::UnsupportedBaudRate);
        }

        // Round to nearest
        let baud = config.baud_rate as u64;
        let ticks = (clock_hz as u64 + baud / 2) / baud;

        let floor = config.min_ticks_per_bit.max(MIN_TICKS_PER_BIT) as u64;
        if ticks < floor || ticks > MAX_TICKS_PER_BIT as u64 {
            return Err(ConfigError::UnsupportedBaudRate);
        }

        let timing = Self {
            clock_hz,
            baud_rate: config.baud_rate,
            ticks_per_bit: ticks as Ticks,
            half_bit_ticks: (ticks / 2) as Ticks,
            data_bits: config.data_bits,
        };

        if timing.error_permille() > MAX_BAUD_ERROR_PERMILLE {
            return Err(ConfigError::UnsupportedBaudRate);
        }

        Ok(timing)
    }

    /// Baud rate actually produced by the integer bit period
    pub fn actual_baud_rate(&self) -> u32 {
        let ticks = self.ticks_per_bit as u32;
        (self.clock_hz + ticks / 2) / ticks
    }

    /// Relative difference between requested and produced baud rate (‰)
    pub fn error_permille(&self) -> u32 {
        let actual = self.clock_hz as u64 * 1000 / self.ticks_per_bit as u64;
        let requested = self.baud_rate as u64 * 1000;
        let diff = actual.abs_diff(requested);
        (diff * 1000 / requested) as u32
    }

    /// Ticks in one complete frame (start + data + stop)
    pub fn frame_ticks(&self) -> u32 {
        self.ticks_per_bit as u32 * self.data_bits.frame_bits() as u32
    }

    /// Offset from a start-bit edge to the center of bit cell `cell`
    ///
    /// Cell 0 is the start bit, cells `1..=N` the data bits, cell `N + 1`
    /// the stop bit.
    pub fn sample_offset(&self, cell: u8) -> u32 {
        self.half_bit_ticks as u32 + cell as u32 * self.ticks_per_bit as u32
    }

    /// Duration of one frame in microseconds
    pub fn frame_micros(&self) -> u32 {
        (self.frame_ticks() as u64 * 1_000_000 / self.clock_hz as u64) as u32
    }
}
