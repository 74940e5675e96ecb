//! Link configuration
//!
//! [`SerialConfig`] is what the application asks for; [`BitTiming`] is what
//! the engine derives from it once at `init` and then uses unchanged from
//! interrupt context.

pub mod timing;

pub use timing::{
    BitTiming, ConfigError, MAX_BAUD_ERROR_PERMILLE, MAX_TICKS_PER_BIT, MIN_TICKS_PER_BIT,
};

use softserial_hal::DataBits;

/// Default baud rate (terminal default 9600-8-N-1)
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default jitter budget in timer ticks
///
/// The longest interrupt handler plus entry latency must finish well inside
/// one bit period; bit periods shorter than this are rejected. Values below
/// [`MIN_TICKS_PER_BIT`] are raised to it.
pub const DEFAULT_MIN_TICKS_PER_BIT: u16 = 40;

/// Requested serial link parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Data bits per frame
    pub data_bits: DataBits,
    /// Smallest acceptable bit period in timer ticks
    pub min_ticks_per_bit: u16,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            min_ticks_per_bit: DEFAULT_MIN_TICKS_PER_BIT,
        }
    }
}

impl SerialConfig {
    /// 8-N-1 at the given baud rate
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Override the data width
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Override the jitter budget
    pub fn min_ticks_per_bit(mut self, ticks: u16) -> Self {
        self.min_ticks_per_bit = ticks;
        self
    }
}
