//! Transmit state machine
//!
//! Driven only by TX channel compare ticks, one tick per bit period. Each
//! tick emits at most one bit; an idle tick with nothing queued does no pin
//! work at all, which keeps handler run time nearly constant regardless of
//! traffic.

use softserial_hal::DataBits;

/// Transmitter states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Line at mark, no frame in progress
    Idle,
    /// Start bit emitted; `bit` is the next data bit to drive
    Data { byte: u8, bit: u8 },
    /// All data bits emitted; stop bit goes out on the next tick
    Stop,
}

/// What the tick handler must do with the TX pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStep {
    /// Leave the pin alone (idle, nothing to send)
    Hold,
    /// Drive the pin to this level (true = high)
    Drive(bool),
}

/// Transmit frame state owned by the TX interrupt handler
#[derive(Debug, Clone)]
pub struct Transmitter {
    state: TxState,
    data_bits: u8,
}

impl Transmitter {
    /// Create an idle transmitter for frames of `data_bits`
    pub fn new(data_bits: DataBits) -> Self {
        Self {
            state: TxState::Idle,
            data_bits: data_bits.count(),
        }
    }

    /// Current state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Check if no frame is in progress
    pub fn is_idle(&self) -> bool {
        self.state == TxState::Idle
    }

    /// Advance by one bit period
    ///
    /// `next` is only called while idle, to dequeue the byte for a new
    /// frame. Once a frame starts it always runs to its stop bit.
    pub fn tick(&mut self, next: impl FnOnce() -> Option<u8>) -> TxStep {
        match self.state {
            TxState::Idle => match next() {
                Some(byte) => {
                    self.state = TxState::Data { byte, bit: 0 };
                    // Start bit
                    TxStep::Drive(false)
                }
                None => TxStep::Hold,
            },
            TxState::Data { byte, bit } => {
                let level = (byte >> bit) & 1 != 0;
                let bit = bit + 1;
                self.state = if bit == self.data_bits {
                    TxState::Stop
                } else {
                    TxState::Data { byte, bit }
                };
                TxStep::Drive(level)
            }
            TxState::Stop => {
                self.state = TxState::Idle;
                TxStep::Drive(true)
            }
        }
    }
}
