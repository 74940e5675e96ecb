//! Receive state machine
//!
//! Driven by two kinds of RX channel events: a falling-edge capture while
//! listening, and compare ticks at bit-cell centers while a frame is in
//! progress. Cell 0 (the start bit) is sampled half a bit after the edge to
//! reject glitches; data and stop cells follow one bit period apart.

use softserial_hal::DataBits;

use crate::stats::LinkFault;

/// Receiver states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Waiting for a falling edge
    Listening,
    /// Edge seen; next sample confirms the start bit
    StartCheck,
    /// Collecting data bits; `index` is the next bit to sample
    Data { bits: u8, index: u8 },
    /// All data bits in; next sample must be the stop bit
    StopCheck { byte: u8 },
}

/// Result of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    /// Frame still in progress; sample again one bit period later
    Pending,
    /// Frame complete and valid
    Byte(u8),
    /// Frame discarded; receiver is listening again
    Fault(LinkFault),
}

/// Receive frame state owned by the RX interrupt handler
#[derive(Debug, Clone)]
pub struct Receiver {
    state: RxState,
    data_bits: u8,
}

impl Receiver {
    /// Create a listening receiver for frames of `data_bits`
    pub fn new(data_bits: DataBits) -> Self {
        Self {
            state: RxState::Listening,
            data_bits: data_bits.count(),
        }
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Check if waiting for a start bit
    pub fn is_listening(&self) -> bool {
        self.state == RxState::Listening
    }

    /// Handle a falling edge on the RX line
    ///
    /// Returns true if the edge was taken as a start bit. Edges during a
    /// frame are ignored; under correct framing they are data transitions.
    pub fn on_edge(&mut self) -> bool {
        if self.is_listening() {
            self.state = RxState::StartCheck;
            true
        } else {
            false
        }
    }

    /// Handle a bit-cell-center sample of the RX line (true = high)
    pub fn on_sample(&mut self, high: bool) -> RxOutcome {
        match self.state {
            RxState::Listening => RxOutcome::Pending,
            RxState::StartCheck => {
                if high {
                    self.state = RxState::Listening;
                    RxOutcome::Fault(LinkFault::FalseStart)
                } else {
                    self.state = RxState::Data { bits: 0, index: 0 };
                    RxOutcome::Pending
                }
            }
            RxState::Data { bits, index } => {
                let bits = if high { bits | (1 << index) } else { bits };
                let index = index + 1;
                self.state = if index == self.data_bits {
                    RxState::StopCheck { byte: bits }
                } else {
                    RxState::Data { bits, index }
                };
                RxOutcome::Pending
            }
            RxState::StopCheck { byte } => {
                self.state = RxState::Listening;
                if high {
                    RxOutcome::Byte(byte)
                } else {
                    RxOutcome::Fault(LinkFault::Framing)
                }
            }
        }
    }
}
