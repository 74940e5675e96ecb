//! Board-agnostic core of the softserial timer-driven UART
//!
//! Implements an asynchronous serial port (1 start bit, 5 to 8 data bits
//! LSB first, 1 stop bit, no parity) on two ordinary GPIO lines using one
//! free-running timer with two capture/compare channels:
//!
//! - Bit-rate configuration and validation
//! - Lock-free single-producer/single-consumer byte queues
//! - Transmit and receive frame state machines
//! - Interrupt-side driver and caller-side port handle
//! - Link fault counters
//! - Oscillator calibration against a slow reference clock
//! - Console text helpers
//!
//! Hardware access goes through the traits in `softserial-hal`, so
//! everything here runs and is tested on the host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod calibration;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod queue;
pub mod rx;
pub mod stats;
pub mod tx;

#[cfg(test)]
mod sim;

pub use config::{BitTiming, ConfigError, SerialConfig};
pub use engine::{Driver, Port, SoftSerial};
pub use error::Error;
pub use stats::{LinkFault, LinkStats};
