//! Softserial Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the software UART engine is
//! written against. A chip-specific crate implements them for one timer
//! and two GPIO pins; the engine in `softserial-core` never touches
//! registers directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (softserial-firmware)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  softserial-core (engine, queues)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  softserial-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ softserial-   │
//!             │ hal-stm32f0   │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O for the TX/RX lines
//! - [`timer::CaptureCompareTimer`] - One timer, two capture/compare channels
//! - [`clock::ClockReference`] - Effective timer tick rate
//! - [`uart::UartTx`], [`uart::UartRx`] - Byte-oriented serial access

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod gpio;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use clock::{ClockReference, FixedClock};
pub use gpio::{InputPin, OutputPin};
pub use timer::{deadline_passed, CaptureCompareTimer, Channel, Ticks};
pub use uart::{DataBits, UartRx, UartTx};
