//! STM32F0 binding for the softserial UART
//!
//! Implements the `softserial-hal` traits on one general-purpose timer and
//! two GPIO lines:
//!
//! - TIM3 free-runs over its full 16-bit range at the timer kernel clock
//! - TIM3 CH1 (no pin) is the TX bit clock, output compare only
//! - TIM3 CH2 on PA7 (AF1) alternates between falling-edge input capture
//!   and output compare for RX sampling
//! - TX is any push-pull output, driven by software from the interrupt
//!
//! # Features
//!
//! - `stm32f042f6` / `stm32f042k6` - chip selection
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! ```ignore
//! let timer = Tim3Channels::new(p.TIM3);
//! let clock = timer.clock();
//! let tx = TxLine::new(Output::new(p.PA9, Level::High, Speed::High));
//! let rx = RxLine::new(p.PA7);
//! let config = SerialConfig::default().min_ticks_per_bit(MIN_TICKS_PER_BIT);
//! let driver = SERIAL.init(timer, tx, rx, &clock, &config)?;
//! // TIM3 interrupt: softserial_hal_stm32f0::on_interrupt(&mut driver)
//! ```

#![no_std]

pub mod gpio;
pub mod timer;

pub use gpio::{RxLine, TxLine};
pub use timer::{on_interrupt, Tim3Channels, TimerClock, MIN_TICKS_PER_BIT};
