//! The serial port instance and its TIM3 interrupt
//!
//! `SERIAL` is the caller-side state shared with tasks. The interrupt-side
//! driver lives in `DRIVER` and is only touched by the TIM3 handler.

use core::cell::RefCell;

use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use softserial_core::{Driver, Port, SoftSerial};
use softserial_hal_stm32f0::{on_interrupt, RxLine, Tim3Channels, TxLine};

/// TX queue capacity in bytes
pub const TX_CAPACITY: usize = 32;

/// RX queue capacity in bytes
pub const RX_CAPACITY: usize = 32;

pub type SerialDriver = Driver<
    'static,
    Tim3Channels<'static>,
    TxLine<'static>,
    RxLine<'static>,
    TX_CAPACITY,
    RX_CAPACITY,
>;

pub type SerialPort = Port<'static, TX_CAPACITY, RX_CAPACITY>;

/// Shared serial state
pub static SERIAL: SoftSerial<TX_CAPACITY, RX_CAPACITY> = SoftSerial::new();

/// Interrupt-owned driver, installed once by `start`
static DRIVER: Mutex<CriticalSectionRawMutex, RefCell<Option<SerialDriver>>> =
    Mutex::new(RefCell::new(None));

/// Hand the driver to the TIM3 interrupt and unmask it
///
/// Bit timing only tolerates handler latency, so TIM3 runs above every
/// other interrupt.
pub fn start(driver: SerialDriver) {
    DRIVER.lock(|cell| cell.replace(Some(driver)));

    interrupt::TIM3.set_priority(Priority::P0);
    interrupt::TIM3.unpend();
    // SAFETY: the handler only touches DRIVER, which is fully set up above
    unsafe { interrupt::TIM3.enable() };
}

#[interrupt]
fn TIM3() {
    DRIVER.lock(|cell| {
        if let Some(driver) = cell.borrow_mut().as_mut() {
            on_interrupt(driver);
        }
    });
}
