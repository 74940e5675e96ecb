//! Softserial echo firmware
//!
//! Runs a full-duplex software UART on an STM32F042K6 (TX on PA9, RX on
//! PA7) and echoes every received byte back to the sender.

#![no_std]
#![no_main]

mod serial;
mod tasks;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use {defmt_rtt as _, panic_probe as _};

use softserial_core::console::{write_hex_byte, write_str_raw};
use softserial_core::SerialConfig;
use softserial_hal_stm32f0::{RxLine, Tim3Channels, TxLine, MIN_TICKS_PER_BIT};

use crate::serial::SERIAL;
use crate::tasks::{echo_task, monitor_task};

/// Link speed; 8-N-1
const BAUD_RATE: u32 = 9600;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Softserial echo firmware starting...");

    let p = embassy_stm32::init(Default::default());
    info!("Peripherals initialized");

    let timer = Tim3Channels::new(p.TIM3);
    let clock = timer.clock();
    let tx = TxLine::new(Output::new(p.PA9, Level::High, Speed::High));
    let rx = RxLine::new(p.PA7);

    let config = SerialConfig::with_baud(BAUD_RATE).min_ticks_per_bit(MIN_TICKS_PER_BIT);
    let driver = match SERIAL.init(timer, tx, rx, &clock, &config) {
        Ok(driver) => driver,
        Err(e) => {
            error!("Serial init failed at {} Hz: {}", clock.0 .0, e);
            loop {
                cortex_m::asm::wfi();
            }
        }
    };

    let timing = *driver.timing();
    info!(
        "Serial up: {} baud (actual {}), {} ticks/bit",
        timing.baud_rate,
        timing.actual_baud_rate(),
        timing.ticks_per_bit
    );
    serial::start(driver);

    let mut port = SERIAL.port();
    let banner = write_str_raw(&mut port, "\r\n>>softserial echo, ticks/bit = 0x")
        .and_then(|()| write_hex_byte(&mut port, (timing.ticks_per_bit >> 8) as u8))
        .and_then(|()| write_hex_byte(&mut port, timing.ticks_per_bit as u8))
        .and_then(|()| write_str_raw(&mut port, "\r\n"));
    if let Err(never) = banner {
        match never {}
    }

    spawner.spawn(echo_task(port)).unwrap();
    spawner.spawn(monitor_task()).unwrap();

    info!("All tasks spawned");
}
