//! Echo task
//!
//! Waits for received bytes and writes them straight back.

use core::convert::Infallible;

use defmt::*;
use embedded_io_async::{Read, Write};

use crate::serial::SerialPort;

/// Chunk size read per wakeup
const ECHO_CHUNK: usize = 16;

fn never<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

#[embassy_executor::task]
pub async fn echo_task(mut port: SerialPort) {
    info!("Echo task started");

    let mut buf = [0u8; ECHO_CHUNK];
    loop {
        let n = never(port.read(&mut buf).await);
        trace!("echo {} bytes", n);
        never(port.write_all(&buf[..n]).await);
    }
}
