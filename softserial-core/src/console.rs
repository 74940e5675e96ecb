//! Small text helpers for a byte-oriented console

use softserial_hal::UartTx;

use crate::engine::Port;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Write `byte` as two uppercase hex digits
pub fn write_hex_byte<W: UartTx + ?Sized>(w: &mut W, byte: u8) -> Result<(), W::Error> {
    let digits = [
        HEX_DIGITS[usize::from(byte >> 4)],
        HEX_DIGITS[usize::from(byte & 0x0F)],
    ];
    w.write_blocking(&digits)
}

/// Write `s` as raw bytes, no line ending appended
pub fn write_str_raw<W: UartTx + ?Sized>(w: &mut W, s: &str) -> Result<(), W::Error> {
    w.write_blocking(s.as_bytes())
}

/// Send every byte received so far back out, returning how many were echoed
///
/// Counts the RX queue once, then takes exactly that many bytes with
/// [`SoftSerial::read_unchecked`](crate::SoftSerial::read_unchecked).
/// Blocks while the TX queue is full.
///
/// # Safety
///
/// The caller must be the only context reading from this port.
#[allow(unsafe_code)]
pub unsafe fn echo_pending<const TX: usize, const RX: usize>(port: &Port<'_, TX, RX>) -> usize {
    let serial = port.serial();
    let count = serial.available();
    for _ in 0..count {
        // SAFETY: `count` bytes were available and nobody else reads
        let byte = unsafe { serial.read_unchecked() };
        serial.transmit(byte);
    }
    count
}
