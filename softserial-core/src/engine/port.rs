//! Caller-side byte I/O handle
//!
//! Blocking calls busy-poll the queues while the timer interrupt moves
//! bits; async calls park on the engine's wakers instead.

use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;

use softserial_hal::{UartRx, UartTx};

use super::SoftSerial;

/// Copyable handle onto a [`SoftSerial`]
#[derive(Clone, Copy)]
pub struct Port<'a, const TX: usize, const RX: usize> {
    serial: &'a SoftSerial<TX, RX>,
}

impl<'a, const TX: usize, const RX: usize> Port<'a, TX, RX> {
    pub(super) fn new(serial: &'a SoftSerial<TX, RX>) -> Self {
        Self { serial }
    }

    /// The shared engine state behind this handle
    pub fn serial(&self) -> &'a SoftSerial<TX, RX> {
        self.serial
    }

    fn read_some_blocking(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        loop {
            let read = self.serial.read_into(buf);
            if read > 0 {
                return read;
            }
            core::hint::spin_loop();
        }
    }

    fn write_some_blocking(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        loop {
            let written = self.serial.write_available(data);
            if written > 0 {
                return written;
            }
            core::hint::spin_loop();
        }
    }
}

impl<const TX: usize, const RX: usize> UartTx for Port<'_, TX, RX> {
    type Error = Infallible;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.serial.write_all(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.serial.flush();
        Ok(())
    }
}

impl<const TX: usize, const RX: usize> UartRx for Port<'_, TX, RX> {
    type Error = Infallible;

    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut filled = 0;
        while filled < buf.len() {
            filled += self.read_some_blocking(&mut buf[filled..]);
        }
        Ok(filled)
    }
}

impl<const TX: usize, const RX: usize> core::fmt::Write for Port<'_, TX, RX> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.serial.write_all(s.as_bytes());
        Ok(())
    }
}

impl<const TX: usize, const RX: usize> embedded_io::ErrorType for Port<'_, TX, RX> {
    type Error = Infallible;
}

impl<const TX: usize, const RX: usize> embedded_io::Read for Port<'_, TX, RX> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.read_some_blocking(buf))
    }
}

impl<const TX: usize, const RX: usize> embedded_io::ReadReady for Port<'_, TX, RX> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.serial.is_empty())
    }
}

impl<const TX: usize, const RX: usize> embedded_io::Write for Port<'_, TX, RX> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.write_some_blocking(buf))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.serial.flush();
        Ok(())
    }
}

impl<const TX: usize, const RX: usize> embedded_io::WriteReady for Port<'_, TX, RX> {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.serial.can_transmit())
    }
}

impl<const TX: usize, const RX: usize> embedded_io_async::Read for Port<'_, TX, RX> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let serial = self.serial;
        poll_fn(|cx| {
            serial.rx_waker.register(cx.waker());
            match serial.read_into(buf) {
                0 => Poll::Pending,
                read => Poll::Ready(Ok(read)),
            }
        })
        .await
    }
}

impl<const TX: usize, const RX: usize> embedded_io_async::Write for Port<'_, TX, RX> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let serial = self.serial;
        poll_fn(|cx| {
            serial.tx_waker.register(cx.waker());
            match serial.write_available(buf) {
                0 => Poll::Pending,
                written => Poll::Ready(Ok(written)),
            }
        })
        .await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        let serial = self.serial;
        poll_fn(|cx| {
            serial.tx_waker.register(cx.waker());
            if serial.is_tx_idle() {
                Poll::Ready(Ok(()))
            } else {
                Poll::Pending
            }
        })
        .await
    }
}
