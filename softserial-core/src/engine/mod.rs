//! The software UART engine
//!
//! Split along the interrupt boundary:
//!
//! - [`SoftSerial`] is the process-wide shared state: both byte queues,
//!   link counters and wakers. It lives in a `static` and is the only thing
//!   caller code touches.
//! - [`Driver`] owns the timer, the pins and both frame state machines. It
//!   is handed to the timer interrupt and never touched elsewhere.
//! - [`Port`] is a copyable caller-side handle implementing the byte I/O
//!   traits.
//!
//! ```text
//! caller ──try_transmit──▶ TX queue ──on_tx_compare──▶ TX pin
//! caller ◀─────read─────── RX queue ◀──on_rx_event─── RX pin
//! ```

mod driver;
mod port;

pub use driver::Driver;
pub use port::Port;

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::AtomicWaker;
use portable_atomic::{AtomicBool, Ordering};

use softserial_hal::{CaptureCompareTimer, Channel, ClockReference, InputPin, OutputPin};

use crate::config::{BitTiming, SerialConfig};
use crate::error::Error;
use crate::queue::ByteQueue;
use crate::stats::{Counters, LinkStats};

/// Default TX queue capacity
pub const DEFAULT_TX_CAPACITY: usize = 16;

/// Default RX queue capacity
pub const DEFAULT_RX_CAPACITY: usize = 16;

/// Shared state of one software serial port
///
/// Create it in a `static` with [`SoftSerial::new`], then call
/// [`SoftSerial::init`] exactly once to obtain the interrupt-side
/// [`Driver`].
pub struct SoftSerial<const TX: usize = DEFAULT_TX_CAPACITY, const RX: usize = DEFAULT_RX_CAPACITY> {
    tx_queue: ByteQueue<TX>,
    rx_queue: ByteQueue<RX>,
    counters: Counters,
    /// A frame is on the wire (set/cleared by the TX handler)
    tx_active: AtomicBool,
    initialized: AtomicBool,
    timing: Mutex<CriticalSectionRawMutex, Cell<Option<BitTiming>>>,
    rx_waker: AtomicWaker,
    tx_waker: AtomicWaker,
}

impl<const TX: usize, const RX: usize> Default for SoftSerial<TX, RX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const TX: usize, const RX: usize> SoftSerial<TX, RX> {
    /// Create an uninitialized port
    pub const fn new() -> Self {
        Self {
            tx_queue: ByteQueue::new(),
            rx_queue: ByteQueue::new(),
            counters: Counters::new(),
            tx_active: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            timing: Mutex::new(Cell::new(None)),
            rx_waker: AtomicWaker::new(),
            tx_waker: AtomicWaker::new(),
        }
    }

    /// Configure the timer and pins and start the bit clocks
    ///
    /// Drives TX to idle-high, arms the TX tick one bit period from now and
    /// arms falling-edge capture on RX. Fails with
    /// [`Error::UnsupportedBaudRate`] before touching any hardware if the
    /// baud rate cannot be produced at the clock's rate, and with
    /// [`Error::AlreadyInitialized`] on a second call.
    pub fn init<T, TxP, RxP, C>(
        &self,
        mut timer: T,
        mut tx_pin: TxP,
        rx_pin: RxP,
        clock: &C,
        config: &SerialConfig,
    ) -> Result<Driver<'_, T, TxP, RxP, TX, RX>, Error>
    where
        T: CaptureCompareTimer,
        TxP: OutputPin,
        RxP: InputPin,
        C: ClockReference + ?Sized,
    {
        if self.is_initialized() {
            return Err(Error::AlreadyInitialized);
        }

        let timing = BitTiming::new(clock.tick_rate_hz(), config)?;

        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "softserial: {} baud, {} ticks/bit, {} permille error",
            timing.baud_rate,
            timing.ticks_per_bit,
            timing.error_permille()
        );

        self.timing.lock(|cell| cell.set(Some(timing)));
        self.tx_active.store(false, Ordering::Release);

        tx_pin.set_high();
        let tx_deadline = timer.now().wrapping_add(timing.ticks_per_bit);
        timer.schedule(Channel::Tx, tx_deadline);
        timer.arm_falling_edge(Channel::Rx);

        Ok(Driver::new(self, timer, tx_pin, rx_pin, timing, tx_deadline))
    }

    /// Check if `init` has succeeded (and the driver not been released)
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Bit timing in use, once initialized
    pub fn timing(&self) -> Option<BitTiming> {
        self.timing.lock(|cell| cell.get())
    }

    /// Caller-side handle implementing the byte I/O traits
    pub fn port(&self) -> Port<'_, TX, RX> {
        Port::new(self)
    }

    // --- transmit ---

    /// Queue one byte for output without waiting
    ///
    /// Returns [`Error::QueueFull`] (byte not accepted) if the TX queue has
    /// no room.
    pub fn try_transmit(&self, byte: u8) -> Result<(), Error> {
        if self.tx_queue.try_push(byte) {
            Ok(())
        } else {
            Err(Error::QueueFull)
        }
    }

    /// Queue one byte for output, busy-polling until there is room
    ///
    /// The TX interrupt keeps draining the queue while this spins. Must only
    /// be called after `init`, otherwise a full queue never drains.
    pub fn transmit(&self, byte: u8) {
        while !self.tx_queue.try_push(byte) {
            core::hint::spin_loop();
        }
    }

    /// Queue every byte of `data`, blocking as needed
    pub fn write_all(&self, data: &[u8]) {
        for &byte in data {
            self.transmit(byte);
        }
    }

    /// Queue as many bytes of `data` as fit right now
    pub fn write_available(&self, data: &[u8]) -> usize {
        data.iter()
            .take_while(|&&byte| self.tx_queue.try_push(byte))
            .count()
    }

    /// Bytes queued but not yet started on the wire
    pub fn tx_pending(&self) -> usize {
        self.tx_queue.count()
    }

    /// Check if the TX queue can take another byte
    pub fn can_transmit(&self) -> bool {
        !self.tx_queue.is_full()
    }

    /// Drop output that has not started yet, returning the number of bytes
    /// discarded
    ///
    /// A frame already on the wire always completes.
    pub fn clear_tx(&self) -> usize {
        self.tx_queue.clear()
    }

    /// Check if the TX queue is empty and no frame is on the wire
    pub fn is_tx_idle(&self) -> bool {
        self.tx_queue.is_empty() && !self.tx_active.load(Ordering::Acquire)
    }

    /// Busy-wait until every queued byte has been clocked out
    pub fn flush(&self) {
        while !self.is_tx_idle() {
            core::hint::spin_loop();
        }
    }

    // --- receive ---

    /// Number of received bytes ready to read
    pub fn available(&self) -> usize {
        self.rx_queue.count()
    }

    /// Check if no received bytes are waiting
    pub fn is_empty(&self) -> bool {
        self.rx_queue.is_empty()
    }

    /// Take the oldest received byte, or `None` if nothing is buffered
    pub fn read(&self) -> Option<u8> {
        self.rx_queue.try_pop()
    }

    /// Take the oldest received byte without checking `available()`
    ///
    /// # Safety
    ///
    /// `available()` must have reported at least one byte that has not been
    /// read since, and no other context may read concurrently.
    #[allow(unsafe_code)]
    pub unsafe fn read_unchecked(&self) -> u8 {
        // SAFETY: forwarded precondition; the RX handler only adds bytes
        unsafe { self.rx_queue.pop_unchecked() }
    }

    /// Copy buffered bytes into `buf`, returning how many were read
    pub fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        for slot in buf.iter_mut() {
            match self.rx_queue.try_pop() {
                Some(byte) => {
                    *slot = byte;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Drop every buffered received byte
    pub fn clear_rx(&self) -> usize {
        self.rx_queue.clear()
    }

    // --- diagnostics ---

    /// Snapshot of the link counters
    pub fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    /// Zero the link counters
    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    /// TX queue capacity
    pub const fn tx_capacity(&self) -> usize {
        TX
    }

    /// RX queue capacity
    pub const fn rx_capacity(&self) -> usize {
        RX
    }

    #[cfg(test)]
    pub(crate) fn inject_rx(&self, byte: u8) -> bool {
        self.rx_queue.try_push(byte)
    }
}
