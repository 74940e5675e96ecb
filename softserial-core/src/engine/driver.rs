//! Interrupt-side half of the engine
//!
//! Both handlers do a bounded, nearly constant amount of work: one state
//! machine step, at most one pin access, one queue operation and one
//! compare reschedule. The pin is touched first so handler entry latency is
//! the only source of bit-edge jitter.

use portable_atomic::Ordering;

use softserial_hal::{CaptureCompareTimer, Channel, InputPin, OutputPin, Ticks};

use super::SoftSerial;
use crate::config::BitTiming;
use crate::rx::{Receiver, RxOutcome};
use crate::stats::LinkFault;
use crate::tx::{Transmitter, TxState, TxStep};

/// Timer, pins and frame state owned by the timer interrupt
pub struct Driver<'a, T, TxP, RxP, const TX: usize, const RX: usize> {
    serial: &'a SoftSerial<TX, RX>,
    timer: T,
    tx_pin: TxP,
    rx_pin: RxP,
    timing: BitTiming,
    transmitter: Transmitter,
    receiver: Receiver,
    /// Compare value of the TX tick currently armed
    tx_deadline: Ticks,
    /// Compare value of the RX sample currently armed
    rx_deadline: Ticks,
}

impl<'a, T, TxP, RxP, const TX: usize, const RX: usize> Driver<'a, T, TxP, RxP, TX, RX>
where
    T: CaptureCompareTimer,
    TxP: OutputPin,
    RxP: InputPin,
{
    pub(super) fn new(
        serial: &'a SoftSerial<TX, RX>,
        timer: T,
        tx_pin: TxP,
        rx_pin: RxP,
        timing: BitTiming,
        tx_deadline: Ticks,
    ) -> Self {
        Self {
            serial,
            timer,
            tx_pin,
            rx_pin,
            timing,
            transmitter: Transmitter::new(timing.data_bits),
            receiver: Receiver::new(timing.data_bits),
            tx_deadline,
            rx_deadline: 0,
        }
    }

    /// Bit timing this driver runs at
    pub fn timing(&self) -> &BitTiming {
        &self.timing
    }

    /// Current transmit state
    pub fn tx_state(&self) -> TxState {
        self.transmitter.state()
    }

    /// Check if the receiver is waiting for a start bit
    pub fn is_listening(&self) -> bool {
        self.receiver.is_listening()
    }

    /// TX channel compare handler, called once per bit period
    pub fn on_tx_compare(&mut self) {
        let serial = self.serial;
        let finishing = self.transmitter.state() == TxState::Stop;
        let starting = self.transmitter.is_idle();

        match self.transmitter.tick(|| serial.tx_queue.try_pop()) {
            TxStep::Drive(level) => {
                self.tx_pin.set_state(level);
                if starting {
                    serial.tx_active.store(true, Ordering::Release);
                    serial.tx_waker.wake();
                }
                if finishing {
                    serial.counters.frame_sent();
                }
            }
            TxStep::Hold => {
                if serial.tx_active.swap(false, Ordering::AcqRel) {
                    // Stop bit has fully left the wire
                    serial.tx_waker.wake();
                }
            }
        }

        self.tx_deadline = self.tx_deadline.wrapping_add(self.timing.ticks_per_bit);
        self.timer.schedule(Channel::Tx, self.tx_deadline);
    }

    /// RX channel handler: start-bit capture while listening, bit-center
    /// sample otherwise
    pub fn on_rx_event(&mut self) {
        if self.receiver.is_listening() {
            let edge = self.timer.captured(Channel::Rx);
            if self.receiver.on_edge() {
                self.rx_deadline = edge.wrapping_add(self.timing.half_bit_ticks);
                self.timer.schedule(Channel::Rx, self.rx_deadline);
            }
            return;
        }

        let high = self.rx_pin.is_high();
        match self.receiver.on_sample(high) {
            RxOutcome::Pending => {
                self.rx_deadline = self.rx_deadline.wrapping_add(self.timing.ticks_per_bit);
                self.timer.schedule(Channel::Rx, self.rx_deadline);
            }
            RxOutcome::Byte(byte) => {
                let serial = self.serial;
                if serial.rx_queue.try_push(byte) {
                    serial.counters.frame_received();
                    serial.rx_waker.wake();
                } else {
                    serial.counters.fault(LinkFault::Overrun);
                }
                self.timer.arm_falling_edge(Channel::Rx);
            }
            RxOutcome::Fault(fault) => {
                self.serial.counters.fault(fault);
                self.timer.arm_falling_edge(Channel::Rx);
            }
        }
    }

    /// Stop both channels and hand the peripherals back
    ///
    /// Bytes still queued stay queued; the port may be initialized again.
    pub fn release(mut self) -> (T, TxP, RxP) {
        self.timer.disarm(Channel::Tx);
        self.timer.disarm(Channel::Rx);
        self.tx_pin.set_high();

        let serial = self.serial;
        serial.tx_active.store(false, Ordering::Release);
        serial.timing.lock(|cell| cell.set(None));
        serial.initialized.store(false, Ordering::Release);
        serial.tx_waker.wake();

        (self.timer, self.tx_pin, self.rx_pin)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SerialConfig;
    use crate::engine::SoftSerial;
    use crate::error::Error;
    use crate::sim::{Bench, RxMode};
    use crate::tx::TxState;
    use proptest::prelude::*;
    use softserial_hal::{DataBits, FixedClock};

    const CLOCK: FixedClock = FixedClock(1_000_000);
    /// 100 ticks per bit, 1000 ticks per 8-N-1 frame
    const BAUD: u32 = 10_000;
    const TPB: u64 = 100;

    #[test]
    fn test_idle_ticks_do_not_touch_pin() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();
        bench.clear_log();

        bench.run(&mut driver, 10 * TPB);
        assert!(bench.hw.borrow().tx_writes.is_empty());
        assert!(serial.is_tx_idle());
    }

    #[test]
    fn test_one_pin_write_per_busy_tick() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();
        bench.clear_log();

        serial.try_transmit(0x00).unwrap();
        bench.run(&mut driver, 15 * TPB);

        let hw = bench.hw.borrow();
        assert_eq!(hw.tx_writes.len(), 10);
        // Writes are exactly one bit period apart
        for pair in hw.tx_writes.windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, TPB);
        }
        assert!(!hw.tx_writes[0].1);
        assert!(hw.tx_writes[9].1);
    }

    #[test]
    fn test_loopback_single_byte() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        serial.try_transmit(b'Z').unwrap();
        assert!(bench.run_until(&mut driver, 20 * TPB, || serial.available() > 0));
        assert_eq!(serial.read(), Some(b'Z'));

        let stats = serial.stats();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.faults(), 0);

        // Let the stop bit finish
        bench.run(&mut driver, 2 * TPB);
        assert_eq!(serial.stats().frames_sent, 1);
        assert!(serial.is_tx_idle());
    }

    #[test]
    fn test_samples_at_bit_cell_centers() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();
        bench.clear_log();

        serial.try_transmit(0x96).unwrap();
        assert!(bench.run_until(&mut driver, 20 * TPB, || serial.available() > 0));

        let hw = bench.hw.borrow();
        let t0 = hw.tx_writes[0].0;
        assert_eq!(hw.samples.len(), 10);
        for (cell, &at) in hw.samples.iter().enumerate() {
            let expected = t0 + TPB / 2 + cell as u64 * TPB;
            assert!(at.abs_diff(expected) <= 1, "cell {} sampled at {}", cell, at);
        }
    }

    #[test]
    fn test_framing_error_not_delivered() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::scripted();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        bench.inject_frame(200, 0x3C, 8, false, TPB);
        bench.inject_frame(1500, 0x3D, 8, true, TPB);
        bench.run(&mut driver, 3000);

        assert_eq!(serial.read(), Some(0x3D));
        assert_eq!(serial.read(), None);
        let stats = serial.stats();
        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.frames_received, 1);
        assert!(driver.is_listening());
    }

    #[test]
    fn test_glitch_is_false_start() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::scripted();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        // 10-tick low pulse, gone by the start-bit center
        bench.inject_pulse(300, 10);
        bench.run(&mut driver, 1000);

        assert_eq!(serial.available(), 0);
        assert_eq!(serial.stats().false_starts, 1);
        assert_eq!(bench.hw.borrow().rx_mode, RxMode::Capture);
    }

    #[test]
    fn test_overrun_drops_newest() {
        let serial: SoftSerial<16, 2> = SoftSerial::new();
        let bench = Bench::scripted();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        for (i, byte) in [0x01u8, 0x02, 0x03].iter().enumerate() {
            bench.inject_frame(100 + i as u64 * 1200, *byte, 8, true, TPB);
        }
        bench.run(&mut driver, 4000);

        assert_eq!(serial.available(), 2);
        assert_eq!(serial.read(), Some(0x01));
        assert_eq!(serial.read(), Some(0x02));
        assert_eq!(serial.read(), None);
        assert_eq!(serial.stats().overruns, 1);
    }

    #[test]
    fn test_rx_survives_counter_wrap() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::scripted();
        bench.hw.borrow_mut().now = 0xFF00;
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        // Frame straddles the 16-bit counter wrap
        bench.inject_frame(0xFF80, 0xC3, 8, true, TPB);
        bench.run(&mut driver, 2000);

        assert_eq!(serial.read(), Some(0xC3));
    }

    #[test]
    fn test_tolerates_sender_clock_mismatch() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::scripted();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        // Sender 3 % slow and 3 % fast
        bench.inject_frame(100, 0x5A, 8, true, 103);
        bench.inject_frame(1500, 0xA5, 8, true, 97);
        bench.run(&mut driver, 3000);

        assert_eq!(serial.read(), Some(0x5A));
        assert_eq!(serial.read(), Some(0xA5));
    }

    #[test]
    fn test_release_disarms() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        let (timer, tx, rx) = driver.release();
        assert!(!serial.is_initialized());
        {
            let hw = bench.hw.borrow();
            assert_eq!(hw.tx_compare, None);
            assert_eq!(hw.rx_mode, RxMode::Off);
        }

        // Can be brought up again
        assert!(serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .is_ok());
    }

    #[test]
    fn test_tx_queue_full_then_drains() {
        let serial: SoftSerial<4, 16> = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        for byte in b"wxyz" {
            serial.try_transmit(*byte).unwrap();
        }
        assert_eq!(serial.try_transmit(b'!'), Err(Error::QueueFull));

        // First byte leaves the queue at the first busy tick
        bench.run(&mut driver, TPB);
        assert_eq!(serial.try_transmit(b'!'), Ok(()));

        assert!(bench.run_until(&mut driver, 60 * TPB, || serial.available() == 5));
        let mut buf = [0u8; 5];
        assert_eq!(serial.read_into(&mut buf), 5);
        assert_eq!(&buf, b"wxyz!");
    }

    #[test]
    fn test_full_duplex_stress() {
        let serial: SoftSerial<8, 64> = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let mut driver = serial
            .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
            .unwrap();

        let message: heapless::Vec<u8, 48> = (0..48u8).map(|i| i.wrapping_mul(37)).collect();
        let mut sent = 0;
        let mut received: heapless::Vec<u8, 48> = heapless::Vec::new();

        for _ in 0..(60 * 10 * TPB) {
            if sent < message.len() && serial.try_transmit(message[sent]).is_ok() {
                sent += 1;
            }
            bench.step(&mut driver);
            while let Some(byte) = serial.read() {
                received.push(byte).unwrap();
            }
            if received.len() == message.len() {
                break;
            }
        }

        assert_eq!(received, message);
        assert_eq!(serial.stats().faults(), 0);
    }

    #[test]
    fn test_9600_delivers_within_one_frame_of_start_bit() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let clock = FixedClock(16_000_000);
        let mut driver = serial
            .init(timer, tx, rx, &clock, &SerialConfig::default())
            .unwrap();
        bench.clear_log();
        let frame = u64::from(driver.timing().frame_ticks());
        let tpb = u64::from(driver.timing().ticks_per_bit);

        serial.try_transmit(b'A').unwrap();
        assert_eq!(driver.tx_state(), TxState::Idle);

        // The free-running TX tick picks the byte up within one bit period
        assert!(bench.run_until(&mut driver, tpb, || !bench.hw.borrow().tx_writes.is_empty()));
        let (start, level) = bench.hw.borrow().tx_writes[0];
        assert!(!level);
        assert_eq!(driver.tx_state(), TxState::Data { byte: b'A', bit: 0 });

        assert!(bench.run_until(&mut driver, frame, || serial.available() == 1));
        assert!(bench.hw.borrow().now - start <= frame);
        assert_eq!(serial.read(), Some(b'A'));
        assert_eq!(serial.available(), 0);
    }

    #[test]
    fn test_seven_data_bits() {
        let serial: SoftSerial = SoftSerial::new();
        let bench = Bench::loopback();
        let (timer, tx, rx) = bench.parts();
        let config = SerialConfig::with_baud(BAUD).data_bits(DataBits::Seven);
        let mut driver = serial.init(timer, tx, rx, &CLOCK, &config).unwrap();

        serial.try_transmit(0xFF).unwrap();
        assert!(bench.run_until(&mut driver, 20 * TPB, || serial.available() > 0));
        assert_eq!(serial.read(), Some(0xFF & DataBits::Seven.mask()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_loopback_round_trip(bytes in prop::collection::vec(any::<u8>(), 1..12)) {
            let serial: SoftSerial<16, 16> = SoftSerial::new();
            let bench = Bench::loopback();
            let (timer, tx, rx) = bench.parts();
            let mut driver = serial
                .init(timer, tx, rx, &CLOCK, &SerialConfig::with_baud(BAUD))
                .unwrap();

            for byte in &bytes {
                prop_assert!(serial.try_transmit(*byte).is_ok());
            }
            let budget = (bytes.len() as u64 + 2) * 10 * TPB;
            prop_assert!(bench.run_until(&mut driver, budget, || serial.available() == bytes.len()));

            let mut out = std::vec![0u8; bytes.len()];
            prop_assert_eq!(serial.read_into(&mut out), bytes.len());
            prop_assert_eq!(out, bytes);
            prop_assert_eq!(serial.stats().faults(), 0);
        }
    }
}
