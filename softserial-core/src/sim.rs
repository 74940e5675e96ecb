//! Host-side test bench
//!
//! Simulates a free-running 16-bit timer and both serial lines one tick
//! at a time, calling the driver's handlers when a compare value matches
//! or a falling edge is captured. Absolute time is kept in a `u64` so tests
//! can reason about it past the counter wrap.

use std::cell::RefCell;
use std::rc::Rc;

use softserial_hal::{CaptureCompareTimer, Channel, InputPin, OutputPin, Ticks};

use crate::engine::Driver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxMode {
    Off,
    Capture,
    Compare(Ticks),
}

pub(crate) struct Hw {
    pub now: u64,
    pub tx_level: bool,
    /// Every TX pin write as `(time, level)`
    pub tx_writes: Vec<(u64, bool)>,
    pub tx_compare: Option<Ticks>,
    pub rx_mode: RxMode,
    pub captured: Ticks,
    /// RX follows TX when set, otherwise follows `script`
    pub loopback: bool,
    /// RX line transitions as `(time, level)`, sorted by time
    pub script: Vec<(u64, bool)>,
    /// Time of every RX pin read
    pub samples: Vec<u64>,
    last_rx_level: bool,
}

impl Hw {
    fn rx_level(&self) -> bool {
        if self.loopback {
            return self.tx_level;
        }
        self.script
            .iter()
            .take_while(|(at, _)| *at <= self.now)
            .last()
            .map_or(true, |(_, level)| *level)
    }
}

pub(crate) type Shared = Rc<RefCell<Hw>>;

pub(crate) struct SimTimer(Shared);
pub(crate) struct SimTxPin(Shared);
pub(crate) struct SimRxPin(Shared);

impl CaptureCompareTimer for SimTimer {
    fn now(&self) -> Ticks {
        self.0.borrow().now as Ticks
    }

    fn schedule(&mut self, channel: Channel, at: Ticks) {
        let mut hw = self.0.borrow_mut();
        match channel {
            Channel::Tx => hw.tx_compare = Some(at),
            Channel::Rx => hw.rx_mode = RxMode::Compare(at),
        }
    }

    fn arm_falling_edge(&mut self, channel: Channel) {
        assert_eq!(channel, Channel::Rx);
        self.0.borrow_mut().rx_mode = RxMode::Capture;
    }

    fn captured(&self, channel: Channel) -> Ticks {
        assert_eq!(channel, Channel::Rx);
        self.0.borrow().captured
    }

    fn disarm(&mut self, channel: Channel) {
        let mut hw = self.0.borrow_mut();
        match channel {
            Channel::Tx => hw.tx_compare = None,
            Channel::Rx => hw.rx_mode = RxMode::Off,
        }
    }
}

impl OutputPin for SimTxPin {
    fn set_high(&mut self) {
        self.set_state(true);
    }

    fn set_low(&mut self) {
        self.set_state(false);
    }

    fn set_state(&mut self, high: bool) {
        let mut hw = self.0.borrow_mut();
        hw.tx_level = high;
        let now = hw.now;
        hw.tx_writes.push((now, high));
    }

    fn is_set_high(&self) -> bool {
        self.0.borrow().tx_level
    }
}

impl InputPin for SimRxPin {
    fn is_high(&mut self) -> bool {
        let mut hw = self.0.borrow_mut();
        let now = hw.now;
        hw.samples.push(now);
        hw.rx_level()
    }
}

pub(crate) struct Bench {
    pub hw: Shared,
}

type SimDriver<'a, const TX: usize, const RX: usize> = Driver<'a, SimTimer, SimTxPin, SimRxPin, TX, RX>;

impl Bench {
    fn new(loopback: bool) -> Self {
        Self {
            hw: Rc::new(RefCell::new(Hw {
                now: 0,
                tx_level: true,
                tx_writes: Vec::new(),
                tx_compare: None,
                rx_mode: RxMode::Off,
                captured: 0,
                loopback,
                script: Vec::new(),
                samples: Vec::new(),
                last_rx_level: true,
            })),
        }
    }

    /// RX wired to TX
    pub fn loopback() -> Self {
        Self::new(true)
    }

    /// RX driven only by injected frames
    pub fn scripted() -> Self {
        Self::new(false)
    }

    pub fn parts(&self) -> (SimTimer, SimTxPin, SimRxPin) {
        (
            SimTimer(self.hw.clone()),
            SimTxPin(self.hw.clone()),
            SimRxPin(self.hw.clone()),
        )
    }

    pub fn clear_log(&self) {
        let mut hw = self.hw.borrow_mut();
        hw.tx_writes.clear();
        hw.samples.clear();
    }

    /// Schedule one frame on the RX line starting at `at`
    pub fn inject_frame(&self, at: u64, byte: u8, data_bits: u8, stop_high: bool, ticks_per_bit: u64) {
        let mut hw = self.hw.borrow_mut();
        hw.script.push((at, false));
        for bit in 0..data_bits {
            let level = (byte >> bit) & 1 != 0;
            hw.script.push((at + (u64::from(bit) + 1) * ticks_per_bit, level));
        }
        let stop_at = at + (u64::from(data_bits) + 1) * ticks_per_bit;
        hw.script.push((stop_at, stop_high));
        hw.script.push((stop_at + ticks_per_bit, true));
        hw.script.sort_by_key(|(time, _)| *time);
    }

    /// Pull RX low for `width` ticks
    pub fn inject_pulse(&self, at: u64, width: u64) {
        let mut hw = self.hw.borrow_mut();
        hw.script.push((at, false));
        hw.script.push((at + width, true));
        hw.script.sort_by_key(|(time, _)| *time);
    }

    /// Advance one timer tick, TX channel first
    pub fn step<const TX: usize, const RX: usize>(&self, driver: &mut SimDriver<'_, TX, RX>) {
        let (tx_due, now) = {
            let mut hw = self.hw.borrow_mut();
            hw.now += 1;
            let now = hw.now as Ticks;
            (hw.tx_compare == Some(now), now)
        };
        if tx_due {
            driver.on_tx_compare();
        }

        let rx_due = {
            let mut hw = self.hw.borrow_mut();
            let level = hw.rx_level();
            let fell = hw.last_rx_level && !level;
            hw.last_rx_level = level;
            match hw.rx_mode {
                RxMode::Capture if fell => {
                    hw.captured = now;
                    true
                }
                RxMode::Compare(at) => at == now,
                _ => false,
            }
        };
        if rx_due {
            driver.on_rx_event();
        }
    }

    pub fn run<const TX: usize, const RX: usize>(&self, driver: &mut SimDriver<'_, TX, RX>, ticks: u64) {
        for _ in 0..ticks {
            self.step(driver);
        }
    }

    /// Step until `done` holds, giving up after `ticks`
    pub fn run_until<const TX: usize, const RX: usize>(
        &self,
        driver: &mut SimDriver<'_, TX, RX>,
        ticks: u64,
        mut done: impl FnMut() -> bool,
    ) -> bool {
        for _ in 0..ticks {
            if done() {
                return true;
            }
            self.step(driver);
        }
        done()
    }
}
