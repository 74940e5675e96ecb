//! TIM3 as the two-channel bit timer
//!
//! The counter runs with prescaler 0 and ARR = 0xFFFF, so one tick is one
//! timer kernel clock cycle and compare arithmetic wraps exactly like
//! [`Ticks`].

use embassy_stm32::pac;
use embassy_stm32::pac::timer::{vals, TimGp16};
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::Timer;
use embassy_stm32::Peri;

use softserial_core::Driver;
use softserial_hal::{
    deadline_passed, CaptureCompareTimer, Channel, ClockReference, InputPin, OutputPin, Ticks,
};

const REGS: TimGp16 = pac::TIM3;

/// Register index of a logical channel (CH1 = 0, CH2 = 1)
const fn index(channel: Channel) -> usize {
    match channel {
        Channel::Tx => 0,
        Channel::Rx => 1,
    }
}

/// CCxS value selecting output compare
const CCS_OUTPUT: u8 = 0b00;

/// Jitter budget for `SerialConfig::min_ticks_per_bit` on this binding
///
/// With the APB prescaler at 1 the timer counts core clock cycles. One
/// TIM3 interrupt serving both channels back to back (entry latency,
/// several critical sections, a queue operation, a waker wake and the
/// register writes) is estimated at well under this many cycles on a
/// Cortex-M0. At the 8 MHz reset clock this allows up to 19200 baud.
pub const MIN_TICKS_PER_BIT: u16 = 400;

/// Clear one capture/compare flag without touching the others
///
/// Status flags are rc_w0: writing 1 leaves them as they are.
fn clear_flag(n: usize) {
    REGS.sr().write(|w| {
        w.0 = u32::MAX;
        w.set_ccif(n, false);
    });
}

/// TIM3 timer clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerClock(pub Hertz);

impl ClockReference for TimerClock {
    fn tick_rate_hz(&self) -> u32 {
        self.0 .0
    }
}

/// TIM3 CH1/CH2 driven as the softserial bit timer
pub struct Tim3Channels<'d> {
    timer: Timer<'d, TIM3>,
    /// CH2 currently configured for input capture
    rx_capture: bool,
}

impl<'d> Tim3Channels<'d> {
    /// Enable TIM3 and start it free-running
    ///
    /// Both channels are left disarmed until the engine schedules them.
    pub fn new(tim: Peri<'d, TIM3>) -> Self {
        let timer = Timer::new(tim);

        REGS.cr1().modify(|w| w.set_cen(false));
        REGS.psc().write_value(0);
        REGS.arr().write(|w| w.set_arr(u16::MAX));
        // Load the prescaler now rather than at the first overflow
        REGS.egr().write(|w| w.set_ug(true));
        REGS.dier().write(|_| {});
        REGS.sr().write(|_| {});
        REGS.cr1().modify(|w| w.set_cen(true));

        Self {
            timer,
            rx_capture: false,
        }
    }

    /// Counter clock, for bit timing
    pub fn clock(&self) -> TimerClock {
        TimerClock(self.timer.get_clock_frequency())
    }

    fn set_output_mode(&mut self, n: usize) {
        REGS.ccer().modify(|w| w.set_cce(n, false));
        REGS.ccmr_input(n / 2)
            .modify(|w| w.set_ccs(n % 2, vals::CcmrInputCcs::from_bits(CCS_OUTPUT)));
    }
}

impl CaptureCompareTimer for Tim3Channels<'_> {
    fn now(&self) -> Ticks {
        REGS.cnt().read().cnt()
    }

    fn schedule(&mut self, channel: Channel, at: Ticks) {
        let n = index(channel);
        if channel == Channel::Rx && self.rx_capture {
            self.set_output_mode(n);
            self.rx_capture = false;
        }
        REGS.ccr(n).write(|w| w.set_ccr(at));
        clear_flag(n);
        REGS.dier().modify(|w| w.set_ccie(n, true));

        // Handler ran late and the counter is already past the match:
        // raise the event by software instead of waiting for a wrap
        if deadline_passed(self.now(), at) {
            REGS.egr().write(|w| w.set_ccg(n, true));
        }
    }

    fn arm_falling_edge(&mut self, channel: Channel) {
        let n = index(channel);
        REGS.dier().modify(|w| w.set_ccie(n, false));
        // CCxS is only writable while the channel is off
        REGS.ccer().modify(|w| w.set_cce(n, false));
        REGS.ccmr_input(n / 2)
            .modify(|w| w.set_ccs(n % 2, vals::CcmrInputCcs::TI4));
        REGS.ccer().modify(|w| {
            w.set_ccp(n, true);
            w.set_ccnp(n, false);
            w.set_cce(n, true);
        });
        clear_flag(n);
        REGS.dier().modify(|w| w.set_ccie(n, true));
        if channel == Channel::Rx {
            self.rx_capture = true;
        }
    }

    fn captured(&self, channel: Channel) -> Ticks {
        REGS.ccr(index(channel)).read().ccr()
    }

    fn disarm(&mut self, channel: Channel) {
        let n = index(channel);
        REGS.dier().modify(|w| w.set_ccie(n, false));
        REGS.ccer().modify(|w| w.set_cce(n, false));
        clear_flag(n);
    }
}

/// TIM3 interrupt body
///
/// Call from the `TIM3` interrupt handler. TX is serviced first; both
/// channels share one vector so neither handler can preempt the other.
pub fn on_interrupt<TxP, RxP, const TX: usize, const RX: usize>(
    driver: &mut Driver<'_, Tim3Channels<'_>, TxP, RxP, TX, RX>,
) where
    TxP: OutputPin,
    RxP: InputPin,
{
    let sr = REGS.sr().read();
    let dier = REGS.dier().read();

    let tx = index(Channel::Tx);
    if sr.ccif(tx) && dier.ccie(tx) {
        clear_flag(tx);
        driver.on_tx_compare();
    }

    let rx = index(Channel::Rx);
    if sr.ccif(rx) && dier.ccie(rx) {
        clear_flag(rx);
        driver.on_rx_event();
    }
}
