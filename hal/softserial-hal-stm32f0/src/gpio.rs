//! TX and RX lines for STM32F0

use embassy_stm32::gpio::{Input, Output, Pull};
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals;
use embassy_stm32::peripherals::PA7;
use embassy_stm32::Peri;

use softserial_hal::{InputPin, OutputPin};

/// PA7 pin index within GPIOA
const RX_PIN: usize = 7;
/// Alternate function routing PA7 to TIM3_CH2
const RX_AF_TIM3: u8 = 1;

/// TX line: a plain push-pull output driven from the timer interrupt
pub struct TxLine<'d> {
    pin: Output<'d>,
}

impl<'d> TxLine<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self { pin }
    }
}

impl OutputPin for TxLine<'_> {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.pin.is_set_high()
    }
}

/// RX line on PA7, routed to TIM3 CH2 for edge capture
///
/// The pin stays in alternate-function mode so the timer sees every edge;
/// sampling reads the input data register, which tracks the pad in any mode.
pub struct RxLine<'d> {
    pin: Input<'d>,
}

impl<'d> RxLine<'d> {
    pub fn new(pin: Peri<'d, PA7>) -> Self {
        // Pull-up keeps an unconnected line at idle/mark
        let pin = Input::new(pin, Pull::Up);

        let gpio = pac::GPIOA;
        gpio.afr(RX_PIN / 8)
            .modify(|w| w.set_afr(RX_PIN % 8, RX_AF_TIM3));
        gpio.moder()
            .modify(|w| w.set_moder(RX_PIN, vals::Moder::ALTERNATE));

        Self { pin }
    }
}

impl InputPin for RxLine<'_> {
    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}
