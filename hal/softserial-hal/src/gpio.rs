//! GPIO pin abstractions
//!
//! The TX line is a plain push-pull output and the RX line a plain input.
//! Both are touched from the timer interrupt, so implementations must be
//! infallible and constant-time.

use core::convert::Infallible;

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1, line idle/mark)
    fn set_high(&mut self);

    /// Set the pin low (logic 0, space)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&mut self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&mut self) -> bool {
        !self.is_high()
    }
}

/// Adapter for `embedded-hal` 1.0 pins
///
/// Wraps any infallible `embedded_hal::digital` pin so it can be handed to
/// the engine. The last driven level is cached so `is_set_high` does not
/// need `StatefulOutputPin`.
#[derive(Debug)]
pub struct EmbeddedHalPin<P> {
    pin: P,
    level: bool,
}

impl<P> EmbeddedHalPin<P> {
    /// Wrap a pin; `level` is the level it is currently driving (ignored for inputs)
    pub const fn new(pin: P, level: bool) -> Self {
        Self { pin, level }
    }

    /// Return the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EmbeddedHalPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => {}
            Err(never) => match never {},
        }
        self.level = true;
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => {}
            Err(never) => match never {},
        }
        self.level = false;
    }

    fn is_set_high(&self) -> bool {
        self.level
    }
}

impl<P> InputPin for EmbeddedHalPin<P>
where
    P: embedded_hal::digital::InputPin<Error = Infallible>,
{
    fn is_high(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => high,
            Err(never) => match never {},
        }
    }
}
