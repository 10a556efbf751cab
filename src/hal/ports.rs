//! A simple abstraction over the basic port IO.
//!
//! Allows the user to handle the three registers on each port as a single unit, as well as
//! providing more meaningful names to the operations. [`Pin`] wraps a single pin up as an
//! `embedded-hal` digital pin so the board-independent code can drive it.
//!
//! Only ports B and C are wired to anything on the Toadstool that we use.

use crate::hal::register::{Bits, Register};
use core::{convert::Infallible, marker::PhantomData};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

pub mod registers {
    reg! {
        /// Port B Input Pins Register
        PINB {
            addr: 0x23,
            write mask: 0xFF,
        }
    }
    reg! {
        /// Port B Data Direction Register
        DDRB {
            addr: 0x24,
            write mask: 0xFF,
        }
    }
    reg! {
        /// Port B Data Register
        PORTB {
            addr: 0x25,
            write mask: 0xFF,
        }
    }

    reg! {
        /// Port C Input Pins Register
        PINC {
            addr: 0x26,
            write mask: 0x7F,
        }
    }
    reg! {
        /// Port C Data Direction Register
        DDRC {
            addr: 0x27,
            write mask: 0x7F,
        }
    }
    reg! {
        /// Port C Data Register
        PORTC {
            addr: 0x28,
            write mask: 0x7F,
        }
    }
}
use registers::*;

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum PinMode {
    Output,
    Input,
    InputPullup,
}

// The three registers of a port share their bit layout, so the pins are one enum per port rather
// than bit constants on each register.
pub trait PortBit {
    fn bit(&self) -> u8;
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum PortBPins {
    PB0,
    PB1,
    PB2,
    PB3,
    PB4,
    PB5,
    PB6,
    PB7,
}

impl PortBit for PortBPins {
    fn bit(&self) -> u8 {
        *self as u8
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
pub enum PortCPins {
    PC0,
    PC1,
    PC2,
    PC3,
    PC4,
    PC5,
    PC6,
}

impl PortBit for PortCPins {
    fn bit(&self) -> u8 {
        *self as u8
    }
}

fn mask<R>(pin: impl PortBit) -> Bits<R> {
    Bits::from_raw(1 << pin.bit())
}

/// Shared behaviour of the ports.
pub trait Port {
    type ValidPins: PortBit + Copy;
    type PORT: Register;
    type DDR: Register;
    type PIN: Register;

    /// Sets the DDR and PORT registers to the appropriate values for the given pin mode.
    ///
    /// Does not alter the PORT value when set to Output.
    fn set_pin_mode(pin: Self::ValidPins, mode: PinMode) {
        unsafe {
            match mode {
                PinMode::Output => {
                    Self::DDR::set_bits(mask(pin));
                }
                PinMode::Input => {
                    Self::DDR::clear_bits(mask(pin));
                    Self::PORT::clear_bits(mask(pin));
                }
                PinMode::InputPullup => {
                    Self::DDR::clear_bits(mask(pin));
                    Self::PORT::set_bits(mask(pin));
                }
            }
        }
    }

    /// In Output mode, drives the pin high; in Input mode, enables the internal pullup.
    fn set_port_high(pin: Self::ValidPins) {
        unsafe { Self::PORT::set_bits(mask(pin)) }
    }

    /// In Output mode, pulls the pin low; in Input mode, disables the internal pullup.
    fn set_port_low(pin: Self::ValidPins) {
        unsafe { Self::PORT::clear_bits(mask(pin)) }
    }

    /// What the PORT register is driving, as opposed to the level on the pin.
    fn get_port_state(pin: Self::ValidPins) -> bool {
        unsafe { Self::PORT::is_set(mask(pin)) }
    }

    /// Writing a 1 to the PIN register toggles the PORT bit.
    fn set_pin_toggle(pin: Self::ValidPins) {
        // Not set_bits: a read-modify-write would toggle every other pin that's currently high.
        unsafe { Self::PIN::set_raw_value(1 << pin.bit()) }
    }

    /// Reads from the PIN register, returning the current state of the pin.
    fn get_pin_state(pin: Self::ValidPins) -> bool {
        unsafe { Self::PIN::is_set(mask(pin)) }
    }
}

pub struct PortB;
impl Port for PortB {
    type PORT = PORTB;
    type PIN = PINB;
    type DDR = DDRB;
    type ValidPins = PortBPins;
}

impl PortB {
    pub const PB0: PortBPins = PortBPins::PB0;
    pub const PB1: PortBPins = PortBPins::PB1;
    pub const PB2: PortBPins = PortBPins::PB2;
    pub const PB3: PortBPins = PortBPins::PB3;
    pub const PB4: PortBPins = PortBPins::PB4;
    pub const PB5: PortBPins = PortBPins::PB5;
    pub const PB6: PortBPins = PortBPins::PB6;
    pub const PB7: PortBPins = PortBPins::PB7;
}

pub struct PortC;
impl Port for PortC {
    type PORT = PORTC;
    type PIN = PINC;
    type DDR = DDRC;
    type ValidPins = PortCPins;
}

impl PortC {
    pub const PC0: PortCPins = PortCPins::PC0;
    pub const PC1: PortCPins = PortCPins::PC1;
    pub const PC2: PortCPins = PortCPins::PC2;
    pub const PC3: PortCPins = PortCPins::PC3;
    pub const PC4: PortCPins = PortCPins::PC4;
    pub const PC5: PortCPins = PortCPins::PC5;
    pub const PC6: PortCPins = PortCPins::PC6;
}

/// One configured pin of port `P`.
pub struct Pin<P: Port> {
    pin: P::ValidPins,
    _port: PhantomData<P>,
}

impl<P: Port> Pin<P> {
    pub fn new(pin: P::ValidPins, mode: PinMode) -> Pin<P> {
        P::set_pin_mode(pin, mode);
        Pin {
            pin,
            _port: PhantomData,
        }
    }

    /// An output, starting low.
    pub fn output(pin: P::ValidPins) -> Pin<P> {
        P::set_port_low(pin);
        Pin::new(pin, PinMode::Output)
    }

    pub fn input_pullup(pin: P::ValidPins) -> Pin<P> {
        Pin::new(pin, PinMode::InputPullup)
    }
}

impl<P: Port> ErrorType for Pin<P> {
    type Error = Infallible;
}

impl<P: Port> InputPin for Pin<P> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(P::get_pin_state(self.pin))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!P::get_pin_state(self.pin))
    }
}

impl<P: Port> OutputPin for Pin<P> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        P::set_port_low(self.pin);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        P::set_port_high(self.pin);
        Ok(())
    }
}

impl<P: Port> StatefulOutputPin for Pin<P> {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(P::get_port_state(self.pin))
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!P::get_port_state(self.pin))
    }

    fn toggle(&mut self) -> Result<(), Infallible> {
        P::set_pin_toggle(self.pin);
        Ok(())
    }
}
