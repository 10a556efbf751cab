//! A polled, master-only driver for the TWI.
//!
//! Each bus primitive writes TWCR and then busy-waits on TWINT, so everything here blocks for
//! as long as the hardware takes. The exception is the stop condition: TWINT is not set after a
//! stop, so we hand it to the hardware and return.

use crate::{
    bus::{Bus, ClockDivider, Status},
    config::CPU_FREQ,
    hal::{
        ports::{PinMode, Port, PortC},
        register::{Bits, Register},
    },
};
use core::marker::PhantomData;
use ufmt::derive::uDebug;

pub mod registers {
    reg! {
        /// TWI Bit Rate Register
        TWBR {
            addr: 0xB8,
            write mask: 0xFF,
        }
    }

    reg! {
        /// TWI Status Register
        ///
        /// The top five bits are the status code and are read only.
        TWSR {
            addr: 0xB9,
            write mask: 0b0000_0011,
            bits: {
                /// TWI Prescaler - Bit 0
                TWPS0 = 0;
                /// TWI Prescaler - Bit 1
                TWPS1 = 1;
            }
        }
    }

    reg! {
        /// TWI Data Register
        TWDR {
            addr: 0xBB,
            write mask: 0xFF,
        }
    }

    reg! {
        /// TWI Control Register
        TWCR {
            addr: 0xBC,
            write mask: 0b1111_0101,
            bits: {
                /// TWI Interrupt Enable
                TWIE = 0;
                /// TWI Enable
                TWEN = 2;
                /// TWI Write Collision Flag
                TWWC = 3;
                /// TWI STOP Condition
                TWSTO = 4;
                /// TWI START Condition
                TWSTA = 5;
                /// TWI Enable Acknowledge
                TWEA = 6;
                /// TWI Interrupt Flag
                TWINT = 7;
            }
        }
    }
}
use registers::*;

static mut HAS_INIT: bool = false;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum TwiError {
    InitError,
    /// A bus speed of zero.
    InvalidSpeed,
}

/// The TWI module in master mode. Only one instance can live at a time.
pub struct Twi {
    divider: ClockDivider,
    _p: PhantomData<()>,
}

impl Twi {
    /// Enables the TWI module clocked at `speed_khz`.
    /// Sets the SDA and SCL pins to input, and enables the internal pullups.
    pub fn init(speed_khz: u16) -> Result<Twi, TwiError> {
        let divider =
            ClockDivider::for_speed(CPU_FREQ, speed_khz).ok_or(TwiError::InvalidSpeed)?;

        unsafe {
            if HAS_INIT {
                return Err(TwiError::InitError);
            }
            HAS_INIT = true;

            PortC::set_pin_mode(PortC::PC4, PinMode::InputPullup);
            PortC::set_pin_mode(PortC::PC5, PinMode::InputPullup);

            TWSR::replace_bits(
                TWSR::TWPS0 | TWSR::TWPS1,
                Bits::from_raw(divider.prescaler.bits()),
            );
            TWBR::set_raw_value(divider.bit_rate);

            TWCR::set_value(TWCR::TWEN);

            Ok(Twi {
                divider,
                _p: PhantomData,
            })
        }
    }

    /// The SCL frequency actually achieved, in Hz.
    pub fn scl_frequency(&self) -> u32 {
        self.divider.scl_frequency(CPU_FREQ)
    }

    /// Kicks off the operation in `bits` and waits for the hardware to finish it.
    fn run(bits: Bits<TWCR>) -> Status {
        unsafe {
            TWCR::set_value(bits | TWCR::TWINT | TWCR::TWEN);
            while !TWCR::is_set(TWCR::TWINT) {}

            Status::from_raw(TWSR::get_value())
        }
    }
}

impl Bus for Twi {
    fn start(&mut self) -> Status {
        Twi::run(TWCR::TWSTA)
    }

    fn write_byte(&mut self, byte: u8) -> Status {
        unsafe {
            TWDR::set_raw_value(byte);
        }
        Twi::run(Bits::none())
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, Status> {
        let (bits, expected) = if ack {
            (TWCR::TWEA, Status::MrDataAck)
        } else {
            (Bits::none(), Status::MrDataNack)
        };

        let status = Twi::run(bits);
        if status == expected {
            Ok(unsafe { TWDR::get_value() })
        } else {
            Err(status)
        }
    }

    fn stop(&mut self) {
        unsafe {
            TWCR::set_value(TWCR::TWINT | TWCR::TWEN | TWCR::TWSTO);
        }
    }
}

impl Drop for Twi {
    fn drop(&mut self) {
        unsafe {
            TWCR::clear_bits(TWCR::TWEN | TWCR::TWEA | TWCR::TWIE);
            PortC::set_pin_mode(PortC::PC4, PinMode::Input);
            PortC::set_pin_mode(PortC::PC5, PinMode::Input);
            HAS_INIT = false;
        }
    }
}
