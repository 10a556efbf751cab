//! A basic transmit-only USART, for logging to a host PC.

use crate::{config::CPU_FREQ, hal::register::Register};
use core::{convert::Infallible, marker::PhantomData};
use ufmt::{derive::uDebug, uWrite};

pub mod registers {
    reg! {
        /// USART 0 Control and Status Register A
        UCSR0A {
            addr: 0xC0,
            write mask: 0b0100_0011,
            bits: {
                /// USART 0 Multi-processor Communication Mode
                MPCM0 = 0;
                /// USART 0 Double Transmission Speed
                U2X0 = 1;
                /// USART 0 Data Register Empty
                UDRE0 = 5;
                /// USART 0 Transmit Complete
                TXC0 = 6;
            }
        }
    }

    reg! {
        /// USART 0 Control and Status Register B
        UCSR0B {
            addr: 0xC1,
            write mask: 0b1111_1101,
            bits: {
                /// USART 0 Transmitter Enable
                TXEN0 = 3;
                /// USART 0 Receiver Enable
                RXEN0 = 4;
            }
        }
    }

    reg! {
        /// USART 0 Control and Status Register C
        UCSR0C {
            addr: 0xC2,
            write mask: 0xFF,
            bits: {
                /// USART 0 Character Size - Bit 0
                UCSZ00 = 1;
                /// USART 0 Character Size - Bit 1
                UCSZ01 = 2;
            }
        }
    }

    reg! {
        /// USART 0 Baud Rate Register, Low Byte
        UBRR0L {
            addr: 0xC4,
            write mask: 0xFF,
        }
    }
    reg! {
        /// USART 0 Baud Rate Register, High Byte
        UBRR0H {
            addr: 0xC5,
            write mask: 0x0F,
        }
    }

    reg! {
        /// USART 0 I/O Data Register
        UDR0 {
            addr: 0xC6,
            write mask: 0xFF,
        }
    }
}
use registers::*;

/// The UBRR value for `baud` in double speed mode.
pub const fn baud_divider(baud: u32) -> u16 {
    ((CPU_FREQ / 8 / baud) - 1) as u16
}

static mut HAS_INIT: bool = false;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum UsartError {
    InitError,
}

/// Sends data synchronously, and is intended for logging.
/// Configured for:
/// * 8-bit characters
/// * 1 stop bit
/// * No parity bit
///
/// Only one instance can live at a time.
pub struct Usart(PhantomData<()>);

impl Usart {
    pub fn init(baud: u32) -> Result<Usart, UsartError> {
        let [high, low] = baud_divider(baud).to_be_bytes();

        unsafe {
            if HAS_INIT {
                return Err(UsartError::InitError);
            }

            UBRR0H::set_raw_value(high);
            UBRR0L::set_raw_value(low);

            UCSR0A::set_value(UCSR0A::U2X0);
            UCSR0B::set_value(UCSR0B::TXEN0);
            UCSR0C::set_value(UCSR0C::UCSZ01 | UCSR0C::UCSZ00);

            HAS_INIT = true;
        }

        Ok(Usart(PhantomData))
    }

    pub fn send_byte(&mut self, data: u8) {
        unsafe {
            while !UCSR0A::is_set(UCSR0A::UDRE0) {}

            UDR0::set_raw_value(data);
        }
    }
}

impl uWrite for Usart {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        s.bytes().for_each(|b| self.send_byte(b));
        Ok(())
    }
}

impl Drop for Usart {
    fn drop(&mut self) {
        unsafe {
            UCSR0B::clear_bits(UCSR0B::TXEN0 | UCSR0B::RXEN0);
            HAS_INIT = false;
        }
    }
}
