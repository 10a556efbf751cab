//! The periodic tick, driven from Timer1.
//!
//! The timer is configured for Clear Timer on Compare Match mode (CTC) with a /1024 prescaler
//! and has the OCR1A match interrupt enabled. When TCNT1 reaches OCR1A the handler raises
//! [`TICK`], and TCNT1 goes back to zero.
//!
//! At 16MHz that's 15625 counts a second, so a 100ms tick is a compare value of 1562.

use crate::{
    hal::register::Register,
    tick::{compare_value, PendingTick, TickControl},
};
use core::marker::PhantomData;
use ufmt::derive::uDebug;

pub mod registers {
    reg! {
        /// Timer/Counter 1 Interrupt Mask Register
        TIMSK1 {
            addr: 0x6F,
            write mask: 0b0010_0111,
            bits: {
                /// Timer/Counter 1 Overflow Interrupt Enable
                TOIE1 = 0;
                /// Timer/Counter 1 Output Compare A Match Interrupt Enable
                OCIE1A = 1;
                /// Timer/Counter 1 Output Compare B Match Interrupt Enable
                OCIE1B = 2;
                /// Timer/Counter 1 Input Capture Interrupt Enable
                ICIE1 = 5;
            }
        }
    }

    reg! {
        /// Timer/Counter 1 Control Register A
        TCCR1A {
            addr: 0x80,
            write mask: 0b1111_0011,
            bits: {
                /// Timer/Counter 1 Waveform Generation Mode - Bit 0
                WGM10 = 0;
                /// Timer/Counter 1 Waveform Generation Mode - Bit 1
                WGM11 = 1;
            }
        }
    }

    reg! {
        /// Timer/Counter 1 Control Register B
        TCCR1B {
            addr: 0x81,
            write mask: 0b1101_1111,
            bits: {
                /// Timer/Counter 1 Clock Select - Bit 0
                CS10 = 0;
                /// Timer/Counter 1 Clock Select - Bit 1
                CS11 = 1;
                /// Timer/Counter 1 Clock Select - Bit 2
                CS12 = 2;
                /// Timer/Counter 1 Waveform Generation Mode - Bit 2
                WGM12 = 3;
                /// Timer/Counter 1 Waveform Generation Mode - Bit 3
                WGM13 = 4;
            }
        }
    }

    // The 16-bit registers go through a shared TEMP byte: write high then low, read low then high.

    reg! {
        /// Timer/Counter 1 Counter Value, Low Byte
        TCNT1L {
            addr: 0x84,
            write mask: 0xFF,
        }
    }
    reg! {
        /// Timer/Counter 1 Counter Value, High Byte
        TCNT1H {
            addr: 0x85,
            write mask: 0xFF,
        }
    }

    reg! {
        /// Timer/Counter 1 Output Compare Register A, Low Byte
        OCR1AL {
            addr: 0x88,
            write mask: 0xFF,
        }
    }
    reg! {
        /// Timer/Counter 1 Output Compare Register A, High Byte
        OCR1AH {
            addr: 0x89,
            write mask: 0xFF,
        }
    }
}
use registers::*;

/// Raised by the compare match interrupt, taken by the main loop.
pub static TICK: PendingTick = PendingTick::new();

static mut HAS_INIT: bool = false;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum TimerError {
    InitError,
    /// The period doesn't fit the 16-bit compare register.
    PeriodOutOfRange,
}

/// Only one instance of this can be alive at any one time.
pub struct TickTimer(PhantomData<()>);

impl TickTimer {
    /// Starts ticking every `period_ms`. Nothing is delivered until interrupts are enabled.
    pub fn init(period_ms: u16) -> Result<TickTimer, TimerError> {
        let compare = compare_value(period_ms).ok_or(TimerError::PeriodOutOfRange)?;
        let [high, low] = compare.to_be_bytes();

        unsafe {
            if HAS_INIT {
                return Err(TimerError::InitError);
            }

            // Stopped while we set it up.
            TCCR1A::set_raw_value(0);
            TCCR1B::set_raw_value(0);

            TCNT1H::set_raw_value(0);
            TCNT1L::set_raw_value(0);
            OCR1AH::set_raw_value(high);
            OCR1AL::set_raw_value(low);

            TIMSK1::set_bits(TIMSK1::OCIE1A);

            // CTC on OCR1A, clock /1024.
            TCCR1B::set_value(TCCR1B::WGM12 | TCCR1B::CS12 | TCCR1B::CS10);
            HAS_INIT = true;
        }

        Ok(TickTimer(PhantomData))
    }
}

impl TickControl for TickTimer {
    fn pause(&mut self) {
        unsafe { TIMSK1::clear_bits(TIMSK1::OCIE1A) }
    }

    fn resume(&mut self) {
        unsafe { TIMSK1::set_bits(TIMSK1::OCIE1A) }
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        unsafe {
            TCCR1B::clear_bits(TCCR1B::CS10 | TCCR1B::CS11 | TCCR1B::CS12);
            TIMSK1::clear_bits(TIMSK1::OCIE1A);

            HAS_INIT = false;
        }
    }
}

/// Timer/Counter 1 Output Compare A Match interrupt.
#[no_mangle]
pub unsafe extern "avr-interrupt" fn __vector_11() {
    TICK.raise();
}
