//! The ATmega328P side of the firmware.

#[macro_use]
pub mod register;
pub mod panic;
pub mod ports;
pub mod timer;
pub mod twi;
pub mod usart;

use core::arch::asm;
use embedded_hal::delay::DelayNs;
use ports::{PortB, PortBPins};

/// The LED that panics and error codes are blinked on.
pub const STATUS_LED: PortBPins = PortB::PB1;

pub fn enable_interrupts() {
    unsafe { asm!("sei") }
}

pub fn disable_interrupts() {
    unsafe { asm!("cli") }
}

/// Causes a delay of the given number of milliseconds.
///
/// Busy-waits, so it's only as accurate as the loop timing in [`delay_micros`] and stretches by
/// however long any interrupts take.
#[inline(never)]
pub fn delay_millis(mut ms: u32) {
    const MAX_MS_PER_CALL: u32 = 16;
    const US_PER_MS: u32 = 1000;

    while ms > MAX_MS_PER_CALL {
        delay_micros((MAX_MS_PER_CALL * US_PER_MS) as u16);
        ms -= MAX_MS_PER_CALL;
    }

    delay_micros((ms * US_PER_MS) as u16);
}

/// Busy-loops for a given number of microseconds, without needing a timer.
///
/// This assumes a 16MHz clock. Counts above 16383 overflow the loop counter.
#[inline(never)]
pub fn delay_micros(mut us: u16) {
    // The call overhead is about a microsecond.
    if us <= 1 {
        return;
    }

    // The loop below takes 4 cycles, a quarter of a microsecond, per iteration.
    us <<= 2;

    // Account for the time taken getting here. `us` is at least 8 so this can't underflow.
    us -= 5;

    unsafe {
        asm!(
            "1: sbiw {us}, 1",
            "brne 1b",
            us = inout(reg_iw) us => _,
            options(nomem, nostack),
        );
    }
}

/// `embedded-hal` delays over the busy loops above.
#[derive(Copy, Clone, Default)]
pub struct Delay;

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, mut us: u32) {
        const MAX_US_PER_CALL: u32 = 16_000;

        while us > MAX_US_PER_CALL {
            delay_micros(MAX_US_PER_CALL as u16);
            us -= MAX_US_PER_CALL;
        }
        delay_micros(us as u16);
    }

    fn delay_ms(&mut self, ms: u32) {
        delay_millis(ms);
    }
}

/// Blinks an error code at the user.
///
/// The code is the first 6 bits of the input number, least significant first, with a short
/// blink for 0, long blink for 1, and a 1 second delay between sequences.
pub fn blink_error_code(code: u8) -> ! {
    use ports::{PinMode, Port};
    PortB::set_pin_mode(STATUS_LED, PinMode::Output);

    loop {
        let mut code = code;

        for _ in 0..6 {
            let blink_len = if code & 0x1 == 0 { 100 } else { 250 };

            PortB::set_port_high(STATUS_LED);
            delay_millis(blink_len);
            PortB::set_port_low(STATUS_LED);
            delay_millis(200);

            code >>= 1;
        }
        delay_millis(1000);
    }
}
