//! The simplest of the demos: the LED on PB0 on for a second, off for a second, forever.

#![cfg_attr(target_arch = "avr", no_std, no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use core::convert::Infallible;
    use derive_more::From;
    use embedded_hal::{delay::DelayNs, digital::StatefulOutputPin};
    use toadstool::hal::{
        ports::{Pin, PortB},
        Delay,
    };

    const BLINK_MS: u32 = 1000;

    #[derive(From)]
    enum ErrorKind {
        Pin(Infallible),
    }

    fn run() -> Result<(), ErrorKind> {
        let mut led = Pin::<PortB>::output(PortB::PB0);
        let mut delay = Delay;

        loop {
            led.toggle()?;
            delay.delay_ms(BLINK_MS);
        }
    }

    #[no_mangle]
    pub extern "C" fn main() {
        match run() {
            Err(ErrorKind::Pin(never)) => match never {},
            Ok(()) => {}
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
