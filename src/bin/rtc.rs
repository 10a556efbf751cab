//! Brings up the MCP79400, sets it to a fixed time if nobody has yet, then prints the time over
//! serial every five seconds.

#![cfg_attr(target_arch = "avr", no_std, no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use derive_more::From;
    use embedded_hal::delay::DelayNs;
    use toadstool::{
        bus::BusError,
        config::{RTC_ADDRESS, RTC_BUS_KHZ, USART_BAUD},
        devices::{HourFormat, Rtc, RtcError, Time},
        hal::{
            self,
            twi::{Twi, TwiError},
            usart::{Usart, UsartError},
            Delay,
        },
    };
    use ufmt::uwriteln;

    const REPORT_INTERVAL_MS: u32 = 5000;

    /// A few seconds before the end of 2015.
    const INITIAL_TIME: Time = Time {
        year: 15,
        month: 12,
        day: 31,
        weekday: 5,
        hour: 23,
        pm: false,
        minute: 59,
        second: 15,
    };

    // The serial port can't fail, so there's nothing to do with the result.
    macro_rules! log {
        ($serial:expr, $($arg:tt)*) => {{
            let _ = uwriteln!($serial, $($arg)*);
        }};
    }

    #[derive(Copy, Clone, Eq, PartialEq, From)]
    enum ErrorKind {
        Twi(TwiError),
        Usart(UsartError),
        Rtc(RtcError),
        Bus(BusError),
    }

    fn run() -> Result<(), ErrorKind> {
        let mut serial = Usart::init(USART_BAUD)?;
        log!(serial, "Toadstool RTC demo");

        let mut twi = Twi::init(RTC_BUS_KHZ)?;
        let mut delay = Delay;
        let rtc = Rtc::new(RTC_ADDRESS, HourFormat::TwentyFour, true);

        log!(serial, "Starting RTC");
        match rtc.init(&mut twi, &mut delay) {
            Ok(()) => log!(serial, "Oscillator running"),
            // Not fatal; setting the time has another go at starting it.
            Err(RtcError::OscillatorStopped) => log!(serial, "Oscillator failed to start"),
            Err(e) => return Err(e.into()),
        }

        let time = rtc.time(&mut twi)?;
        log!(serial, "Time is {}", time);

        if time.is_unset() {
            log!(serial, "Setting time to {}", INITIAL_TIME);
            rtc.set_time(&mut twi, &INITIAL_TIME)?;
            delay.delay_ms(100);
        }

        if rtc.oscillator_running(&mut twi)? {
            log!(serial, "Oscillator running");
        } else {
            log!(serial, "Oscillator stopped");
        }

        loop {
            match rtc.time(&mut twi) {
                Ok(now) => log!(serial, "Timecheck: {}", now),
                Err(e) => log!(serial, "Timecheck failed: {:?}", e),
            }
            delay.delay_ms(REPORT_INTERVAL_MS);
        }
    }

    #[no_mangle]
    pub extern "C" fn main() {
        match run() {
            Err(ErrorKind::Twi(TwiError::InitError)) => hal::blink_error_code(1),
            Err(ErrorKind::Twi(TwiError::InvalidSpeed)) => hal::blink_error_code(6),
            Err(ErrorKind::Usart(UsartError::InitError)) => hal::blink_error_code(2),
            Err(ErrorKind::Rtc(RtcError::Bus(_))) | Err(ErrorKind::Bus(_)) => {
                hal::blink_error_code(3)
            }
            Err(ErrorKind::Rtc(RtcError::OscillatorStopped)) => hal::blink_error_code(4),
            Err(ErrorKind::Rtc(RtcError::InvalidTime)) => hal::blink_error_code(5),
            Ok(()) => {}
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
