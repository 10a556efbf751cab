//! Records the push switch into EEPROM and plays it back on the LED.
//!
//! At power on the LED is lit for a few seconds. Holding the switch down when it goes out wipes
//! the recording back to a plain on/off pattern. After that, pressing the switch at any time
//! starts a new recording.

#![cfg_attr(target_arch = "avr", no_std, no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use core::convert::Infallible;
    use derive_more::From;
    use embedded_hal::{
        delay::DelayNs,
        digital::{InputPin, OutputPin},
    };
    use toadstool::{
        config::{
            ConfigError, ReplayConfig, EEPROM_ADDRESS, POWER_ON_HOLD_MS, REPLAY_BUS_KHZ,
            USART_BAUD,
        },
        devices::Eeprom,
        hal::{
            self,
            ports::{Pin, PortB},
            timer::{TickTimer, TimerError, TICK},
            twi::{Twi, TwiError},
            usart::{Usart, UsartError},
            Delay,
        },
        replay::Controller,
    };
    use ufmt::uwriteln;

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
        Timer(TimerError),
        Config(ConfigError),
        Pin(Infallible),
    }

    fn run() -> Result<(), ErrorKind> {
        let mut serial = Usart::init(USART_BAUD)?;
        log!(serial, "Toadstool replay demo");

        let config = ReplayConfig::reference()?;
        let eeprom = Eeprom::new(EEPROM_ADDRESS);
        let twi = Twi::init(REPLAY_BUS_KHZ)?;
        let mut delay = Delay;

        let mut switch = Pin::<PortB>::input_pullup(PortB::PB0);
        let mut led = Pin::<PortB>::output(PortB::PB1);

        // Gives the user a moment to hold the switch down.
        led.set_high()?;
        delay.delay_ms(POWER_ON_HOLD_MS);
        led.set_low()?;
        let wipe = switch.is_low()?;

        // Interrupts are still off, so this won't tick until we're ready.
        let timer = TickTimer::init(config.tick_ms())?;

        let mut controller = Controller::new(config, eeprom, twi, switch, led, delay, timer);
        log!(
            serial,
            "{} bytes from {}, tick {}ms",
            config.sample_count(),
            config.first_address(),
            config.tick_ms()
        );

        match eeprom.last_address(controller.bus_mut()) {
            Ok(last) => log!(serial, "Last recorded byte: {}", last),
            Err(e) => log!(serial, "EEPROM not responding: {:?}", e),
        }

        if wipe {
            log!(serial, "Re-initialising");
            if let Err(e) = controller.reinitialize() {
                log!(serial, "Re-initialise failed: {:?}", e);
            }
        }

        log!(serial, "State: {:?}", controller.state());
        hal::enable_interrupts();

        loop {
            if !TICK.take() {
                continue;
            }

            let before = controller.state();
            if let Err(e) = controller.on_tick() {
                log!(serial, "Tick failed: {:?}", e);
            }

            if controller.state().is_transition() {
                log!(serial, "State: {:?}", controller.state());
                if let Err(e) = controller.acknowledge() {
                    log!(serial, "Acknowledge failed: {:?}", e);
                }
            }

            if controller.state() != before {
                log!(serial, "State: {:?}", controller.state());
            }
        }
    }

    #[no_mangle]
    pub extern "C" fn main() {
        match run() {
            Err(ErrorKind::Twi(TwiError::InitError)) => hal::blink_error_code(1),
            Err(ErrorKind::Twi(TwiError::InvalidSpeed)) => hal::blink_error_code(6),
            Err(ErrorKind::Usart(UsartError::InitError)) => hal::blink_error_code(2),
            Err(ErrorKind::Timer(TimerError::InitError)) => hal::blink_error_code(3),
            Err(ErrorKind::Timer(TimerError::PeriodOutOfRange)) => hal::blink_error_code(4),
            Err(ErrorKind::Config(_)) => hal::blink_error_code(5),
            Err(ErrorKind::Pin(never)) => match never {},
            Ok(()) => {}
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
