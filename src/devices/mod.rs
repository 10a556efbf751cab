//! Drivers for the devices hanging off the two-wire bus.

pub mod bcd;
pub mod eeprom;
pub mod register;
pub mod rtc;

pub use eeprom::Eeprom;
pub use rtc::{HourFormat, Rtc, RtcError, Time};
