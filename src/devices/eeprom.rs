//! 24LC-series serial EEPROM.
//!
//! Memory is addressed with 16 bits, sent high byte first. Bytes 0 and 1 hold a "last used
//! address" cursor for simple logging. Nothing on the write path looks at it; it's up to the
//! application to keep it current.

use crate::bus::{Bus, BusError};
use crate::devices::register::{read_register, write_register};
use embedded_hal::delay::DelayNs;

/// Where the big-endian last-address cursor lives.
pub const CURSOR_ADDRESS: u16 = 0;

/// The part ignores the bus while it commits a write.
pub const WRITE_CYCLE_MS: u32 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Eeprom {
    address: u8,
}

impl Eeprom {
    pub const fn new(address: u8) -> Eeprom {
        Eeprom { address }
    }

    pub fn read_byte<B: Bus>(&self, bus: &mut B, memory: u16) -> Result<u8, BusError> {
        read_register(bus, self.address, &memory.to_be_bytes())
    }

    /// Writes one byte, then waits out the write cycle.
    pub fn write_byte<B: Bus, D: DelayNs>(
        &self,
        bus: &mut B,
        delay: &mut D,
        memory: u16,
        value: u8,
    ) -> Result<(), BusError> {
        write_register(bus, self.address, &memory.to_be_bytes(), value)?;
        delay.delay_ms(WRITE_CYCLE_MS);
        Ok(())
    }

    pub fn last_address<B: Bus>(&self, bus: &mut B) -> Result<u16, BusError> {
        let high = self.read_byte(bus, CURSOR_ADDRESS)?;
        let low = self.read_byte(bus, CURSOR_ADDRESS + 1)?;
        Ok(u16::from_be_bytes([high, low]))
    }

    pub fn set_last_address<B: Bus, D: DelayNs>(
        &self,
        bus: &mut B,
        delay: &mut D,
        last: u16,
    ) -> Result<(), BusError> {
        let [high, low] = last.to_be_bytes();
        self.write_byte(bus, delay, CURSOR_ADDRESS, high)?;
        self.write_byte(bus, delay, CURSOR_ADDRESS + 1, low)
    }
}
