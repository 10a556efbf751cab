//! Board wiring and tuning constants, plus the validated settings for the replay firmware.

use ufmt::derive::uDebug;

/// The Toadstool mega328 runs from a 16MHz crystal.
pub const CPU_FREQ: u32 = 16_000_000;

/// 24LC128 EEPROM module, as a 7-bit bus address.
pub const EEPROM_ADDRESS: u8 = 0x53;
/// MCP79400 RTC module, as a 7-bit bus address.
pub const RTC_ADDRESS: u8 = 0x6F;

pub const REPLAY_BUS_KHZ: u16 = 100;
pub const RTC_BUS_KHZ: u16 = 200;

pub const USART_BAUD: u32 = 9600;

/// First EEPROM byte holding recorded samples. Everything below it is left for the header.
pub const EEPROM_FIRST_ADDRESS: u16 = 20;
/// Highest address we'll write to (128kbit part).
pub const EEPROM_MAX_ADDRESS: u16 = 15_999;

/// How long a recording lasts.
pub const REPLAY_MS: u32 = 5_000;
/// How often the switch is sampled or the LED updated.
pub const TICK_MS: u16 = 100;

/// Each half of a single acknowledgement flash.
pub const FLASH_MS: u32 = 150;
pub const BEGIN_FLASHES: u8 = 3;
pub const END_FLASHES: u8 = 5;

/// How long the LED stays lit at power on, giving the user time to hold the switch down.
pub const POWER_ON_HOLD_MS: u32 = 3_000;

/// Timer1 clock divider used for the tick.
pub const TICK_PRESCALE: u32 = 1024;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum ConfigError {
    ZeroPeriod,
    /// The replay length isn't a whole number of ticks.
    UnevenPeriod,
    EmptyBuffer,
    /// The 16-bit tick timer can't count that long.
    PeriodTooLong,
    /// The buffer would overlap the cursor header or run off the end of the EEPROM.
    OutOfRange,
}

/// Where and how long the recorded sequence is.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReplayConfig {
    first_address: u16,
    sample_count: u16,
    tick_ms: u16,
}

impl ReplayConfig {
    pub fn new(first_address: u16, replay_ms: u32, tick_ms: u16) -> Result<ReplayConfig, ConfigError> {
        if tick_ms == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        if replay_ms % tick_ms as u32 != 0 {
            return Err(ConfigError::UnevenPeriod);
        }
        if crate::tick::compare_value(tick_ms).is_none() {
            return Err(ConfigError::PeriodTooLong);
        }

        // A partly filled last byte still gets recorded in full.
        let samples = replay_ms / tick_ms as u32;
        let sample_count = samples.div_ceil(8);
        if sample_count == 0 {
            return Err(ConfigError::EmptyBuffer);
        }

        let header_end = crate::devices::eeprom::CURSOR_ADDRESS + 2;
        let last = first_address as u32 + sample_count - 1;
        if first_address < header_end || last > EEPROM_MAX_ADDRESS as u32 {
            return Err(ConfigError::OutOfRange);
        }

        Ok(ReplayConfig {
            first_address,
            sample_count: sample_count as u16,
            tick_ms,
        })
    }

    /// The board's default: 5 seconds at 100ms per sample, starting at address 20.
    pub fn reference() -> Result<ReplayConfig, ConfigError> {
        ReplayConfig::new(EEPROM_FIRST_ADDRESS, REPLAY_MS, TICK_MS)
    }

    pub fn first_address(&self) -> u16 {
        self.first_address
    }

    /// Number of sample bytes in the sequence.
    pub fn sample_count(&self) -> u16 {
        self.sample_count
    }

    /// One past the last sample byte.
    pub fn end_address(&self) -> u16 {
        self.first_address + self.sample_count
    }

    pub fn tick_ms(&self) -> u16 {
        self.tick_ms
    }
}
