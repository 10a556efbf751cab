//! Microchip MCP79400 real-time clock.
//!
//! Time is kept in BCD across a handful of single-byte registers, several of which also carry
//! status or control bits alongside the time field. Reading the time is done field by field, so
//! a rollover part way through (say from 23:59:59 to 00:00:00) can give a reading that mixes the
//! two. Read twice and compare if that matters.

use crate::bus::{Bus, BusError};
use crate::devices::bcd::{from_bcd, to_bcd};
use crate::devices::register::{read_register, write_register};
use derive_more::From;
use embedded_hal::delay::DelayNs;
use ufmt::{derive::uDebug, uDisplay, uWrite, uwrite, Formatter};

pub mod registers {
    pub const RTCSEC: u8 = 0x00;
    pub const RTCMIN: u8 = 0x01;
    pub const RTCHOUR: u8 = 0x02;
    pub const RTCWKDAY: u8 = 0x03;
    pub const RTCDATE: u8 = 0x04;
    pub const RTCMTH: u8 = 0x05;
    pub const RTCYEAR: u8 = 0x06;
    pub const CONTROL: u8 = 0x07;

    /// RTCSEC: oscillator start
    pub const ST: u8 = 1 << 7;
    pub const SECOND_MASK: u8 = 0b0111_1111;

    pub const MINUTE_MASK: u8 = 0b0111_1111;

    /// RTCHOUR: set for 12-hour format
    pub const HOUR_12: u8 = 1 << 6;
    /// RTCHOUR: PM in 12-hour format
    pub const PM: u8 = 1 << 5;
    pub const HOUR_24_MASK: u8 = 0b0011_1111;
    pub const HOUR_12_MASK: u8 = 0b0001_1111;

    /// RTCWKDAY: oscillator is running (read only)
    pub const OSCRUN: u8 = 1 << 5;
    /// RTCWKDAY: power failed (write 0 to clear)
    pub const PWRFAIL: u8 = 1 << 4;
    /// RTCWKDAY: battery backup enabled
    pub const VBATEN: u8 = 1 << 3;
    pub const WEEKDAY_MASK: u8 = 0b0000_0111;

    pub const DATE_MASK: u8 = 0b0011_1111;
    pub const MONTH_MASK: u8 = 0b0001_1111;
}
use registers::*;

/// Time for the oscillator to get going after it's told to start.
const OSCILLATOR_SETTLE_MS: u32 = 10;

/// The seconds value written when kicking a stopped oscillator.
const START_SECONDS: u8 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum HourFormat {
    TwentyFour,
    Twelve,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, From, uDebug)]
pub enum RtcError {
    Bus(BusError),
    /// The oscillator still wasn't running after being started.
    #[from(ignore)]
    OscillatorStopped,
    /// A field was outside its calendar range.
    #[from(ignore)]
    InvalidTime,
}

/// A calendar time as the application sees it.
///
/// `hour` is always 0-23. `pm` reports the meridiem bit when the chip holds a 12-hour time, and
/// is false for a 24-hour time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, uDebug)]
pub struct Time {
    /// Last two digits only.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    pub hour: u8,
    pub pm: bool,
    pub minute: u8,
    pub second: u8,
}

impl Time {
    /// The chip's power-on-reset date, which means nobody has set it yet.
    pub fn is_unset(&self) -> bool {
        self.year == 1 && self.month == 1 && self.day == 1
    }

    fn validate(&self) -> Result<(), RtcError> {
        let valid = self.year <= 99
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && (1..=7).contains(&self.weekday)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59;

        if valid {
            Ok(())
        } else {
            Err(RtcError::InvalidTime)
        }
    }
}

/// Zero-padded two-digit decimal, since `ufmt` has no width specifiers.
pub struct TwoDigits(pub u8);

impl uDisplay for TwoDigits {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error> {
        let digits = [b'0' + (self.0 / 10) % 10, b'0' + self.0 % 10];
        // Both bytes are ASCII digits.
        f.write_str(core::str::from_utf8(&digits).unwrap_or("??"))
    }
}

/// `DD/MM/20YY HH:MM:SS`
impl uDisplay for Time {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error> {
        uwrite!(
            f,
            "{}/{}/20{} {}:{}:{}",
            TwoDigits(self.day),
            TwoDigits(self.month),
            TwoDigits(self.year),
            TwoDigits(self.hour),
            TwoDigits(self.minute),
            TwoDigits(self.second)
        )
    }
}

fn encode_hour(hour: u8, format: HourFormat) -> u8 {
    match format {
        HourFormat::TwentyFour => to_bcd(hour),
        HourFormat::Twelve => {
            let (hour12, pm) = match hour {
                0 => (12, false),
                1..=11 => (hour, false),
                12 => (12, true),
                h => (h - 12, true),
            };
            let pm_bit = if pm { PM } else { 0 };
            to_bcd(hour12) | HOUR_12 | pm_bit
        }
    }
}

/// Returns the hour as 0-23, and the PM flag if the register holds a 12-hour time.
fn decode_hour(raw: u8) -> (u8, bool) {
    if raw & HOUR_12 != 0 {
        let pm = raw & PM != 0;
        let hour12 = from_bcd(raw & HOUR_12_MASK);
        let hour = match (hour12, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        (hour, pm)
    } else {
        (from_bcd(raw & HOUR_24_MASK), false)
    }
}

pub struct Rtc {
    address: u8,
    format: HourFormat,
    backup_battery: bool,
}

impl Rtc {
    /// `format` and `backup_battery` are only recorded here. They reach the chip through
    /// [`Rtc::init`] and [`Rtc::set_time`].
    pub const fn new(address: u8, format: HourFormat, backup_battery: bool) -> Rtc {
        Rtc {
            address,
            format,
            backup_battery,
        }
    }

    pub fn read<B: Bus>(&self, bus: &mut B, register: u8) -> Result<u8, BusError> {
        read_register(bus, self.address, &[register])
    }

    pub fn write<B: Bus>(&self, bus: &mut B, register: u8, value: u8) -> Result<(), BusError> {
        write_register(bus, self.address, &[register], value)
    }

    /// Brings the battery backup setting in line with ours, and makes sure the oscillator is
    /// running.
    pub fn init<B: Bus, D: DelayNs>(&self, bus: &mut B, delay: &mut D) -> Result<(), RtcError> {
        let mut wkday = self.read(bus, RTCWKDAY)?;

        if (wkday & VBATEN != 0) != self.backup_battery {
            if self.backup_battery {
                wkday |= VBATEN;
            } else {
                wkday &= !VBATEN;
            }
            self.write(bus, RTCWKDAY, wkday)?;
        }

        if wkday & OSCRUN == 0 {
            // External oscillator off, then restart the crystal from an arbitrary time.
            self.write(bus, CONTROL, 0)?;
            self.write(bus, RTCSEC, to_bcd(START_SECONDS) | ST)?;
        }

        delay.delay_ms(OSCILLATOR_SETTLE_MS);

        if self.oscillator_running(bus)? {
            Ok(())
        } else {
            Err(RtcError::OscillatorStopped)
        }
    }

    pub fn oscillator_running<B: Bus>(&self, bus: &mut B) -> Result<bool, BusError> {
        Ok(self.read(bus, RTCWKDAY)? & OSCRUN != 0)
    }

    /// Reads each field with its own transaction. See the module docs about rollovers.
    pub fn time<B: Bus>(&self, bus: &mut B) -> Result<Time, BusError> {
        let year = from_bcd(self.read(bus, RTCYEAR)?);
        let month = from_bcd(self.read(bus, RTCMTH)? & MONTH_MASK);
        let day = from_bcd(self.read(bus, RTCDATE)? & DATE_MASK);
        let weekday = self.read(bus, RTCWKDAY)? & WEEKDAY_MASK;
        let (hour, pm) = decode_hour(self.read(bus, RTCHOUR)?);
        let minute = from_bcd(self.read(bus, RTCMIN)? & MINUTE_MASK);
        let second = from_bcd(self.read(bus, RTCSEC)? & SECOND_MASK);

        Ok(Time {
            year,
            month,
            day,
            weekday,
            hour,
            pm,
            minute,
            second,
        })
    }

    /// Stops the clock, writes every field, and restarts it by writing the seconds last with
    /// the start bit set. The clock doesn't tick part way through.
    pub fn set_time<B: Bus>(&self, bus: &mut B, time: &Time) -> Result<(), RtcError> {
        time.validate()?;

        self.write(bus, RTCSEC, 0)?;

        self.write(bus, RTCYEAR, to_bcd(time.year))?;
        self.write(bus, RTCMTH, to_bcd(time.month))?;
        self.write(bus, RTCDATE, to_bcd(time.day))?;

        // The weekday shares its register with the battery and status bits.
        let wkday = self.read(bus, RTCWKDAY)?;
        self.write(bus, RTCWKDAY, (wkday & !WEEKDAY_MASK) | time.weekday)?;

        self.write(bus, RTCHOUR, encode_hour(time.hour, self.format))?;
        self.write(bus, RTCMIN, to_bcd(time.minute))?;
        self.write(bus, RTCSEC, to_bcd(time.second) | ST)?;

        Ok(())
    }
}
