//! A simulated two-wire bus with behavioural models of the board's EEPROM and RTC.
//!
//! Every primitive is logged so tests can check transaction framing as well as what ends up in
//! the devices.

use crate::bus::{address_byte, Bus, Direction, Status};
use crate::devices::rtc::registers::{OSCRUN, RTCSEC, RTCWKDAY, ST};
use crate::tick::{PendingTick, TickControl};
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use std::{rc::Rc, vec, vec::Vec};

pub const EEPROM_ADDR: u8 = crate::config::EEPROM_ADDRESS;
pub const RTC_ADDR: u8 = crate::config::RTC_ADDRESS;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    Start,
    Write(u8),
    Read { ack: bool },
    Stop,
}

pub struct SimEeprom {
    pub memory: Vec<u8>,
    pub present: bool,
    pointer: u16,
    address_bytes: u8,
}

impl SimEeprom {
    fn new() -> Self {
        SimEeprom {
            memory: vec![0; 0x4000],
            present: true,
            pointer: 0,
            address_bytes: 0,
        }
    }

    fn select(&mut self) {
        self.address_bytes = 0;
    }

    fn write(&mut self, byte: u8) {
        match self.address_bytes {
            0 => {
                self.pointer = (byte as u16) << 8;
                self.address_bytes = 1;
            }
            1 => {
                self.pointer |= byte as u16;
                self.address_bytes = 2;
            }
            _ => {
                let idx = self.pointer as usize % self.memory.len();
                self.memory[idx] = byte;
                self.pointer = self.pointer.wrapping_add(1);
            }
        }
    }

    fn read(&mut self) -> u8 {
        let idx = self.pointer as usize % self.memory.len();
        self.pointer = self.pointer.wrapping_add(1);
        self.memory[idx]
    }
}

pub struct SimRtc {
    pub registers: [u8; 0x20],
    pub present: bool,
    /// The oscillator never starts.
    pub crystal_dead: bool,
    pointer: u8,
    pointer_set: bool,
}

impl SimRtc {
    fn new() -> Self {
        let mut registers = [0; 0x20];
        // Power-on-reset date: 01/01/01
        registers[0x04] = 0x01;
        registers[0x05] = 0x01;
        registers[0x06] = 0x01;

        SimRtc {
            registers,
            present: true,
            crystal_dead: false,
            pointer: 0,
            pointer_set: false,
        }
    }

    fn select(&mut self) {
        self.pointer_set = false;
    }

    fn write(&mut self, byte: u8) {
        if !self.pointer_set {
            self.pointer = byte % 0x20;
            self.pointer_set = true;
            return;
        }

        let reg = self.pointer;
        match reg {
            RTCSEC => {
                self.registers[reg as usize] = byte;
                let wkday = &mut self.registers[RTCWKDAY as usize];
                if byte & ST != 0 && !self.crystal_dead {
                    *wkday |= OSCRUN;
                } else {
                    *wkday &= !OSCRUN;
                }
            }
            RTCWKDAY => {
                let running = self.registers[reg as usize] & OSCRUN;
                self.registers[reg as usize] = (byte & !OSCRUN) | running;
            }
            _ => self.registers[reg as usize] = byte,
        }
        self.pointer = (self.pointer + 1) % 0x20;
    }

    fn read(&mut self) -> u8 {
        let val = self.registers[self.pointer as usize];
        self.pointer = (self.pointer + 1) % 0x20;
        val
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Phase {
    Idle,
    Started,
    Selected(u8, Direction),
    Rejected,
}

pub struct SimBus {
    pub eeprom: SimEeprom,
    pub rtc: SimRtc,
    pub log: Vec<Op>,
    /// Every receive fails with a bus error status.
    pub fail_reads: bool,
    /// Every data byte written after the address is NACKed.
    pub nack_data: bool,
    /// A start sent mid-transaction loses arbitration.
    pub lose_arbitration: bool,
    /// Raised on every stop, as if the tick timer kept firing during blocking transactions.
    pub tick_during_stop: Option<&'static PendingTick>,
    phase: Phase,
}

impl SimBus {
    pub fn new() -> Self {
        SimBus {
            eeprom: SimEeprom::new(),
            rtc: SimRtc::new(),
            log: Vec::new(),
            fail_reads: false,
            nack_data: false,
            lose_arbitration: false,
            tick_during_stop: None,
            phase: Phase::Idle,
        }
    }

    pub fn stops(&self) -> usize {
        self.log.iter().filter(|op| **op == Op::Stop).count()
    }

    fn present(&self, address: u8) -> bool {
        match address {
            EEPROM_ADDR => self.eeprom.present,
            RTC_ADDR => self.rtc.present,
            _ => false,
        }
    }
}

impl Bus for SimBus {
    fn start(&mut self) -> Status {
        self.log.push(Op::Start);
        let status = match self.phase {
            Phase::Idle => Status::Start,
            _ if self.lose_arbitration => Status::ArbLost,
            _ => Status::RepStart,
        };
        self.phase = Phase::Started;
        status
    }

    fn write_byte(&mut self, byte: u8) -> Status {
        self.log.push(Op::Write(byte));

        match self.phase {
            Phase::Started => {
                let address = byte >> 1;
                let direction = if byte & 1 == 0 { Direction::Write } else { Direction::Read };
                debug_assert_eq!(address_byte(address, direction), byte);

                if !self.present(address) {
                    self.phase = Phase::Rejected;
                    return match direction {
                        Direction::Write => Status::MtSlaNack,
                        Direction::Read => Status::MrSlaNack,
                    };
                }

                if direction == Direction::Write {
                    match address {
                        EEPROM_ADDR => self.eeprom.select(),
                        _ => self.rtc.select(),
                    }
                }
                self.phase = Phase::Selected(address, direction);
                match direction {
                    Direction::Write => Status::MtSlaAck,
                    Direction::Read => Status::MrSlaAck,
                }
            }
            Phase::Selected(_, Direction::Write) if self.nack_data => Status::MtDataNack,
            Phase::Selected(address, Direction::Write) => {
                match address {
                    EEPROM_ADDR => self.eeprom.write(byte),
                    _ => self.rtc.write(byte),
                }
                Status::MtDataAck
            }
            _ => Status::BusError,
        }
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, Status> {
        self.log.push(Op::Read { ack });

        if self.fail_reads {
            return Err(Status::BusError);
        }

        match self.phase {
            Phase::Selected(address, Direction::Read) => Ok(match address {
                EEPROM_ADDR => self.eeprom.read(),
                _ => self.rtc.read(),
            }),
            _ => Err(Status::BusError),
        }
    }

    fn stop(&mut self) {
        self.log.push(Op::Stop);
        self.phase = Phase::Idle;

        if let Some(tick) = self.tick_during_stop {
            tick.raise();
        }
    }
}

/// Active-low push switch.
#[derive(Clone, Default)]
pub struct FakeSwitch {
    pub pressed: Rc<Cell<bool>>,
}

impl ErrorType for FakeSwitch {
    type Error = Infallible;
}

impl InputPin for FakeSwitch {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.pressed.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pressed.get())
    }
}

/// Records every level it's driven to.
#[derive(Clone, Default)]
pub struct FakeLed {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl FakeLed {
    pub fn last(&self) -> Option<bool> {
        self.levels.borrow().last().copied()
    }

    pub fn clear(&self) {
        self.levels.borrow_mut().clear();
    }

    pub fn rising_edges(&self) -> usize {
        let levels = self.levels.borrow();
        let mut prev = false;
        let mut edges = 0;
        for &level in levels.iter() {
            if level && !prev {
                edges += 1;
            }
            prev = level;
        }
        edges
    }
}

impl ErrorType for FakeLed {
    type Error = Infallible;
}

impl OutputPin for FakeLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeTimer {
    pub paused: Rc<Cell<u32>>,
    pub resumed: Rc<Cell<u32>>,
}

impl FakeTimer {
    pub fn is_paused(&self) -> bool {
        self.paused.get() > self.resumed.get()
    }
}

impl TickControl for FakeTimer {
    fn pause(&mut self) {
        self.paused.set(self.paused.get() + 1);
    }

    fn resume(&mut self) {
        self.resumed.set(self.resumed.get() + 1);
    }
}
