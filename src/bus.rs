//! The byte-level two-wire (I2C/TWI) bus contract.
//!
//! Every operation is synchronous: it returns once the hardware reports the step is complete.
//! There is no timeout. A device holding the bus will hang the caller forever, which is fine for
//! a single master with a couple of well-behaved devices on the board.
//!
//! The driver itself only reports the raw status of each step. Checking those statuses against
//! what the step should have produced is done by [`Transaction`], which is what the device
//! drivers build their register reads and writes from.

use ufmt::derive::uDebug;

/// The R/W bit that follows the 7-bit device address.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Builds the byte sent after a start condition: the 7-bit address in the upper bits and the
/// R/W bit in bit 0.
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction as u8
}

/// The TWI status codes a master can observe.
///
/// See ATMega328P datasheet, section 21.7. The bottom three bits of TWSR are the prescaler
/// and are masked off before classifying.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum Status {
    // All Master
    Start,
    RepStart,

    // Master Transmitter
    MtSlaAck,
    MtSlaNack,
    MtDataAck,
    MtDataNack,
    ArbLost,

    // Master Receiver
    MrSlaAck,
    MrSlaNack,
    MrDataAck,
    MrDataNack,

    // All
    NoInfo,
    BusError,

    /// Anything else, such as the slave-mode codes we never expect to see.
    Other(u8),
}

impl Status {
    const MASK: u8 = 0xF8;

    pub fn from_raw(raw: u8) -> Status {
        match raw & Self::MASK {
            0x08 => Status::Start,
            0x10 => Status::RepStart,
            0x18 => Status::MtSlaAck,
            0x20 => Status::MtSlaNack,
            0x28 => Status::MtDataAck,
            0x30 => Status::MtDataNack,
            0x38 => Status::ArbLost,
            0x40 => Status::MrSlaAck,
            0x48 => Status::MrSlaNack,
            0x50 => Status::MrDataAck,
            0x58 => Status::MrDataNack,
            0xF8 => Status::NoInfo,
            0x00 => Status::BusError,
            other => Status::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Status::Start => 0x08,
            Status::RepStart => 0x10,
            Status::MtSlaAck => 0x18,
            Status::MtSlaNack => 0x20,
            Status::MtDataAck => 0x28,
            Status::MtDataNack => 0x30,
            Status::ArbLost => 0x38,
            Status::MrSlaAck => 0x40,
            Status::MrSlaNack => 0x48,
            Status::MrDataAck => 0x50,
            Status::MrDataNack => 0x58,
            Status::NoInfo => 0xF8,
            Status::BusError => 0x00,
            Status::Other(raw) => raw,
        }
    }
}

/// The single-master primitives a bus driver provides.
pub trait Bus {
    /// Asserts a start condition (or a repeated start if a transaction is already open) and
    /// waits for it to complete.
    fn start(&mut self) -> Status;

    /// Transmits an address or data byte and waits for the acknowledge bit.
    fn write_byte(&mut self, byte: u8) -> Status;

    /// Clocks in one byte. `ack` tells the sender whether more bytes are wanted; the last byte of
    /// a read must be NACKed.
    ///
    /// Returns the status as the error if it isn't the one the chosen acknowledge produces.
    fn read_byte(&mut self, ack: bool) -> Result<u8, Status>;

    /// Asserts a stop condition. Does not wait for the bus to be released.
    fn stop(&mut self);
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn start(&mut self) -> Status {
        (**self).start()
    }

    fn write_byte(&mut self, byte: u8) -> Status {
        (**self).write_byte(byte)
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, Status> {
        (**self).read_byte(ack)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Which step of a transaction went wrong.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum Stage {
    Start,
    RepeatedStart,
    AddressWrite,
    AddressRead,
    Data,
    Receive,
}

/// A transaction step didn't produce the status it should have.
#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub struct BusError {
    pub stage: Stage,
    pub status: Status,
}

fn expect(stage: Stage, status: Status, expected: Status) -> Result<(), BusError> {
    if status == expected {
        Ok(())
    } else {
        Err(BusError { stage, status })
    }
}

/// One start-to-stop conversation with a single device.
///
/// The stop condition is sent when the transaction is dropped, so bailing out with `?` part
/// way through still releases the bus.
pub struct Transaction<'b, B: Bus> {
    bus: &'b mut B,
    address: u8,
}

impl<'b, B: Bus> Transaction<'b, B> {
    /// Sends a start condition followed by the device address.
    pub fn begin(bus: &'b mut B, address: u8, direction: Direction) -> Result<Self, BusError> {
        let mut txn = Transaction { bus, address };

        let status = txn.bus.start();
        expect(Stage::Start, status, Status::Start)?;
        txn.select(direction)?;

        Ok(txn)
    }

    /// Sends a repeated start and re-addresses the same device, typically to switch from writing
    /// a register pointer to reading from it.
    pub fn restart(&mut self, direction: Direction) -> Result<(), BusError> {
        let status = self.bus.start();
        expect(Stage::RepeatedStart, status, Status::RepStart)?;
        self.select(direction)
    }

    fn select(&mut self, direction: Direction) -> Result<(), BusError> {
        let status = self.bus.write_byte(address_byte(self.address, direction));
        match direction {
            Direction::Write => expect(Stage::AddressWrite, status, Status::MtSlaAck),
            Direction::Read => expect(Stage::AddressRead, status, Status::MrSlaAck),
        }
    }

    pub fn send(&mut self, byte: u8) -> Result<(), BusError> {
        let status = self.bus.write_byte(byte);
        expect(Stage::Data, status, Status::MtDataAck)
    }

    pub fn send_all(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        bytes.iter().try_for_each(|&b| self.send(b))
    }

    pub fn receive(&mut self, ack: bool) -> Result<u8, BusError> {
        self.bus
            .read_byte(ack)
            .map_err(|status| BusError { stage: Stage::Receive, status })
    }

    /// Ends the transaction with a stop condition.
    pub fn finish(self) {}
}

impl<B: Bus> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        self.bus.stop();
    }
}

/// TWI prescaler settings, as written to TWPS1:0.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Prescaler {
    One,
    Four,
}

impl Prescaler {
    pub fn factor(self) -> u32 {
        match self {
            Prescaler::One => 1,
            Prescaler::Four => 4,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Prescaler::One => 0b00,
            Prescaler::Four => 0b01,
        }
    }
}

/// The TWSR prescaler and TWBR bit rate that give a requested SCL frequency.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ClockDivider {
    pub prescaler: Prescaler,
    pub bit_rate: u8,
}

impl ClockDivider {
    /// SCL = F_CPU / (16 + 2 * TWBR * prescale)
    ///
    /// Faster CPUs use the /4 prescaler so slow bus speeds still fit in TWBR. Returns `None` for
    /// a speed of zero.
    pub fn for_speed(cpu_freq: u32, speed_khz: u16) -> Option<ClockDivider> {
        if speed_khz == 0 {
            return None;
        }

        let prescaler = if cpu_freq > 4_000_000 {
            Prescaler::Four
        } else {
            Prescaler::One
        };
        let scl = speed_khz as u32 * 1000;
        let p = prescaler.factor();

        let bit_rate = (cpu_freq / (scl * 2 * p)).saturating_sub(16 / (2 * p));

        Some(ClockDivider {
            prescaler,
            bit_rate: bit_rate.min(u8::MAX as u32) as u8,
        })
    }

    /// The SCL frequency this divider actually produces, in Hz.
    pub fn scl_frequency(self, cpu_freq: u32) -> u32 {
        cpu_freq / (16 + 2 * self.bit_rate as u32 * self.prescaler.factor())
    }
}
