//! Single-byte register reads and writes, the shape both the RTC and EEPROM use.
//!
//! The register (or memory) address is sent as one or more bytes straight after selecting the
//! device: one byte for the RTC, high then low for the EEPROM.

use crate::bus::{Bus, BusError, Direction, Transaction};

/// start, device+W, register, value, stop
pub fn write_register<B: Bus>(
    bus: &mut B,
    device: u8,
    register: &[u8],
    value: u8,
) -> Result<(), BusError> {
    let mut txn = Transaction::begin(bus, device, Direction::Write)?;
    txn.send_all(register)?;
    txn.send(value)?;
    txn.finish();

    Ok(())
}

/// start, device+W, register, repeated start, device+R, read with NACK, stop
pub fn read_register<B: Bus>(bus: &mut B, device: u8, register: &[u8]) -> Result<u8, BusError> {
    let mut txn = Transaction::begin(bus, device, Direction::Write)?;
    txn.send_all(register)?;
    txn.restart(Direction::Read)?;
    let value = txn.receive(false)?;
    txn.finish();

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Stage, Status};
    use crate::sim::{Op, SimBus, EEPROM_ADDR, RTC_ADDR};
    use std::vec;

    #[test]
    fn write_then_read_one_register() {
        let mut bus = SimBus::new();
        write_register(&mut bus, RTC_ADDR, &[0x01], 0x42).unwrap();
        bus.log.clear();

        assert_eq!(read_register(&mut bus, RTC_ADDR, &[0x01]), Ok(0x42));
        assert_eq!(
            bus.log,
            vec![
                Op::Start,
                Op::Write(0xDE),
                Op::Write(0x01),
                Op::Start,
                Op::Write(0xDF),
                Op::Read { ack: false },
                Op::Stop,
            ]
        );
    }

    #[test]
    fn two_byte_memory_address_goes_high_first() {
        let mut bus = SimBus::new();
        write_register(&mut bus, EEPROM_ADDR, &[0x12, 0x34], 0x99).unwrap();

        assert_eq!(&bus.log[2..4], &[Op::Write(0x12), Op::Write(0x34)]);
        assert_eq!(bus.eeprom.memory[0x1234], 0x99);
    }

    #[test]
    fn failed_receive_is_reported_not_zeroed() {
        let mut bus = SimBus::new();
        bus.fail_reads = true;

        let err = read_register(&mut bus, RTC_ADDR, &[0x00]).unwrap_err();
        assert_eq!(err, BusError { stage: Stage::Receive, status: Status::BusError });
        assert_eq!(bus.log.last(), Some(&Op::Stop));

        // Callers wanting the old sentinel behaviour can still have it.
        assert_eq!(read_register(&mut bus, RTC_ADDR, &[0x00]).unwrap_or(0), 0);
    }
}
