//! Packing switch samples into EEPROM bytes, and tracking where we are in the sequence.
//!
//! Eight ticks make a byte. The first tick of a byte is bit 0.

pub const BITS_PER_BYTE: u8 = 8;

pub fn pack(samples: [bool; 8]) -> u8 {
    samples
        .iter()
        .enumerate()
        .fold(0, |byte, (i, &on)| if on { byte | 1 << i } else { byte })
}

pub fn unpack(byte: u8) -> [bool; 8] {
    let mut samples = [false; 8];
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample = bit(byte, i as u8);
    }
    samples
}

pub fn bit(byte: u8, index: u8) -> bool {
    byte & (1 << index) != 0
}

/// The byte address and bit within it of the next sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cursor {
    pub address: u16,
    pub bit: u8,
}

impl Cursor {
    /// Positioned on bit 0 of `address`, ready to record.
    pub fn rewound(address: u16) -> Cursor {
        Cursor { address, bit: 0 }
    }

    /// Positioned past the end of a byte, so the next replay step fetches `address` before using
    /// any bits.
    pub fn primed(address: u16) -> Cursor {
        Cursor {
            address,
            bit: BITS_PER_BYTE,
        }
    }

    pub fn byte_finished(&self) -> bool {
        self.bit >= BITS_PER_BYTE
    }
}
