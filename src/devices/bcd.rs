//! Binary-coded decimal, one decimal digit per nibble. Valid for 0..=99.

pub const fn to_bcd(val: u8) -> u8 {
    (val / 10) * 16 + (val % 10)
}

pub const fn from_bcd(val: u8) -> u8 {
    (val / 16) * 10 + (val % 16)
}
