//! Memory-mapped 8-bit registers.
//!
//! Every register on the 328P that we touch is a byte wide; the 16-bit timer and baud rate
//! registers are declared as their separate high and low halves, and the caller is responsible
//! for the access order the datasheet asks for.

use core::{
    marker::PhantomData,
    ops::{BitOr, BitOrAssign},
};

/// A set of bits in register `R`.
///
/// Tying the bits to their register means `TWCR::TWEN | TCCR1B::CS10` won't compile.
pub struct Bits<R> {
    value: u8,
    _reg: PhantomData<R>,
}

// Derives would put the bounds on `R`, which is a unit struct with no impls.
impl<R> Clone for Bits<R> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<R> Copy for Bits<R> {}

impl<R> Bits<R> {
    pub const fn from_raw(value: u8) -> Self {
        Bits {
            value,
            _reg: PhantomData,
        }
    }

    pub const fn none() -> Self {
        Bits::from_raw(0)
    }

    pub const fn raw(self) -> u8 {
        self.value
    }
}

impl<R> BitOr for Bits<R> {
    type Output = Bits<R>;

    fn bitor(self, rhs: Bits<R>) -> Bits<R> {
        Bits::from_raw(self.value | rhs.value)
    }
}

/// This lets us do things like:
///
/// ```ignore
/// let mut bits = TWCR::TWINT | TWCR::TWEN;
/// if ack {
///     bits |= TWCR::TWEA;
/// }
/// TWCR::set_value(bits);
/// ```
impl<R> BitOrAssign for Bits<R> {
    fn bitor_assign(&mut self, rhs: Bits<R>) {
        self.value |= rhs.value;
    }
}

/// Abstracts away the volatile pointer accesses and bit-twiddling needed for an MMIO register.
///
/// Some bits must always be written as 0 (reserved bits, or flags that are cleared by writing
/// a 1), so every write goes through the write mask.
pub trait Register: Sized {
    const ADDR: *mut u8;
    const WRITE_MASK: u8;

    unsafe fn set_raw_value(val: u8) {
        Self::ADDR.write_volatile(val & Self::WRITE_MASK);
    }

    unsafe fn set_value(bits: Bits<Self>) {
        Self::set_raw_value(bits.raw());
    }

    unsafe fn get_value() -> u8 {
        Self::ADDR.read_volatile()
    }

    /// True if every bit in `bits` is set.
    unsafe fn is_set(bits: Bits<Self>) -> bool {
        Self::get_value() & bits.raw() == bits.raw()
    }

    unsafe fn set_bits(bits: Bits<Self>) {
        Self::set_raw_value(Self::get_value() | bits.raw());
    }

    unsafe fn clear_bits(bits: Bits<Self>) {
        Self::set_raw_value(Self::get_value() & !bits.raw());
    }

    /// Replaces the bits under `mask` with those in `new_val`, leaving the rest alone.
    unsafe fn replace_bits(mask: Bits<Self>, new_val: Bits<Self>) {
        let kept = Self::get_value() & !mask.raw();
        Self::set_raw_value(kept | (new_val.raw() & mask.raw()));
    }
}

/// Declares a register, and optionally named constants for its bits, using a structure similar
/// to declaring a struct.
#[macro_export]
macro_rules! reg {
    (
        $(#[$reg_doc:meta])*
        $name:ident {
            addr: $addr:expr,
            write mask: $mask:expr $(,)?
        }
    ) => {
        $(#[$reg_doc])*
        #[allow(dead_code)]
        pub struct $name;
        impl $crate::hal::register::Register for $name {
            const ADDR: *mut u8 = $addr as *mut u8;
            const WRITE_MASK: u8 = $mask;
        }
    };

    (
        $(#[$reg_doc:meta])*
        $name:ident {
            addr: $addr:expr,
            write mask: $mask:expr,
            bits: {
                $( $(#[$bit_doc:meta])* $bit:ident = $id:expr; )+
            }
        }
    ) => {
        $crate::reg! {
            $(#[$reg_doc])*
            $name {
                addr: $addr,
                write mask: $mask,
            }
        }

        #[allow(dead_code)]
        impl $name {
            $(
                $(#[$bit_doc])*
                pub const $bit: $crate::hal::register::Bits<$name> =
                    $crate::hal::register::Bits::from_raw(1 << $id);
            )+
        }
    };
}
