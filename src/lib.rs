//! Demonstration firmware for the Toadstool mega328 board.
//!
//! The parts that don't care which chip they run on live at the top level so they can be
//! tested on the host: the two-wire bus contract, the register-level device drivers for the
//! MCP79400 RTC and 24LC EEPROM, and the record/replay controller.
//!
//! The `hal` module is the ATmega328P side of things and only exists when building for AVR.

#![no_std]
#![cfg_attr(
    target_arch = "avr",
    feature(asm_experimental_arch, abi_avr_interrupt)
)]

#[cfg(test)]
extern crate std;

#[cfg(target_arch = "avr")]
#[macro_use]
pub mod hal;

pub mod bus;
pub mod config;
pub mod devices;
pub mod replay;
pub mod tick;

#[cfg(test)]
mod sim;
