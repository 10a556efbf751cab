//! There's nothing we can do to handle a panic, so just go into a loop and blink the LED.

use crate::hal::{
    delay_millis,
    ports::{PinMode, Port, PortB},
    STATUS_LED,
};

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    crate::hal::disable_interrupts();
    PortB::set_pin_mode(STATUS_LED, PinMode::Output);
    loop {
        PortB::set_pin_toggle(STATUS_LED);
        delay_millis(500);
    }
}
