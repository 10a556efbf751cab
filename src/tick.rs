//! The periodic tick shared between the timer interrupt and the main loop.
//!
//! The interrupt handler's only job is to [`raise`](PendingTick::raise) the flag. The main loop
//! [`take`](PendingTick::take)s it and runs one controller step. Ticks aren't counted: if the
//! main loop is busy for longer than a tick period, the extra ticks collapse into the one
//! already pending rather than queueing up.

use crate::config::{CPU_FREQ, TICK_PRESCALE};
use core::sync::atomic::{AtomicBool, Ordering};

pub struct PendingTick(AtomicBool);

impl PendingTick {
    pub const fn new() -> PendingTick {
        PendingTick(AtomicBool::new(false))
    }

    /// Called from the interrupt handler.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether a tick was pending, clearing it.
    ///
    /// AVR has no atomic swap, so this is a load followed by a store. A tick landing between
    /// the two is folded into the one being taken.
    pub fn take(&self) -> bool {
        if self.0.load(Ordering::Acquire) {
            self.0.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for PendingTick {
    fn default() -> Self {
        PendingTick::new()
    }
}

/// Masking and unmasking the tick interrupt, for stretches of work that mustn't be interleaved
/// with a sample step.
pub trait TickControl {
    fn pause(&mut self);
    fn resume(&mut self);
}

impl<T: TickControl + ?Sized> TickControl for &mut T {
    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }
}

/// The Timer1 compare value for a tick of `period_ms`, or `None` if it won't fit in 16 bits.
///
/// The timer counts from 0 up to and including the compare value, hence the `- 1`.
pub fn compare_value(period_ms: u16) -> Option<u16> {
    if period_ms == 0 {
        return None;
    }

    let counts_per_sec = CPU_FREQ / TICK_PRESCALE;
    let counts = (counts_per_sec * period_ms as u32 + 500) / 1000;

    match counts {
        0 => None,
        c if c - 1 > u16::MAX as u32 => None,
        c => Some((c - 1) as u16),
    }
}
