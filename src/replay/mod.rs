//! Records the switch into EEPROM and plays it back on the LED, one sample per tick.
//!
//! The controller starts in [`State::Replay`], walking round the recorded sequence and driving
//! the LED from it. Pressing the switch starts a recording: three flashes, then every tick
//! samples the switch until the buffer is full, then five flashes and back to replaying.
//!
//! All of this runs in the main loop. The timer interrupt only raises the pending tick; the loop
//! takes it and calls [`Controller::on_tick`] followed by [`Controller::acknowledge`].

pub mod sample;

use crate::bus::{Bus, BusError};
use crate::config::{ReplayConfig, BEGIN_FLASHES, END_FLASHES, FLASH_MS};
use crate::devices::eeprom::Eeprom;
use crate::tick::TickControl;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin, PinState},
};
use sample::{bit, Cursor};
use ufmt::{derive::uDebug, uDebug, uWrite, uwrite, Formatter};

/// How long the LED stays lit after re-initialisation, before the finishing flashes.
const REINIT_HOLD_MS: u32 = 1000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, uDebug)]
pub enum State {
    Replay,
    BeginRecording,
    Recording,
    EndRecording,
}

impl State {
    /// The two states that play an acknowledgement rather than wait for a tick.
    pub fn is_transition(self) -> bool {
        matches!(self, State::BeginRecording | State::EndRecording)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error<E> {
    Bus(BusError),
    Pin(E),
}

impl<E> From<BusError> for Error<E> {
    fn from(e: BusError) -> Self {
        Error::Bus(e)
    }
}

impl<E> uDebug for Error<E> {
    fn fmt<W: uWrite + ?Sized>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error> {
        match self {
            Error::Bus(e) => uwrite!(f, "Bus({:?})", e),
            Error::Pin(_) => f.write_str("Pin"),
        }
    }
}

pub struct Controller<B, S, L, D, T> {
    config: ReplayConfig,
    eeprom: Eeprom,
    bus: B,
    switch: S,
    led: L,
    delay: D,
    timer: T,

    state: State,
    cursor: Cursor,
    /// The byte being replayed, or the one being built up while recording.
    sample: u8,
}

impl<B, S, L, D, T, E> Controller<B, S, L, D, T>
where
    B: Bus,
    S: InputPin<Error = E>,
    L: OutputPin<Error = E>,
    D: DelayNs,
    T: TickControl,
{
    pub fn new(
        config: ReplayConfig,
        eeprom: Eeprom,
        bus: B,
        switch: S,
        led: L,
        delay: D,
        timer: T,
    ) -> Self {
        Controller {
            cursor: Cursor::primed(config.first_address()),
            config,
            eeprom,
            bus,
            switch,
            led,
            delay,
            timer,
            state: State::Replay,
            sample: 0,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// The switch pulls the pin low when pressed. No debouncing; every call is a raw sample.
    pub fn switch_pressed(&mut self) -> Result<bool, Error<E>> {
        self.switch.is_low().map_err(Error::Pin)
    }

    fn set_led(&mut self, on: bool) -> Result<(), Error<E>> {
        self.led.set_state(PinState::from(on)).map_err(Error::Pin)
    }

    /// Each flash is on then off for [`FLASH_MS`].
    pub fn flash(&mut self, times: u8) -> Result<(), Error<E>> {
        for _ in 0..times {
            self.set_led(true)?;
            self.delay.delay_ms(FLASH_MS);
            self.set_led(false)?;
            self.delay.delay_ms(FLASH_MS);
        }
        Ok(())
    }

    /// Overwrites the whole sequence with alternating full and empty bytes (800ms on, 800ms off
    /// at the reference tick), then goes back to replaying from the start.
    ///
    /// The tick interrupt should not be running yet.
    pub fn reinitialize(&mut self) -> Result<(), Error<E>> {
        self.state = State::Replay;
        self.cursor = Cursor::primed(self.config.first_address());

        self.flash(BEGIN_FLASHES)?;

        // Lit for as long as the writes take.
        self.set_led(true)?;
        let filled = self.fill_alternating();
        self.delay.delay_ms(REINIT_HOLD_MS);
        self.set_led(false)?;

        self.flash(END_FLASHES)?;

        filled
    }

    fn fill_alternating(&mut self) -> Result<(), Error<E>> {
        let first = self.config.first_address();
        for offset in 0..self.config.sample_count() {
            let value = if offset % 2 == 0 { 0xFF } else { 0x00 };
            self.eeprom
                .write_byte(&mut self.bus, &mut self.delay, first + offset, value)?;
        }
        Ok(())
    }

    /// Runs one step for a timer tick and returns the state it left the controller in.
    ///
    /// A bus failure doesn't stop the sequence from advancing: a failed replay read plays
    /// zeroes, a failed recording write loses that byte. The error is still returned.
    pub fn on_tick(&mut self) -> Result<State, Error<E>> {
        match self.state {
            State::Replay => {
                // Entering a recording takes the whole tick; nothing is replayed.
                if self.switch_pressed()? {
                    self.state = State::BeginRecording;
                } else {
                    self.replay_step()?;
                }
            }
            State::Recording => self.record_step()?,
            State::BeginRecording | State::EndRecording => self.acknowledge()?,
        }

        Ok(self.state)
    }

    /// Plays the acknowledgement for a pending begin/end transition and moves on from it.
    /// Does nothing in the other states.
    pub fn acknowledge(&mut self) -> Result<(), Error<E>> {
        match self.state {
            State::BeginRecording => {
                self.flash_uninterrupted(BEGIN_FLASHES)?;

                self.cursor = Cursor::rewound(self.config.first_address());
                self.state = State::Recording;
                Ok(())
            }
            State::EndRecording => {
                self.flash_uninterrupted(END_FLASHES)?;

                self.cursor = Cursor::primed(self.config.first_address());
                self.state = State::Replay;

                let last = self.config.end_address() - 1;
                self.eeprom
                    .set_last_address(&mut self.bus, &mut self.delay, last)?;
                Ok(())
            }
            State::Replay | State::Recording => Ok(()),
        }
    }

    /// Flashes with the tick masked, so no sample step lands between flashes.
    fn flash_uninterrupted(&mut self, times: u8) -> Result<(), Error<E>> {
        self.timer.pause();
        let flashed = self.flash(times);
        self.timer.resume();
        flashed
    }

    fn replay_step(&mut self) -> Result<(), Error<E>> {
        let mut fetched = Ok(());

        if self.cursor.byte_finished() {
            self.sample = match self.eeprom.read_byte(&mut self.bus, self.cursor.address) {
                Ok(byte) => byte,
                Err(e) => {
                    fetched = Err(Error::Bus(e));
                    0
                }
            };

            self.cursor.address += 1;
            if self.cursor.address >= self.config.end_address() {
                self.cursor.address = self.config.first_address();
            }
            self.cursor.bit = 0;
        }

        self.set_led(bit(self.sample, self.cursor.bit))?;
        self.cursor.bit += 1;

        fetched
    }

    fn record_step(&mut self) -> Result<(), Error<E>> {
        if self.cursor.bit == 0 {
            self.sample = 0;
        }

        let pressed = self.switch_pressed()?;
        if pressed {
            self.sample |= 1 << self.cursor.bit;
        }
        // Feedback for the user.
        self.set_led(pressed)?;

        self.cursor.bit += 1;
        if !self.cursor.byte_finished() {
            return Ok(());
        }

        let written = self.eeprom.write_byte(
            &mut self.bus,
            &mut self.delay,
            self.cursor.address,
            self.sample,
        );

        self.cursor.address += 1;
        if self.cursor.address >= self.config.end_address() {
            self.state = State::EndRecording;
        } else {
            self.cursor.bit = 0;
        }

        written.map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Stage, Status};
    use crate::config::EEPROM_ADDRESS;
    use crate::sim::{FakeLed, FakeSwitch, FakeTimer, Op, SimBus};
    use crate::tick::PendingTick;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinLevel, Transaction as PinTransaction,
    };
    use std::vec::Vec;

    type Rig = Controller<SimBus, FakeSwitch, FakeLed, NoopDelay, FakeTimer>;

    fn rig(bus: SimBus) -> (Rig, FakeSwitch, FakeLed, FakeTimer) {
        let switch = FakeSwitch::default();
        let led = FakeLed::default();
        let timer = FakeTimer::default();
        let controller = Controller::new(
            ReplayConfig::reference().unwrap(),
            Eeprom::new(EEPROM_ADDRESS),
            bus,
            switch.clone(),
            led.clone(),
            NoopDelay::new(),
            timer.clone(),
        );
        (controller, switch, led, timer)
    }

    fn start_recording(controller: &mut Rig, switch: &FakeSwitch) {
        switch.pressed.set(true);
        assert_eq!(controller.on_tick().unwrap(), State::BeginRecording);
        controller.acknowledge().unwrap();
        assert_eq!(controller.state(), State::Recording);
        switch.pressed.set(false);
    }

    #[test]
    fn starts_replaying_with_a_primed_cursor() {
        let (controller, ..) = rig(SimBus::new());
        assert_eq!(controller.state(), State::Replay);
        assert_eq!(controller.cursor(), Cursor::primed(20));
    }

    #[test]
    fn press_moves_to_begin_recording_without_sampling() {
        let (mut controller, switch, led, timer) = rig(SimBus::new());
        switch.pressed.set(true);

        assert_eq!(controller.on_tick().unwrap(), State::BeginRecording);
        assert!(led.levels.borrow().is_empty());
        assert!(controller.bus().log.is_empty());
        assert_eq!(timer.paused.get(), 0);

        controller.acknowledge().unwrap();

        assert_eq!(controller.state(), State::Recording);
        assert_eq!(controller.cursor(), Cursor::rewound(20));
        assert_eq!(led.rising_edges(), 3);
        assert_eq!(timer.paused.get(), 1);
        assert!(!timer.is_paused());
    }

    #[test]
    fn begin_acknowledgement_is_three_exact_flashes() {
        let mut switch = PinMock::new(&[PinTransaction::get(PinLevel::Low)]);
        let mut expected = Vec::new();
        for _ in 0..3 {
            expected.push(PinTransaction::set(PinLevel::High));
            expected.push(PinTransaction::set(PinLevel::Low));
        }
        let mut led = PinMock::new(&expected);

        let mut controller = Controller::new(
            ReplayConfig::reference().unwrap(),
            Eeprom::new(EEPROM_ADDRESS),
            SimBus::new(),
            switch.clone(),
            led.clone(),
            NoopDelay::new(),
            FakeTimer::default(),
        );

        controller.on_tick().unwrap();
        controller.acknowledge().unwrap();
        assert_eq!(controller.state(), State::Recording);

        drop(controller);
        switch.done();
        led.done();
    }

    #[test]
    fn recording_ends_on_the_tick_that_fills_the_last_byte() {
        let (mut controller, switch, led, timer) = rig(SimBus::new());
        start_recording(&mut controller, &switch);

        let ticks = 8 * controller.config().sample_count() as usize;
        let pattern: Vec<bool> = (0..ticks).map(|t| t % 3 == 0).collect();

        for (t, &pressed) in pattern.iter().enumerate() {
            switch.pressed.set(pressed);
            let state = controller.on_tick().unwrap();
            // The LED follows the switch while recording.
            assert_eq!(led.last(), Some(pressed));

            if t + 1 < ticks {
                assert_eq!(state, State::Recording, "tick {}", t);
            } else {
                assert_eq!(state, State::EndRecording);
            }
        }

        let memory = &controller.bus().eeprom.memory;
        for (i, chunk) in pattern.chunks(8).enumerate() {
            let mut samples = [false; 8];
            samples.copy_from_slice(chunk);
            assert_eq!(memory[20 + i], sample::pack(samples), "byte {}", i);
        }
        assert_eq!(memory[27], 0);

        led.clear();
        controller.acknowledge().unwrap();
        assert_eq!(controller.state(), State::Replay);
        assert_eq!(controller.cursor(), Cursor::primed(20));
        assert_eq!(led.rising_edges(), 5);
        assert_eq!(timer.paused.get(), 2);
        assert!(!timer.is_paused());

        // The header now points at the last recorded byte.
        assert_eq!(&controller.bus().eeprom.memory[0..2], &[0, 26]);
    }

    #[test]
    fn replay_wraps_to_the_first_byte() {
        let mut bus = SimBus::new();
        let bytes = [0x01, 0x80, 0xF0, 0x0F, 0xAA, 0x55, 0x3C];
        bus.eeprom.memory[20..27].copy_from_slice(&bytes);
        // Just past the end; must never be played.
        bus.eeprom.memory[27] = 0xFF;

        let (mut controller, _switch, led, _timer) = rig(bus);

        for _ in 0..8 * bytes.len() {
            assert_eq!(controller.on_tick().unwrap(), State::Replay);
        }

        let expected: Vec<bool> = bytes.iter().flat_map(|&b| sample::unpack(b)).collect();
        assert_eq!(*led.levels.borrow(), expected);
        assert_eq!(controller.cursor(), Cursor::primed(20));

        controller.bus_mut().log.clear();
        controller.on_tick().unwrap();

        assert_eq!(led.last(), Some(true));
        assert_eq!(&controller.bus().log[2..4], &[Op::Write(0x00), Op::Write(20)]);
        assert_eq!(controller.cursor(), Cursor { address: 21, bit: 1 });
    }

    #[test]
    fn reinitialize_writes_alternating_bytes() {
        let (mut controller, _switch, led, _timer) = rig(SimBus::new());
        // Pretend we were part way through a replay.
        controller.on_tick().unwrap();

        controller.reinitialize().unwrap();

        let memory = &controller.bus().eeprom.memory;
        assert_eq!(&memory[20..27], &[0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF]);
        assert_eq!(memory[27], 0);
        assert_eq!(memory[20..27].iter().filter(|&&b| b == 0xFF).count(), 4);

        assert_eq!(controller.state(), State::Replay);
        assert_eq!(controller.cursor(), Cursor::primed(20));
        // Three flashes, lit while writing, five flashes.
        assert_eq!(led.rising_edges(), 3 + 1 + 5);
        assert_eq!(led.last(), Some(false));
    }

    #[test]
    fn ticks_during_a_blocking_step_coalesce() {
        static TICK: PendingTick = PendingTick::new();

        let mut bus = SimBus::new();
        bus.tick_during_stop = Some(&TICK);
        let (mut controller, ..) = rig(bus);

        // Seven EEPROM writes, each long enough for a tick to fire.
        controller.reinitialize().unwrap();
        assert_eq!(controller.bus().stops(), 7);
        controller.bus_mut().tick_during_stop = None;

        let mut steps = 0;
        for _ in 0..4 {
            if TICK.take() {
                controller.on_tick().unwrap();
                steps += 1;
            }
        }
        assert_eq!(steps, 1);
    }

    #[test]
    fn failed_replay_read_plays_zero_and_advances() {
        let mut bus = SimBus::new();
        bus.eeprom.memory[20] = 0xFF;
        bus.fail_reads = true;
        let (mut controller, _switch, led, _timer) = rig(bus);

        let err = controller.on_tick().unwrap_err();

        assert_eq!(
            err,
            Error::Bus(BusError { stage: Stage::Receive, status: Status::BusError })
        );
        assert_eq!(led.last(), Some(false));
        assert_eq!(controller.cursor(), Cursor { address: 21, bit: 1 });
        assert_eq!(controller.state(), State::Replay);
    }

    #[test]
    fn failed_record_write_still_advances() {
        let (mut controller, switch, _led, _timer) = rig(SimBus::new());
        start_recording(&mut controller, &switch);
        controller.bus_mut().eeprom.present = false;

        for _ in 0..7 {
            controller.on_tick().unwrap();
        }
        let err = controller.on_tick().unwrap_err();

        assert!(matches!(err, Error::Bus(BusError { stage: Stage::AddressWrite, .. })));
        assert_eq!(controller.cursor(), Cursor::rewound(21));
        assert_eq!(controller.state(), State::Recording);
    }
}
