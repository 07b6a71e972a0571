//! Handle for one BAD16 card on the rack bus.

use adr_traits::BusWriter;
use tracing::{debug, info};

use crate::bus::SettledBus;
use crate::codec::{CardAddress, ControlWord, SerialFrame};
use crate::error::{AdrError, Result};
use crate::registers::{Wreg0, Wreg1};

/// Cached register image of a BAD16 card plus the bus it is reached through.
///
/// Setters update the cached WREG0 only; nothing reaches the card until
/// [`Bad16Card::send_globals`] (or [`Bad16Card::init_memory`]) is called.
#[derive(Debug)]
pub struct Bad16Card<B: BusWriter> {
    address: CardAddress,
    slot: u8,
    globals: Wreg0,
    triangle: Wreg1,
    bus: SettledBus<B>,
}

impl<B: BusWriter> Bad16Card<B> {
    pub fn new(address: CardAddress, slot: u8, bus: SettledBus<B>) -> Self {
        Self {
            address,
            slot,
            globals: Wreg0::default(),
            triangle: Wreg1::default(),
            bus,
        }
    }

    /// Start from a non-default WREG0 image (e.g. configured delay/seqln).
    #[must_use]
    pub fn with_globals(mut self, globals: Wreg0) -> Self {
        self.globals = globals;
        self
    }

    pub const fn address(&self) -> CardAddress {
        self.address
    }

    pub const fn slot(&self) -> u8 {
        self.slot
    }

    pub const fn globals(&self) -> &Wreg0 {
        &self.globals
    }

    pub const fn triangle(&self) -> &Wreg1 {
        &self.triangle
    }

    pub const fn bus(&self) -> &SettledBus<B> {
        &self.bus
    }

    pub const fn set_led_off(&mut self, off: bool) {
        self.globals.led_off = off;
    }

    pub const fn set_status(&mut self, on: bool) {
        self.globals.status = on;
    }

    pub const fn set_seqln(&mut self, seqln: u8) {
        self.globals.seqln = seqln;
    }

    pub fn set_delay(&mut self, delay: u8) -> std::result::Result<(), AdrError> {
        if delay > 0x0f {
            return Err(AdrError::Range {
                field: "wreg0.delay",
                value: u64::from(delay),
                bits: 4,
            });
        }
        self.globals.delay = delay;
        Ok(())
    }

    /// Write an arbitrary control word to this card.
    pub fn send_register(&mut self, word: ControlWord) -> Result<SerialFrame> {
        debug!(address = %self.address, word = word.get(), "send register");
        self.bus.send_word(word, self.address)
    }

    /// Push the cached WREG0 image to the card.
    pub fn send_globals(&mut self) -> Result<SerialFrame> {
        let word = self.globals.to_word()?;
        info!(
            address = %self.address,
            slot = self.slot,
            led_off = self.globals.led_off,
            status = self.globals.status,
            seqln = self.globals.seqln,
            "send card globals"
        );
        self.send_register(word)
    }

    /// Program the triangle generator and remember the parameters.
    pub fn send_triangle(&mut self, triangle: Wreg1) -> Result<SerialFrame> {
        let word = triangle.to_word()?;
        info!(
            address = %self.address,
            dwell = triangle.dwell,
            steps = triangle.steps,
            step = triangle.step,
            "send triangle"
        );
        let frame = self.send_register(word)?;
        self.triangle = triangle;
        Ok(frame)
    }

    /// Set the memory-init flag, writing WREG0 only when the flag changes.
    pub fn init_memory(&mut self, init: bool) -> Result<Option<SerialFrame>> {
        if self.globals.init == init {
            debug!(address = %self.address, init, "init flag unchanged; not sent");
            return Ok(None);
        }
        self.globals.init = init;
        self.send_globals().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use adr_traits::ManualClock;

    #[derive(Default)]
    struct Sink(Vec<Vec<u8>>);

    impl BusWriter for Sink {
        fn write(
            &mut self,
            bytes: &[u8],
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.push(bytes.to_vec());
            Ok(())
        }
    }

    fn card() -> Bad16Card<Sink> {
        let bus = SettledBus::new(
            Sink::default(),
            Arc::new(ManualClock::new()),
            Duration::from_millis(1),
        );
        Bad16Card::new(CardAddress::new(32).unwrap(), 9, bus)
    }

    #[test]
    fn init_memory_sends_only_on_change() {
        let mut c = card();
        assert!(c.init_memory(false).unwrap().is_none());
        let frame = c.init_memory(true).unwrap().expect("flag changed");
        assert!(c.init_memory(true).unwrap().is_none());
        assert_eq!(c.bus().frames_sent(), 1);
        let (word, addr) = crate::codec::decode(&frame).unwrap();
        assert_eq!(addr, 32);
        assert!(Wreg0::from_word(ControlWord::new(word).unwrap()).unwrap().init);
    }

    #[test]
    fn set_delay_checks_width() {
        let mut c = card();
        assert!(c.set_delay(15).is_ok());
        assert!(c.set_delay(16).is_err());
        assert_eq!(c.globals().delay, 15);
    }
}
