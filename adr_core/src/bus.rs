//! Shared card bus with the mandatory inter-frame gap.

use std::sync::Arc;
use std::time::Duration;

use adr_traits::{BusWriter, Clock};

use crate::codec::{CardAddress, ControlWord, SerialFrame};
use crate::error::Result;
use crate::hw_error::HwResultExt;

/// Cards latch a frame only if the bus stays quiet this long afterwards.
pub const MIN_FRAME_GAP: Duration = Duration::from_millis(1);

pub struct SettledBus<B: BusWriter> {
    writer: B,
    clock: Arc<dyn Clock + Send + Sync>,
    gap: Duration,
    frames_sent: u64,
}

impl<B: BusWriter> core::fmt::Debug for SettledBus<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SettledBus")
            .field("gap", &self.gap)
            .field("frames_sent", &self.frames_sent)
            .finish_non_exhaustive()
    }
}

impl<B: BusWriter> SettledBus<B> {
    /// `gap` is raised to [`MIN_FRAME_GAP`] when shorter.
    pub fn new(writer: B, clock: Arc<dyn Clock + Send + Sync>, gap: Duration) -> Self {
        Self {
            writer,
            clock,
            gap: gap.max(MIN_FRAME_GAP),
            frames_sent: 0,
        }
    }

    /// Write one frame, then wait out the gap.
    pub fn send(&mut self, frame: &SerialFrame) -> Result<()> {
        tracing::trace!(frame = %frame, "bus write");
        self.writer.write(frame.as_bytes()).hw("write bus frame")?;
        self.frames_sent += 1;
        self.clock.sleep(self.gap);
        Ok(())
    }

    pub fn send_word(&mut self, word: ControlWord, address: CardAddress) -> Result<SerialFrame> {
        let frame = SerialFrame::from_parts(word, address);
        self.send(&frame)?;
        Ok(frame)
    }

    pub const fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub const fn gap(&self) -> Duration {
        self.gap
    }

    pub const fn writer(&self) -> &B {
        &self.writer
    }

    pub fn into_inner(self) -> B {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adr_traits::ManualClock;

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

    #[test]
    fn zero_gap_is_raised_to_minimum() {
        let clock = ManualClock::new();
        let mut bus = SettledBus::new(Sink(Vec::new()), Arc::new(clock.clone()), Duration::ZERO);
        assert_eq!(bus.gap(), MIN_FRAME_GAP);
        let frame = crate::codec::encode(1, 2).unwrap();
        bus.send(&frame).unwrap();
        bus.send(&frame).unwrap();
        assert_eq!(bus.frames_sent(), 2);
        assert_eq!(clock.elapsed(), 2 * MIN_FRAME_GAP);
        assert_eq!(bus.into_inner().0, vec![frame.as_bytes().to_vec(); 2]);
    }
}
