//! Minimal abstraction over the CAN transport and board services (clock,
//! entropy). Allows the engine to plug into various implementations
//! (embedded HAL, desktop driver, test double).
//!
//! The engine is poll-driven and run-to-completion: every method is
//! synchronous and must return promptly, or the whole device loop stalls.
use crate::protocol::frame::Frame;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Wall-clock reading with millisecond resolution.
pub struct Timestamp {
    /// Whole seconds (UNIX epoch or any monotonic base the board provides).
    pub secs: u32,
    /// Sub-second remainder, 0-999.
    pub millis: u16,
}

impl Timestamp {
    pub const fn new(secs: u32, millis: u16) -> Self {
        Self { secs, millis }
    }

    /// Combined millisecond reading. Wraps modulo 2^32, which the elapsed
    /// arithmetic tolerates.
    pub const fn millis_total(self) -> u32 {
        self.secs.wrapping_mul(1000).wrapping_add(self.millis as u32)
    }
}

/// Contract between the device engine and the board it runs on.
pub trait CanIotDriver {
    type Error: core::fmt::Debug;

    /// Fetch the next pending frame. `Ok(None)` means the mailbox is empty,
    /// which routes control to the scheduler rather than failing.
    fn recv(&mut self) -> Result<Option<Frame>, Self::Error>;

    /// Queue a frame for transmission after `delay_ms` milliseconds.
    /// The delay is non-zero only for responses to broadcast queries.
    fn send(&mut self, frame: &Frame, delay_ms: u32) -> Result<(), Self::Error>;

    /// Current wall-clock reading.
    fn get_time(&mut self) -> Timestamp;

    /// Realign the wall clock, in whole seconds.
    fn set_time(&mut self, secs: u32);

    /// Fill `buf` with random bytes (broadcast response jitter).
    fn entropy(&mut self, buf: &mut [u8]);
}
