//! Bounded busy waiting on hardware status bits

/// The hardware did not reach the expected state in time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout;

/// Number of status reads before giving up.
pub const POLL_LIMIT: u32 = 0xFFFF;

/// Spins until `done` returns `true`, at most [`POLL_LIMIT`] times.
pub(crate) fn until<F: FnMut() -> bool>(mut done: F) -> Result<(), Timeout> {
    for _ in 0..POLL_LIMIT {
        if done() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(Timeout)
}
