//! Wall-clock and jitter sources.
//!
//! Token expiry is tracked in wall-clock time through [`Clock`] so tests can move time forward
//! without sleeping. Admission windows and retry delays use `tokio::time::Instant`, which tests
//! control with paused tokio time.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Source of the current UTC instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns "now".
	fn now_utc(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now_utc(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced [`Clock`] for tests and simulations.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward (or backward for negative durations).
	pub fn advance(&self, by: TimeDuration) {
		*self.0.lock() += by;
	}

	/// Replaces the current instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now_utc(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Uniformly random duration in `[0, max]`, at millisecond resolution.
pub fn jitter(max: Duration) -> Duration {
	let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);

	if max_ms == 0 {
		return Duration::ZERO;
	}

	Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
