//! Quota bookkeeping shared by every caller of one limiter.

// self
use crate::{_prelude::*, config::RateLimitConfig};

/// Result of one admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Admission {
	/// Counters were incremented; the caller owns a slot.
	Admitted,
	/// Concurrency ceiling reached; wait for a release.
	Saturated,
	/// Window budget spent; wait for the boundary.
	Exhausted {
		/// Start of the next window.
		next_window: Instant,
	},
}

/// Concurrency and fixed-window counters.
///
/// Windows are aligned to `origin`: window `n` covers `[origin + n * window, origin + (n + 1) *
/// window)`. `admitted_in_window` resets only when a later window is observed.
#[derive(Debug)]
pub(crate) struct QuotaWindow {
	origin: Instant,
	window: Duration,
	max_concurrent: usize,
	max_per_window: usize,
	window_index: u128,
	window_start: Instant,
	active: usize,
	admitted_in_window: usize,
}
impl QuotaWindow {
	pub(crate) fn new(origin: Instant, config: &RateLimitConfig) -> Self {
		Self {
			origin,
			window: config.window_duration().max(Duration::from_millis(1)),
			max_concurrent: config.max_concurrent.max(1),
			max_per_window: config.max_per_window.max(1),
			window_index: 0,
			window_start: origin,
			active: 0,
			admitted_in_window: 0,
		}
	}

	pub(crate) fn active(&self) -> usize {
		self.active
	}

	pub(crate) fn admitted_in_window(&self) -> usize {
		self.admitted_in_window
	}

	pub(crate) fn window_start(&self) -> Instant {
		self.window_start
	}

	/// Advances to the window containing `now`; never moves backwards.
	pub(crate) fn roll(&mut self, now: Instant) {
		let elapsed = now.saturating_duration_since(self.origin).as_nanos();
		let index = elapsed / self.window.as_nanos();

		if index > self.window_index {
			let offset = u64::try_from(index * self.window.as_nanos()).unwrap_or(u64::MAX);

			self.window_index = index;
			self.window_start = self.origin + Duration::from_nanos(offset);
			self.admitted_in_window = 0;
		}
	}

	/// Evaluates both gates in one step and claims a slot when both pass.
	pub(crate) fn try_admit(&mut self, now: Instant) -> Admission {
		self.roll(now);

		if self.active >= self.max_concurrent {
			return Admission::Saturated;
		}
		if self.admitted_in_window >= self.max_per_window {
			return Admission::Exhausted { next_window: self.window_start + self.window };
		}

		self.active += 1;
		self.admitted_in_window += 1;

		Admission::Admitted
	}

	pub(crate) fn release(&mut self) {
		debug_assert!(self.active > 0, "Released more permits than were admitted.");

		self.active = self.active.saturating_sub(1);
	}
}
