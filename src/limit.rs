//! Admission control by concurrency ceiling and fixed time window.
//!
//! [`RateLimiter::acquire`] admits a caller only when fewer than `max_concurrent` permits are
//! outstanding and the current window still has budget. Both gates are evaluated in one critical
//! section over a [`QuotaWindow`](window::QuotaWindow). Callers blocked on concurrency wait for a
//! release notification; callers blocked on budget sleep until the next window boundary. The
//! returned [`RatePermit`] gives the slot back when dropped, so every exit path (including
//! cancellation and panics) releases exactly once.

mod window;

// crates.io
use tokio::sync::Notify;
// self
use crate::{_prelude::*, config::RateLimitConfig, context::Context, obs};
use window::{Admission, QuotaWindow};

struct Shared {
	quota: Mutex<QuotaWindow>,
	released: Notify,
}
impl Shared {
	fn release(&self) {
		let active = {
			let mut quota = self.quota.lock();

			quota.release();

			quota.active()
		};

		obs::record_active_requests(active);

		self.released.notify_waiters();
	}
}

/// Point-in-time view of the limiter counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaSnapshot {
	/// Outstanding permits.
	pub active: usize,
	/// Admissions in the current window.
	pub admitted_in_window: usize,
	/// Start of the current window.
	pub window_start: Instant,
}

/// Shared admission controller for one client instance.
#[derive(Clone)]
pub struct RateLimiter {
	shared: Arc<Shared>,
	config: RateLimitConfig,
}
impl RateLimiter {
	const STAGE: &'static str = "rate-limit admission";

	/// Creates a limiter whose windows are aligned to the current instant.
	pub fn new(config: RateLimitConfig) -> Self {
		let quota = QuotaWindow::new(Instant::now(), &config);
		let shared = Arc::new(Shared { quota: Mutex::new(quota), released: Notify::new() });

		Self { shared, config }
	}

	/// Configuration the limiter was built with.
	pub fn config(&self) -> &RateLimitConfig {
		&self.config
	}

	/// Waits for a slot under both gates.
	///
	/// Returns a `Network` error with a `Cancelled` or `TimedOut` cause when `ctx` is interrupted
	/// first; counters are untouched in that case.
	pub async fn acquire(&self, ctx: &Context) -> Result<RatePermit> {
		loop {
			// Register interest before checking so a release between the check and the wait is
			// not missed.
			let released = self.shared.released.notified();

			tokio::pin!(released);

			released.as_mut().enable();

			let next_window = match self.try_admit() {
				Ok(permit) => return Ok(permit),
				Err(next_window) => next_window,
			};

			match next_window {
				None => ctx.run(Self::STAGE, released).await?,
				Some(at) => ctx.run(Self::STAGE, tokio::time::sleep_until(at)).await?,
			}
		}
	}

	/// Claims a slot without waiting, if both gates allow it.
	pub fn try_acquire(&self) -> Option<RatePermit> {
		self.try_admit().ok()
	}

	/// Current counters, after rolling the window forward to now.
	pub fn snapshot(&self) -> QuotaSnapshot {
		let mut quota = self.shared.quota.lock();

		quota.roll(Instant::now());

		QuotaSnapshot {
			active: quota.active(),
			admitted_in_window: quota.admitted_in_window(),
			window_start: quota.window_start(),
		}
	}

	/// `Err(None)` means saturated, `Err(Some(at))` means the window budget is spent until `at`.
	fn try_admit(&self) -> Result<RatePermit, Option<Instant>> {
		let mut quota = self.shared.quota.lock();

		match quota.try_admit(Instant::now()) {
			Admission::Admitted => {
				obs::record_active_requests(quota.active());

				Ok(RatePermit { shared: Some(self.shared.clone()) })
			},
			Admission::Saturated => {
				obs::log_admission_wait("concurrency", quota.active(), quota.admitted_in_window());

				Err(None)
			},
			Admission::Exhausted { next_window } => {
				obs::log_admission_wait("window", quota.active(), quota.admitted_in_window());

				Err(Some(next_window))
			},
		}
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("config", &self.config).finish()
	}
}

/// Outstanding admission; releases its slot when dropped.
#[must_use = "dropping the permit releases the slot immediately"]
pub struct RatePermit {
	shared: Option<Arc<Shared>>,
}
impl RatePermit {
	/// Releases the slot now.
	pub fn release(mut self) {
		if let Some(shared) = self.shared.take() {
			shared.release();
		}
	}
}
impl Drop for RatePermit {
	fn drop(&mut self) {
		if let Some(shared) = self.shared.take() {
			shared.release();
		}
	}
}
impl Debug for RatePermit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RatePermit(..)")
	}
}
