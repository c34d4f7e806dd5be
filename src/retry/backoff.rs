//! Exponential backoff with bounded jitter.

// self
use crate::{_prelude::*, clock, config::RetryConfig};

/// Delay schedule for retries.
#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
	initial: Duration,
	max: Duration,
	factor: f64,
	jitter: Duration,
}
impl Backoff {
	/// Creates a schedule; `factor` below 1 is treated as 1.
	pub fn new(initial: Duration, max: Duration, factor: f64, jitter: Duration) -> Self {
		let factor = if factor.is_finite() && factor >= 1.0 { factor } else { 1.0 };

		Self { initial, max: max.max(initial), factor, jitter }
	}

	/// Builds the schedule from the retry section of the configuration.
	pub fn from_config(config: &RetryConfig) -> Self {
		Self::new(
			Duration::from_millis(config.initial_delay_ms),
			Duration::from_millis(config.max_delay_ms),
			config.backoff_factor,
			Duration::from_millis(config.jitter_ms),
		)
	}

	/// Upper bound of the random addition.
	pub fn jitter(&self) -> Duration {
		self.jitter
	}

	/// `min(max, initial * factor^(retry - 1))` for 1-indexed `retry`; zero for `retry == 0`.
	pub fn base_delay(&self, retry: u32) -> Duration {
		if retry == 0 {
			return Duration::ZERO;
		}

		let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
		let millis = self.initial.as_millis() as f64 * self.factor.powi(exponent);

		if !millis.is_finite() || millis >= self.max.as_millis() as f64 {
			self.max
		} else {
			Duration::from_millis(millis as u64)
		}
	}

	/// Delay before retry `retry`, honoring a provider hint when it asks for a longer wait.
	pub fn delay(&self, retry: u32, hint: Option<Duration>) -> Duration {
		let base = self.base_delay(retry);
		let base = match hint {
			Some(hint) if hint > base => hint.min(self.max),
			_ => base,
		};

		base + clock::jitter(self.jitter)
	}
}
