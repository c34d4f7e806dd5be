//! Bounded, classified retries with exponential backoff and jitter.
//!
//! [`RetryOrchestrator::execute`] runs one attempt, asks a [`RetryPredicate`] whether the failure
//! is transient, and if so sleeps per [`Backoff`] before the next attempt. Terminal failures and
//! the final failure after exhaustion are returned verbatim. Every attempt and every delay runs
//! under the caller's [`Context`], so cancellation aborts the wait immediately.

mod backoff;

pub use backoff::Backoff;

// self
use crate::{_prelude::*, config::RetryConfig, context::Context, error::ErrorKind, obs};

/// Classifies failures as transient (retryable) or terminal.
pub trait RetryPredicate
where
	Self: Send + Sync,
{
	/// Returns `true` when another attempt may succeed.
	fn is_retryable(&self, error: &Error) -> bool;
}
impl<F> RetryPredicate for F
where
	F: Send + Sync + Fn(&Error) -> bool,
{
	fn is_retryable(&self, error: &Error) -> bool {
		self(error)
	}
}

/// Retries network failures and a narrow set of provider codes.
///
/// `Validation` and `Authentication` failures are never retried. Operation failures are retried
/// only when their provider code is listed as transient; any other operation failure is a
/// completed remote decision. Caller cancellation and deadlines are never retried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefaultRetryPredicate {
	transient_codes: Vec<String>,
}
impl DefaultRetryPredicate {
	/// Creates a predicate treating `codes` as transient.
	pub fn new<I, S>(codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { transient_codes: codes.into_iter().map(Into::into).collect() }
	}

	/// Uses the configured transient codes.
	pub fn from_config(config: &RetryConfig) -> Self {
		Self::new(config.transient_codes.iter().cloned())
	}

	fn is_transient_code(&self, code: Option<&str>) -> bool {
		code.is_some_and(|code| self.transient_codes.iter().any(|c| c == code))
	}
}
impl RetryPredicate for DefaultRetryPredicate {
	fn is_retryable(&self, error: &Error) -> bool {
		match error.kind() {
			ErrorKind::Network => !error.is_interrupted(),
			ErrorKind::Authentication | ErrorKind::Validation => false,
			ErrorKind::Operation(_) => self.is_transient_code(error.provider_code()),
		}
	}
}

/// Wraps a single logical operation with bounded retries.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryOrchestrator {
	max_retries: u32,
	backoff: Backoff,
}
impl RetryOrchestrator {
	/// Creates an orchestrator allowing `max_retries` additional attempts.
	pub fn new(max_retries: u32, backoff: Backoff) -> Self {
		Self { max_retries, backoff }
	}

	/// Builds the orchestrator from the retry section of the configuration.
	pub fn from_config(config: &RetryConfig) -> Self {
		Self::new(config.max_retries, Backoff::from_config(config))
	}

	/// Additional attempts allowed after the first.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Delay schedule.
	pub fn backoff(&self) -> &Backoff {
		&self.backoff
	}

	/// Runs `op` until it succeeds, fails terminally, or the retry budget is spent.
	///
	/// `op` receives the 1-indexed attempt number. The orchestrator never constructs errors of
	/// its own beyond the interruption reported by `ctx`.
	pub async fn execute<F, Fut, T, P>(&self, ctx: &Context, mut op: F, predicate: &P) -> Result<T>
	where
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T>>,
		P: ?Sized + RetryPredicate,
	{
		let mut retries = 0_u32;

		loop {
			let attempt = retries.saturating_add(1);
			let error = match ctx.run("gateway call", op(attempt)).await? {
				Ok(value) => return Ok(value),
				Err(error) => error,
			};

			if retries >= self.max_retries || !predicate.is_retryable(&error) {
				return Err(error);
			}

			let delay = self.backoff.delay(attempt, error.retry_after());

			obs::log_retry(attempt, delay, &error);
			ctx.sleep("retry backoff", delay).await?;

			// Below `max_retries`, so this never overflows.
			retries += 1;
		}
	}
}
impl Default for RetryOrchestrator {
	fn default() -> Self {
		Self::from_config(&RetryConfig::default())
	}
}
