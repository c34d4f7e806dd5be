//! Caller-supplied deadline and cancellation signal threaded through every suspension point.
//!
//! Rate-limit admission, single-flight token waits, and retry delays all run through
//! [`Context::run`], so a cancelled or expired context interrupts them promptly with a
//! [`NetworkError`] whose cause is `Cancelled` or `TimedOut`.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::NetworkError};

/// Deadline plus cancellation handle for one logical operation.
///
/// The default context never expires and cannot be cancelled.
#[derive(Clone, Debug, Default)]
pub struct Context {
	deadline: Option<Instant>,
	cancellation: Option<CancellationToken>,
}
impl Context {
	/// Context without deadline or cancellation.
	pub fn background() -> Self {
		Self::default()
	}

	/// Sets the deadline to `timeout` from now.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Sets an absolute deadline; an earlier existing deadline wins.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current < deadline => current,
			_ => deadline,
		});

		self
	}

	/// Attaches a cancellation token.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = Some(token);

		self
	}

	/// Configured deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns `true` once the token fired or the deadline passed.
	pub fn is_done(&self) -> bool {
		self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
			|| self.deadline.is_some_and(|at| Instant::now() >= at)
	}

	/// Drives `fut` until it completes or the context is interrupted.
	///
	/// Cancellation is checked before the deadline, and both before `fut`, so an already
	/// interrupted context never polls `fut`. `stage` names the wait in the returned error.
	pub async fn run<F>(&self, stage: &'static str, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		let cancelled = async {
			match &self.cancellation {
				Some(token) => token.cancelled().await,
				None => std::future::pending().await,
			}
		};
		let expired = async {
			match self.deadline {
				Some(at) => tokio::time::sleep_until(at).await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			biased;

			_ = cancelled => Err(NetworkError::cancelled(stage).into()),
			_ = expired => Err(NetworkError::timed_out(stage).into()),
			output = fut => Ok(output),
		}
	}

	/// Sleeps for `delay` unless interrupted first.
	pub async fn sleep(&self, stage: &'static str, delay: Duration) -> Result<()> {
		self.run(stage, tokio::time::sleep(delay)).await
	}
}
