//! Optional observability helpers for gateway requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `mpesa_core.request` with the `operation` and
//!   `stage` fields, plus `debug`/`warn` events for admission waits and retries.
//! - Enable `metrics` to increment `mpesa_core_request_total` (labeled by `operation` +
//!   `outcome`), `mpesa_core_retry_total`, and `mpesa_core_token_exchange_total`, and to publish
//!   the `mpesa_core_active_requests` gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations that run through the request core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Token generation (client credentials exchange).
	GenerateToken,
	/// STK push payment initiation.
	StkPush,
	/// Payout (B2C disbursement).
	Payout,
	/// Callback URL registration.
	RegisterUrl,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::GenerateToken => "generate_token",
			Operation::StkPush => "stk_push",
			Operation::Payout => "payout",
			Operation::RegisterUrl => "register_url",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to the request core.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
