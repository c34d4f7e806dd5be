// self
use crate::{_prelude::*, obs::Operation};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by the request core.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("mpesa_core.request", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs that an acquisition is parked behind a quota gate.
pub fn log_admission_wait(gate: &'static str, active: usize, admitted_in_window: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(gate, active, admitted_in_window, "Waiting for rate-limit admission.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (gate, active, admitted_in_window);
	}
}

/// Logs a retry decision.
pub fn log_retry(attempt: u32, delay: Duration, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			attempt,
			delay_ms = delay.as_millis() as u64,
			kind = error.kind().as_str(),
			%error,
			"Retrying after transient failure."
		);
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, error);
	}
}

/// Logs a token exchange failure.
pub fn log_token_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(kind = error.kind().as_str(), %error, "Token exchange failed.");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
