// self
use crate::obs::{Operation, Outcome};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"mpesa_core_request_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Records one retry scheduled by the orchestrator.
pub fn record_retry(operation: Operation) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("mpesa_core_retry_total", "operation" => operation.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = operation;
	}
}

/// Records a token endpoint exchange and whether it installed a token.
pub fn record_token_exchange(outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("mpesa_core_token_exchange_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Publishes the number of outstanding rate-limit permits.
pub fn record_active_requests(active: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!("mpesa_core_active_requests").set(active as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = active;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_a_global_recorder() {
		record_request_outcome(Operation::StkPush, Outcome::Failure);
		record_retry(Operation::Payout);
		record_token_exchange(Outcome::Success);
		record_active_requests(3);
	}
}
