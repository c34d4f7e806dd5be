//! Demonstrates plugging a custom [`Transport`] into the request core.
//!
//! 1. Implement [`Transport::send`] for any HTTP stack; return `Ok` for every HTTP response.
//! 2. Hand the transport to [`RequestCore::with_transport`].
//! 3. Classify each response into the crate's [`Error`] taxonomy; the core retries the
//!    transient ones.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use color_eyre::Result;
// self
use mpesa_core::{
	auth::Credentials,
	config::{CoreConfig, RetryConfig},
	context::Context,
	error::{Error, NetworkError, PayoutFailure, ProviderErrorBody},
	http::{HttpRequest, HttpResponse, Transport, TransportFuture},
	obs::Operation,
	request::{Call, RequestCore},
};

/// Answers the token endpoint, then fails the first payout with an outage before accepting it.
#[derive(Default)]
struct FlakyGateway {
	payouts: AtomicUsize,
}
impl Transport for FlakyGateway {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let response = if request.url.path().ends_with("/oauth/v1/generate") {
			HttpResponse::new(200, r#"{"access_token":"local","expires_in":"3599"}"#)
		} else if self.payouts.fetch_add(1, Ordering::SeqCst) == 0 {
			HttpResponse::new(
				503,
				r#"{"errorCode":"503.001.01","errorMessage":"Service unavailable"}"#,
			)
		} else {
			HttpResponse::new(
				200,
				r#"{"ConversationID":"AG_demo","ResponseCode":"2001","ResponseDescription":"The initiator information is invalid."}"#,
			)
		};

		Box::pin(async move { Ok(response) })
	}
}

fn classify_payout(response: HttpResponse) -> Result<String, Error> {
	if !response.is_success() {
		return Err(NetworkError::status(response.status, ProviderErrorBody::parse(&response.body))
			.with_retry_after(response.metadata.retry_after)
			.into());
	}

	let body: serde_json::Value = response.json()?;
	let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(str::to_owned);

	match field("ResponseCode").as_deref() {
		Some("0") => Ok(field("ConversationID").unwrap_or_default()),
		code => Err(PayoutFailure {
			message: field("ResponseDescription").unwrap_or_else(|| "Payout rejected".into()),
			response_code: code.map(str::to_owned),
			conversation_id: field("ConversationID"),
			..Default::default()
		}
		.into()),
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = CoreConfig::default()
		.with_retry(RetryConfig { initial_delay_ms: 200, jitter_ms: 20, ..Default::default() });
	let core = <RequestCore<FlakyGateway>>::with_transport(
		config,
		Credentials::new("demo-key", "demo-secret")?,
		FlakyGateway::default(),
	)?;
	let url = core.endpoint("mpesa/b2c/v3/paymentrequest")?;
	let outcome = core
		.send(
			&Context::background(),
			Call::authenticated(Operation::Payout),
			|token| {
				let token = token.map(|t| t.expose()).unwrap_or_default();

				HttpRequest::post(url.clone()).bearer(token).json(&serde_json::json!({ "Amount": 10 }))
			},
			classify_payout,
		)
		.await;

	match outcome {
		Ok(conversation) => println!("Payout accepted: {conversation}."),
		Err(e) => println!("Payout failed as {} with fields {:?}: {e}.", e.kind(), e.fields()),
	}

	Ok(())
}
