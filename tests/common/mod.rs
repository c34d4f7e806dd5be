//! Fake gateway shared by the integration tests.

#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use parking_lot::Mutex;
// self
use mpesa_core::{
	auth::Credentials,
	config::{CoreConfig, RetryConfig},
	http::{HttpRequest, HttpResponse, Transport, TransportError, TransportFuture},
};

type Handler = dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, TransportError> + Send + Sync;

/// In-process [`Transport`] answering from a handler and recording every request.
///
/// The handler receives the request and the 0-based index of the call.
pub struct FakeGateway {
	handler: Box<Handler>,
	latency: Duration,
	calls: Mutex<Vec<HttpRequest>>,
}
impl FakeGateway {
	pub fn new<F>(handler: F) -> Arc<Self>
	where
		F: 'static + Send + Sync + Fn(&HttpRequest, usize) -> Result<HttpResponse, TransportError>,
	{
		Self::with_latency(Duration::ZERO, handler)
	}

	pub fn with_latency<F>(latency: Duration, handler: F) -> Arc<Self>
	where
		F: 'static + Send + Sync + Fn(&HttpRequest, usize) -> Result<HttpResponse, TransportError>,
	{
		Arc::new(Self { handler: Box::new(handler), latency, calls: Mutex::new(Vec::new()) })
	}

	pub fn calls(&self) -> Vec<HttpRequest> {
		self.calls.lock().clone()
	}

	pub fn token_calls(&self) -> usize {
		self.calls.lock().iter().filter(|request| is_token_request(request)).count()
	}
}
impl Transport for FakeGateway {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let index = {
			let mut calls = self.calls.lock();

			calls.push(request.clone());

			calls.len() - 1
		};
		let response = (self.handler)(&request, index);
		let latency = self.latency;

		Box::pin(async move {
			if !latency.is_zero() {
				tokio::time::sleep(latency).await;
			}

			response
		})
	}
}

pub fn is_token_request(request: &HttpRequest) -> bool {
	request.url.path().ends_with("/oauth/v1/generate")
}

pub fn token_response(value: &str, expires_in: u64) -> Result<HttpResponse, TransportError> {
	Ok(HttpResponse::new(
		200,
		format!(r#"{{"access_token":"{value}","expires_in":"{expires_in}"}}"#),
	))
}

pub fn credentials() -> Credentials {
	Credentials::new("consumer-key", "consumer-secret")
		.expect("Credential fixture should be valid.")
}

pub fn config_without_jitter() -> CoreConfig {
	CoreConfig::default().with_retry(RetryConfig { jitter_ms: 0, ..Default::default() })
}
