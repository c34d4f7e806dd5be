//! Single entry point every gateway operation runs through.
//!
//! [`RequestCore::execute`] acquires a rate-limit permit, obtains a bearer token when the call
//! needs one, and runs the caller's attempt closure under the retry orchestrator. The permit is
//! held for the whole logical operation, so retries never count twice against the window budget
//! but do keep occupying one concurrency slot. Token failures return immediately; they never
//! consume a retry attempt.

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, Credentials, TokenManager, TokenSecret},
	clock::Clock,
	config::CoreConfig,
	context::Context,
	error::ConfigError,
	http::{HttpRequest, HttpResponse, Transport},
	limit::RateLimiter,
	obs::{self, Operation, Outcome, RequestSpan},
	retry::{DefaultRetryPredicate, RetryOrchestrator, RetryPredicate},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Request core specialized for the crate's default reqwest transport.
pub type ReqwestCore = RequestCore<ReqwestHttpClient>;

/// Describes one logical operation submitted to [`RequestCore::execute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Call {
	/// Operation label for spans and metrics.
	pub operation: Operation,
	/// Whether a bearer token must be obtained before the first attempt.
	pub needs_auth: bool,
}
impl Call {
	/// Call that requires a bearer token.
	pub const fn authenticated(operation: Operation) -> Self {
		Self { operation, needs_auth: true }
	}

	/// Call that runs without a bearer token.
	pub const fn anonymous(operation: Operation) -> Self {
		Self { operation, needs_auth: false }
	}
}

/// Owns the token cache, quota state, and retry policy for one client instance.
///
/// Operation callers share one core by reference; there is no process-global state.
pub struct RequestCore<T = dyn Transport>
where
	T: ?Sized + Transport,
{
	config: CoreConfig,
	transport: Arc<T>,
	tokens: TokenManager<T>,
	limiter: RateLimiter,
	retry: RetryOrchestrator,
	predicate: Arc<dyn RetryPredicate>,
}
impl<T> RequestCore<T>
where
	T: ?Sized + Transport,
{
	/// Creates a core over the caller-provided transport.
	pub fn with_transport(
		config: CoreConfig,
		credentials: Credentials,
		transport: impl Into<Arc<T>>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let transport = transport.into();
		let tokens = TokenManager::new(transport.clone(), credentials, &config)?;

		Ok(Self {
			limiter: RateLimiter::new(config.rate.clone()),
			retry: RetryOrchestrator::from_config(&config.retry),
			predicate: Arc::new(DefaultRetryPredicate::from_config(&config.retry)),
			tokens,
			transport,
			config,
		})
	}

	/// Replaces the wall clock used for token expiry.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.tokens = self.tokens.with_clock(clock);

		self
	}

	/// Replaces the retry classification.
	pub fn with_retry_predicate(mut self, predicate: impl 'static + RetryPredicate) -> Self {
		self.predicate = Arc::new(predicate);

		self
	}

	/// Immutable configuration.
	pub fn config(&self) -> &CoreConfig {
		&self.config
	}

	/// Shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Token manager.
	pub fn tokens(&self) -> &TokenManager<T> {
		&self.tokens
	}

	/// Admission controller.
	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}

	/// Retry orchestrator.
	pub fn retry(&self) -> &RetryOrchestrator {
		&self.retry
	}

	/// Absolute URL for an API path in the configured environment.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		self.config.environment.endpoint(path)
	}

	/// Runs one logical operation under admission control, authentication, and retries.
	///
	/// `op` performs a single attempt; it receives the bearer token (when `call.needs_auth`) and
	/// the 1-indexed attempt number.
	pub async fn execute<F, Fut, R>(&self, ctx: &Context, call: Call, mut op: F) -> Result<R>
	where
		F: FnMut(Option<TokenSecret>, u32) -> Fut,
		Fut: Future<Output = Result<R>>,
	{
		let span = RequestSpan::new(call.operation, "execute");

		obs::record_request_outcome(call.operation, Outcome::Attempt);

		let result = span
			.instrument(async {
				let _permit = self.limiter.acquire(ctx).await?;
				let token = if call.needs_auth {
					Some(self.tokens.get_valid_token(ctx).await?.value)
				} else {
					None
				};

				self.retry
					.execute(
						ctx,
						|attempt| {
							if attempt > 1 {
								obs::record_retry(call.operation);
							}

							op(token.clone(), attempt)
						},
						self.predicate.as_ref(),
					)
					.await
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(call.operation, Outcome::Success),
			Err(_) => obs::record_request_outcome(call.operation, Outcome::Failure),
		}

		result
	}

	/// Token generation as an operation: admitted by the limiter and retried on transient
	/// failures, served from the cache when fresh.
	pub async fn generate_token(&self, ctx: &Context) -> Result<CachedToken> {
		self.execute(ctx, Call::anonymous(Operation::GenerateToken), move |_, _| {
			self.tokens.get_valid_token(ctx)
		})
		.await
	}

	/// Builds, sends, and classifies one HTTP request per attempt.
	///
	/// Transport failures become `Network` errors. A `401` on an authenticated call drops the
	/// cached token so the next operation exchanges credentials again.
	pub async fn send<B, C, R>(&self, ctx: &Context, call: Call, build: B, classify: C) -> Result<R>
	where
		B: Fn(Option<&TokenSecret>) -> Result<HttpRequest>,
		C: Fn(HttpResponse) -> Result<R>,
	{
		let build = &build;
		let classify = &classify;

		self.execute(ctx, call, move |token, _| async move {
			let request = build(token.as_ref())?;
			let response = self.transport.send(request).await?;

			if call.needs_auth && response.status == 401 {
				self.tokens.invalidate();
			}

			classify(response)
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl RequestCore<ReqwestHttpClient> {
	/// Creates a core that provisions its own reqwest-backed transport.
	pub fn new(config: CoreConfig, credentials: Credentials) -> Result<Self, ConfigError> {
		Self::with_transport(config, credentials, ReqwestHttpClient::default())
	}
}
impl<T> Debug for RequestCore<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestCore")
			.field("config", &self.config)
			.field("tokens", &self.tokens)
			.field("limiter", &self.limiter)
			.field("retry", &self.retry)
			.finish()
	}
}
