//! Token acquisition with caching and singleflight refreshes.
//!
//! [`TokenManager::get_valid_token`] serves the cached token while it is outside the refresh
//! margin and otherwise performs one client-credentials exchange. An async guard serialises
//! refreshes; callers that queued behind an in-flight refresh adopt its outcome (the new token or
//! the same error) instead of stampeding the token endpoint. The manager never retries; retry
//! policy is layered outside by the request core.

mod metrics;

pub use metrics::TokenMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CachedToken, Credentials, token::TokenResponse},
	clock::{Clock, SystemClock},
	config::CoreConfig,
	context::Context,
	error::{AuthenticationError, ConfigError, NetworkError, ProviderErrorBody},
	http::{HttpRequest, HttpResponse, Transport},
	obs::{self, Outcome},
};

const TOKEN_PATH: &str = "oauth/v1/generate";

#[derive(Default)]
struct TokenState {
	cached: Option<CachedToken>,
	/// Bumped every time an exchange resolves, successfully or not.
	epoch: u64,
	last_failure: Option<Error>,
}

/// Owns the credentials and the cached access token for one client instance.
pub struct TokenManager<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	credentials: Credentials,
	endpoint: Url,
	margin: TimeDuration,
	clock: Arc<dyn Clock>,
	state: Mutex<TokenState>,
	refresh_guard: AsyncMutex<()>,
	metrics: Arc<TokenMetrics>,
}
impl<T> TokenManager<T>
where
	T: ?Sized + Transport,
{
	/// Creates a manager targeting the configured environment's token endpoint.
	pub fn new(
		transport: impl Into<Arc<T>>,
		credentials: Credentials,
		config: &CoreConfig,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		let mut endpoint = config.environment.endpoint(TOKEN_PATH)?;

		endpoint.query_pairs_mut().append_pair("grant_type", "client_credentials");

		Ok(Self {
			transport: transport.into(),
			credentials,
			endpoint,
			margin: config.token.refresh_margin(),
			clock: Arc::new(SystemClock),
			state: Default::default(),
			refresh_guard: AsyncMutex::new(()),
			metrics: Default::default(),
		})
	}

	/// Replaces the wall clock used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Shared counters for lookups and exchanges.
	pub fn metrics(&self) -> &Arc<TokenMetrics> {
		&self.metrics
	}

	/// Refresh safety margin.
	pub fn margin(&self) -> TimeDuration {
		self.margin
	}

	/// Returns the cached token without checking freshness.
	pub fn cached(&self) -> Option<CachedToken> {
		self.state.lock().cached.clone()
	}

	/// Drops the cached token so the next lookup performs an exchange.
	///
	/// Callers use this after the gateway reports the bearer token as invalid.
	pub fn invalidate(&self) {
		self.state.lock().cached = None;
	}

	/// Returns a token that will not expire within the refresh margin, exchanging credentials
	/// when needed.
	pub async fn get_valid_token(&self, ctx: &Context) -> Result<CachedToken> {
		let observed_epoch = {
			let state = self.state.lock();

			if let Some(token) = self.fresh(&state) {
				return Ok(token);
			}

			state.epoch
		};
		let _singleflight = ctx.run("token refresh", self.refresh_guard.lock()).await?;

		{
			let state = self.state.lock();

			if let Some(token) = self.fresh(&state) {
				return Ok(token);
			}
			// A refresh resolved while this caller was queued; share its outcome.
			if state.epoch != observed_epoch {
				if let Some(err) = &state.last_failure {
					return Err(err.clone());
				}
				if let Some(token) =
					state.cached.as_ref().filter(|t| !t.is_expired_at(self.clock.now_utc()))
				{
					return Ok(token.clone());
				}
			}
		}

		self.exchange(ctx).await
	}

	fn fresh(&self, state: &TokenState) -> Option<CachedToken> {
		let token = state.cached.as_ref()?;

		if token.is_fresh_at(self.clock.now_utc(), self.margin) {
			self.metrics.record_cache_hit();

			Some(token.clone())
		} else {
			None
		}
	}

	async fn exchange(&self, ctx: &Context) -> Result<CachedToken> {
		self.metrics.record_exchange();

		let request = HttpRequest::get(self.endpoint.clone())
			.header("Authorization", self.credentials.basic_authorization());
		// An interrupted caller leaves the state untouched so queued callers try for themselves.
		let outcome = match ctx.run("token exchange", self.transport.send(request)).await? {
			Ok(response) => self.classify(response),
			Err(e) => Err(Error::from(e)),
		};
		let mut state = self.state.lock();

		state.epoch = state.epoch.wrapping_add(1);

		match &outcome {
			Ok(token) => {
				state.cached = Some(token.clone());
				state.last_failure = None;

				self.metrics.record_success();
				obs::record_token_exchange(Outcome::Success);
			},
			Err(err) => {
				state.last_failure = Some(err.clone());

				self.metrics.record_failure();
				obs::record_token_exchange(Outcome::Failure);
				obs::log_token_failure(err);
			},
		}

		outcome
	}

	fn classify(&self, response: HttpResponse) -> Result<CachedToken> {
		let status = response.status;

		if response.is_success() {
			let body: TokenResponse = response.json()?;
			let expires_in = body.expires_in.seconds().filter(|secs| *secs > 0).ok_or_else(|| {
				NetworkError::decode(status, "Token response carried an unusable expires_in")
			})?;

			if body.access_token.is_empty() {
				return Err(NetworkError::decode(status, "Token response carried an empty token")
					.into());
			}

			return CachedToken::new(
				body.access_token,
				self.clock.now_utc(),
				TimeDuration::seconds(expires_in),
			)
			.ok_or_else(|| {
				NetworkError::decode(status, "Token response expires_in exceeds the supported range")
					.into()
			});
		}

		let body = ProviderErrorBody::parse(&response.body);

		match status {
			429 | 500..=599 => Err(NetworkError::status(status, body)
				.with_retry_after(response.metadata.retry_after)
				.into()),
			_ => Err(AuthenticationError::from_body(
				body,
				format!("Token endpoint rejected the credentials with HTTP {status}"),
			)
			.into()),
		}
	}
}
impl<T> Debug for TokenManager<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("endpoint", &self.endpoint.as_str())
			.field("credentials", &self.credentials)
			.field("margin", &self.margin)
			.field("cached", &self.state.lock().cached)
			.finish()
	}
}
