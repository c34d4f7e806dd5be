//! Core configuration loaded once at client construction.
//!
//! Every section deserializes with defaults so a partial JSON document (or none at all) yields a
//! usable configuration. [`CoreConfig::validate`] enforces the ranges the rate limiter, retry
//! orchestrator, and token manager rely on.

// self
use crate::{_prelude::*, error::ConfigError};

/// Gateway environment the client talks to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Public sandbox.
	#[default]
	Sandbox,
	/// Live production gateway.
	Production,
	/// Any other base URL (proxies, mock servers).
	Custom(Url),
}
impl Environment {
	const PRODUCTION: &'static str = "https://api.safaricom.co.ke/";
	const SANDBOX: &'static str = "https://sandbox.safaricom.co.ke/";

	/// Base URL every endpoint path is joined onto.
	pub fn base_url(&self) -> Result<Url, ConfigError> {
		match self {
			Self::Sandbox => Ok(Url::parse(Self::SANDBOX)?),
			Self::Production => Ok(Url::parse(Self::PRODUCTION)?),
			Self::Custom(url) => Ok(url.clone()),
		}
	}

	/// Joins `path` (e.g. `oauth/v1/generate`) onto the base URL.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let mut base = self.base_url()?;

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		Ok(base.join(path.trim_start_matches('/'))?)
	}
}

/// Admission-control settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// Maximum outstanding (unreleased) acquisitions.
	pub max_concurrent: usize,
	/// Maximum new admissions per window.
	pub max_per_window: usize,
	/// Window length in milliseconds.
	pub window_duration_ms: u64,
}
impl RateLimitConfig {
	/// Window length as a [`Duration`].
	pub fn window_duration(&self) -> Duration {
		Duration::from_millis(self.window_duration_ms)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.max_concurrent == 0 {
			return Err(ConfigError::invalid("rate.max_concurrent", "must be at least 1"));
		}
		if self.max_per_window == 0 {
			return Err(ConfigError::invalid("rate.max_per_window", "must be at least 1"));
		}
		if self.window_duration_ms == 0 {
			return Err(ConfigError::invalid("rate.window_duration_ms", "must be positive"));
		}

		Ok(())
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self { max_concurrent: 10, max_per_window: 100, window_duration_ms: 60_000 }
	}
}

/// Retry and backoff settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
	/// Additional attempts after the first one.
	pub max_retries: u32,
	/// Delay before the first retry, in milliseconds.
	pub initial_delay_ms: u64,
	/// Upper bound for the exponential part of the delay, in milliseconds.
	pub max_delay_ms: u64,
	/// Multiplier applied per retry.
	pub backoff_factor: f64,
	/// Upper bound of the random addition, in milliseconds.
	pub jitter_ms: u64,
	/// Provider error codes treated as transient by the default retry predicate.
	pub transient_codes: Vec<String>,
}
impl RetryConfig {
	const MAX_RETRIES: u32 = 100;

	fn validate(&self) -> Result<(), ConfigError> {
		if self.max_retries > Self::MAX_RETRIES {
			return Err(ConfigError::invalid(
				"retry.max_retries",
				format!("must not exceed {}", Self::MAX_RETRIES),
			));
		}
		if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
			return Err(ConfigError::invalid(
				"retry.backoff_factor",
				"must be a finite number >= 1",
			));
		}
		if self.initial_delay_ms > self.max_delay_ms {
			return Err(ConfigError::invalid(
				"retry.initial_delay_ms",
				format!("must not exceed max_delay_ms ({})", self.max_delay_ms),
			));
		}

		Ok(())
	}
}
impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_delay_ms: 1_000,
			max_delay_ms: 10_000,
			backoff_factor: 2.0,
			jitter_ms: 100,
			transient_codes: vec!["500.003.1001".into(), "500.003.02".into(), "500.003.03".into()],
		}
	}
}

/// Token cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
	/// Refresh this many seconds before the provider-reported expiry.
	pub refresh_margin_secs: u64,
}
impl TokenConfig {
	const MAX_MARGIN_SECS: u64 = 86_400;
	const MIN_MARGIN_SECS: u64 = 60;

	/// Safety margin as a wall-clock duration.
	pub fn refresh_margin(&self) -> TimeDuration {
		TimeDuration::seconds(i64::try_from(self.refresh_margin_secs).unwrap_or(i64::MAX))
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.refresh_margin_secs < Self::MIN_MARGIN_SECS {
			return Err(ConfigError::invalid(
				"token.refresh_margin_secs",
				format!("must be at least {}", Self::MIN_MARGIN_SECS),
			));
		}
		if self.refresh_margin_secs > Self::MAX_MARGIN_SECS {
			return Err(ConfigError::invalid(
				"token.refresh_margin_secs",
				format!("must not exceed {}", Self::MAX_MARGIN_SECS),
			));
		}

		Ok(())
	}
}
impl Default for TokenConfig {
	fn default() -> Self {
		Self { refresh_margin_secs: Self::MIN_MARGIN_SECS }
	}
}

/// Complete, immutable configuration for one [`RequestCore`](crate::request::RequestCore).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
	/// Target environment.
	pub environment: Environment,
	/// Admission control.
	pub rate: RateLimitConfig,
	/// Retry policy.
	pub retry: RetryConfig,
	/// Token cache.
	pub token: TokenConfig,
}
impl CoreConfig {
	/// Parses and validates a JSON document.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let de = &mut serde_json::Deserializer::from_str(raw);
		let config: Self =
			serde_path_to_error::deserialize(de).map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Checks every section's invariants.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.environment.base_url()?;
		self.rate.validate()?;
		self.retry.validate()?;
		self.token.validate()
	}

	/// Overrides the environment.
	pub fn with_environment(mut self, environment: Environment) -> Self {
		self.environment = environment;

		self
	}

	/// Overrides the admission-control section.
	pub fn with_rate(mut self, rate: RateLimitConfig) -> Self {
		self.rate = rate;

		self
	}

	/// Overrides the retry section.
	pub fn with_retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the token section.
	pub fn with_token(mut self, token: TokenConfig) -> Self {
		self.token = token;

		self
	}
}
