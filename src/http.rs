//! Transport primitives shared by the token manager and the operation callers.
//!
//! The module exposes [`Transport`] alongside [`HttpRequest`], [`HttpResponse`], and
//! [`ResponseMetadata`] so downstream crates can plug in any HTTP stack. The core never interprets
//! transport failures beyond classifying them as [`NetworkError`]s; non-2xx responses are returned
//! as ordinary [`HttpResponse`] values so each caller can map the provider's envelope into its
//! own failure variant.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{NetworkError, ValidationError},
};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Single-call HTTP abstraction the core depends on.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// concurrent operation through an `Arc`. A call resolves to `Ok` whenever the provider produced
/// an HTTP response, whatever its status.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Performs exactly one HTTP exchange.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		(**self).send(request)
	}
}

/// Failures raised before any HTTP response was obtained.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the gateway.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the gateway.")]
	Io(#[from] std::io::Error),
	/// Transport-level timeout configured on the HTTP client elapsed.
	#[error("Gateway call timed out inside the transport.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<TransportError> for NetworkError {
	fn from(e: TransportError) -> Self {
		NetworkError::transport(e)
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		NetworkError::from(e).into()
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// HTTP verbs used by the gateway API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
}
impl Method {
	/// Returns the verb as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
		}
	}
}

/// Transport-agnostic outbound request.
#[derive(Clone)]
pub struct HttpRequest {
	/// Verb.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Header name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Optional JSON body.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Builds a `GET` request.
	pub fn get(url: Url) -> Self {
		Self { method: Method::Get, url, headers: Vec::new(), body: None }
	}

	/// Builds a `POST` request.
	pub fn post(url: Url) -> Self {
		Self { method: Method::Post, url, headers: Vec::new(), body: None }
	}

	/// Adds a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Adds an `Authorization: Bearer` header.
	pub fn bearer(self, token: &str) -> Self {
		self.header("Authorization", format!("Bearer {token}"))
	}

	/// Serializes `body` as JSON.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body)
			.map_err(|e| ValidationError::new("body", format!("Unable to serialize: {e}")))?;

		self.body = Some(bytes);

		Ok(self.header("Content-Type", "application/json"))
	}

	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header_value(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for HttpRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(k, v)| {
				if k.eq_ignore_ascii_case("authorization") {
					(k.as_str(), "<redacted>")
				} else {
					(k.as_str(), v.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("HttpRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Response metadata captured by the transport for error classification.
///
/// Additional metadata fields may be added in future releases, so downstream code
/// should construct values using field names instead of struct update syntax.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Transport-agnostic HTTP response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// Status code.
	pub status: u16,
	/// Raw body.
	pub body: Vec<u8>,
	/// Metadata captured from headers.
	pub metadata: ResponseMetadata,
}
impl HttpResponse {
	/// Builds a response with empty metadata.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into(), metadata: ResponseMetadata::default() }
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
		self.metadata.retry_after = Some(retry_after);

		self
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing path in a decode [`NetworkError`].
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let de = &mut serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(de).map_err(|e| {
			NetworkError::decode(
				self.status,
				format!("Gateway returned malformed JSON at `{}`: {}", e.path(), e.inner()),
			)
			.into()
		})
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with a per-call timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestHttpClient {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
			};
			let mut builder = self.0.request(method, request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, body, metadata: ResponseMetadata { retry_after } })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return delta.try_into().ok();
		}
	}

	None
}
