//! Closed error taxonomy shared by the token manager, rate limiter, retry orchestrator, and every
//! operation caller.
//!
//! Each variant wraps a struct carrying a human-readable `message` plus the provider identifiers
//! needed to correlate a failure with asynchronous result callbacks. Callers match on
//! [`Error::kind`] (or on the variants directly) and read [`Error::fields`] for the structured
//! payload.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by every public API that talks to the gateway.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Credentials were rejected by the token endpoint.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// Transport failure, provider-side outage, timeout, or cancellation.
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// Caller input failed pre-flight checks; never reaches the network.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// STK push request was rejected by the provider.
	#[error(transparent)]
	StkPush(#[from] StkPushFailure),
	/// Payout (B2C disbursement) request was rejected by the provider.
	#[error(transparent)]
	Payout(#[from] PayoutFailure),
	/// Callback URL registration was rejected by the provider.
	#[error(transparent)]
	RegisterUrl(#[from] RegisterUrlFailure),
}
impl Error {
	/// Returns the variant tag.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Authentication(_) => ErrorKind::Authentication,
			Self::Network(_) => ErrorKind::Network,
			Self::Validation(_) => ErrorKind::Validation,
			Self::StkPush(_) => ErrorKind::Operation(FailureKind::StkPush),
			Self::Payout(_) => ErrorKind::Operation(FailureKind::Payout),
			Self::RegisterUrl(_) => ErrorKind::Operation(FailureKind::RegisterUrl),
		}
	}

	/// Returns the message recorded at the failure site.
	pub fn message(&self) -> &str {
		match self {
			Self::Authentication(e) => &e.message,
			Self::Network(e) => &e.message,
			Self::Validation(e) => &e.message,
			Self::StkPush(e) => &e.message,
			Self::Payout(e) => &e.message,
			Self::RegisterUrl(e) => &e.message,
		}
	}

	/// Returns the structured diagnostic fields relevant to this kind.
	///
	/// Only keys with a known value are present.
	pub fn fields(&self) -> BTreeMap<&'static str, String> {
		let mut fields = BTreeMap::new();

		match self {
			Self::Authentication(e) => {
				insert(&mut fields, "errorCode", e.error_code.as_deref());
				insert(&mut fields, "requestId", e.request_id.as_deref());
			},
			Self::Network(e) => {
				if let Some(status) = e.status {
					fields.insert("status", status.to_string());
				}

				insert(&mut fields, "errorCode", e.error_code.as_deref());
			},
			Self::Validation(e) => {
				fields.insert("field", e.field.clone());
			},
			Self::StkPush(e) => {
				insert(&mut fields, "responseCode", e.response_code.as_deref());
				insert(&mut fields, "merchantRequestId", e.merchant_request_id.as_deref());
				insert(&mut fields, "checkoutRequestId", e.checkout_request_id.as_deref());
			},
			Self::Payout(e) => {
				insert(&mut fields, "errorCode", e.error_code.as_deref());
				insert(&mut fields, "requestId", e.request_id.as_deref());
				insert(&mut fields, "responseCode", e.response_code.as_deref());
				insert(&mut fields, "conversationId", e.conversation_id.as_deref());
			},
			Self::RegisterUrl(e) => {
				insert(&mut fields, "responseCode", e.response_code.as_deref());
				insert(&mut fields, "shortCode", e.short_code.as_deref());
			},
		}

		fields
	}

	/// Provider error or response code carried by the failure, if any.
	///
	/// Used by retry classification to spot transient provider codes.
	pub fn provider_code(&self) -> Option<&str> {
		match self {
			Self::Authentication(e) => e.error_code.as_deref(),
			Self::Network(e) => e.error_code.as_deref(),
			Self::Validation(_) => None,
			Self::StkPush(e) => e.response_code.as_deref(),
			Self::Payout(e) => e.error_code.as_deref().or(e.response_code.as_deref()),
			Self::RegisterUrl(e) => e.response_code.as_deref(),
		}
	}

	/// Retry-After hint supplied by the provider, if any.
	pub fn retry_after(&self) -> Option<Duration> {
		match self {
			Self::Network(e) => e.retry_after,
			_ => None,
		}
	}

	/// Returns `true` when the failure came from a cancelled or expired [`Context`].
	///
	/// [`Context`]: crate::context::Context
	pub fn is_interrupted(&self) -> bool {
		matches!(
			self,
			Self::Network(NetworkError {
				cause: NetworkCause::Cancelled | NetworkCause::TimedOut,
				..
			})
		)
	}
}

fn insert(fields: &mut BTreeMap<&'static str, String>, key: &'static str, value: Option<&str>) {
	if let Some(value) = value {
		fields.insert(key, value.to_owned());
	}
}

/// Variant tag returned by [`Error::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// See [`Error::Authentication`].
	Authentication,
	/// See [`Error::Network`].
	Network,
	/// See [`Error::Validation`].
	Validation,
	/// One of the operation-specific rejections.
	Operation(FailureKind),
}
impl ErrorKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Authentication => "authentication",
			Self::Network => "network",
			Self::Validation => "validation",
			Self::Operation(kind) => kind.as_str(),
		}
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Operation that produced an operation-specific failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// STK push (customer-initiated payment prompt).
	StkPush,
	/// Payout (B2C disbursement).
	Payout,
	/// Callback URL registration.
	RegisterUrl,
}
impl FailureKind {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::StkPush => "stk_push",
			Self::Payout => "payout",
			Self::RegisterUrl => "register_url",
		}
	}
}

/// Token endpoint rejected the configured credentials.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("[authentication] {message} (errorCode={})", .error_code.as_deref().unwrap_or("-"))]
pub struct AuthenticationError {
	/// Provider- or core-supplied message.
	pub message: String,
	/// Provider error code, e.g. `400.008.01`.
	pub error_code: Option<String>,
	/// Provider request identifier.
	pub request_id: Option<String>,
}
impl AuthenticationError {
	/// Creates an error with only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into(), error_code: None, request_id: None }
	}

	/// Builds the error from the provider's error envelope.
	pub fn from_body(body: ProviderErrorBody, fallback: impl Into<String>) -> Self {
		Self {
			message: body.error_message.unwrap_or_else(|| fallback.into()),
			error_code: body.error_code,
			request_id: body.request_id,
		}
	}
}

/// Where a [`NetworkError`] originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkCause {
	/// DNS, TCP, TLS, or I/O failure inside the transport.
	Transport,
	/// Provider answered with a server-side or throttling status.
	Status,
	/// Provider answered successfully but the body could not be decoded.
	Decode,
	/// Caller deadline elapsed while waiting.
	TimedOut,
	/// Caller cancelled while waiting.
	Cancelled,
}
impl NetworkCause {
	/// Returns a stable label suitable for logs and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Transport => "transport",
			Self::Status => "status",
			Self::Decode => "decode",
			Self::TimedOut => "timed_out",
			Self::Cancelled => "cancelled",
		}
	}
}

/// Transport, outage, or interruption failure.
#[derive(Clone, Debug, ThisError)]
#[error("[network:{}] {message}", .cause.as_str())]
pub struct NetworkError {
	/// Human-readable description.
	pub message: String,
	/// Origin of the failure.
	pub cause: NetworkCause,
	/// HTTP status, when the provider answered.
	pub status: Option<u16>,
	/// Provider error code, when the provider answered with an error envelope.
	pub error_code: Option<String>,
	/// Retry-After hint parsed from the response.
	pub retry_after: Option<Duration>,
	/// Underlying transport failure.
	#[source]
	pub source: Option<SharedError>,
}
impl NetworkError {
	/// Creates an error for the given cause.
	pub fn new(cause: NetworkCause, message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			cause,
			status: None,
			error_code: None,
			retry_after: None,
			source: None,
		}
	}

	/// Wraps a transport-level failure.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		let mut e = Self::new(NetworkCause::Transport, src.to_string());

		e.source = Some(Arc::new(src));

		e
	}

	/// Provider answered with an error status that is not a terminal rejection.
	pub fn status(status: u16, body: ProviderErrorBody) -> Self {
		let mut e = Self::new(
			NetworkCause::Status,
			body.error_message.unwrap_or_else(|| format!("Provider answered with HTTP {status}")),
		);

		e.status = Some(status);
		e.error_code = body.error_code;

		e
	}

	/// Body of a successful response could not be decoded.
	pub fn decode(status: u16, message: impl Into<String>) -> Self {
		let mut e = Self::new(NetworkCause::Decode, message);

		e.status = Some(status);

		e
	}

	/// Deadline elapsed while waiting at `stage`.
	pub fn timed_out(stage: &'static str) -> Self {
		Self::new(NetworkCause::TimedOut, format!("Deadline elapsed while waiting for {stage}"))
	}

	/// Caller cancelled while waiting at `stage`.
	pub fn cancelled(stage: &'static str) -> Self {
		Self::new(NetworkCause::Cancelled, format!("Cancelled while waiting for {stage}"))
	}

	/// Attaches a Retry-After hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}
}

/// Caller input failed pre-flight checks.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("[validation] {field}: {message}")]
pub struct ValidationError {
	/// Offending input field.
	pub field: String,
	/// Description of the problem.
	pub message: String,
}
impl ValidationError {
	/// Creates a validation error for `field`.
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self { field: field.into(), message: message.into() }
	}
}

/// STK push rejection.
#[derive(Clone, Debug, Default, PartialEq, Eq, ThisError)]
#[error(
	"[stk_push] {message} (responseCode={}, checkoutRequestId={})",
	.response_code.as_deref().unwrap_or("-"),
	.checkout_request_id.as_deref().unwrap_or("-")
)]
pub struct StkPushFailure {
	/// Provider message.
	pub message: String,
	/// Provider response or error code.
	pub response_code: Option<String>,
	/// `MerchantRequestID` issued by the provider.
	pub merchant_request_id: Option<String>,
	/// `CheckoutRequestID` issued by the provider.
	pub checkout_request_id: Option<String>,
}

/// Payout (B2C) rejection.
#[derive(Clone, Debug, Default, PartialEq, Eq, ThisError)]
#[error(
	"[payout] {message} (errorCode={}, conversationId={})",
	.error_code.as_deref().or(.response_code.as_deref()).unwrap_or("-"),
	.conversation_id.as_deref().unwrap_or("-")
)]
pub struct PayoutFailure {
	/// Provider message.
	pub message: String,
	/// Provider error code from the error envelope.
	pub error_code: Option<String>,
	/// Provider request identifier.
	pub request_id: Option<String>,
	/// `ResponseCode` from an accepted-but-failed response.
	pub response_code: Option<String>,
	/// `ConversationID` issued by the provider.
	pub conversation_id: Option<String>,
}

/// Callback URL registration rejection.
#[derive(Clone, Debug, Default, PartialEq, Eq, ThisError)]
#[error(
	"[register_url] {message} (responseCode={}, shortCode={})",
	.response_code.as_deref().unwrap_or("-"),
	.short_code.as_deref().unwrap_or("-")
)]
pub struct RegisterUrlFailure {
	/// Provider message.
	pub message: String,
	/// Provider response or error code.
	pub response_code: Option<String>,
	/// Short code the registration targeted.
	pub short_code: Option<String>,
}

/// Error envelope the gateway returns from every endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderErrorBody {
	/// `requestId`.
	#[serde(rename = "requestId", default)]
	pub request_id: Option<String>,
	/// `errorCode`.
	#[serde(rename = "errorCode", default)]
	pub error_code: Option<String>,
	/// `errorMessage`.
	#[serde(rename = "errorMessage", default)]
	pub error_message: Option<String>,
}
impl ProviderErrorBody {
	/// Decodes the envelope, falling back to an empty body for non-JSON payloads.
	pub fn parse(bytes: &[u8]) -> Self {
		serde_json::from_slice(bytes).unwrap_or_default()
	}
}

/// Construction-time configuration failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A setting is outside its allowed range.
	#[error("Configuration value `{field}` is invalid: {reason}.")]
	InvalidValue {
		/// Offending setting.
		field: &'static str,
		/// Why it was rejected.
		reason: String,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration could not be parsed at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Base URL could not be joined with an endpoint path.
	#[error("Endpoint URL is invalid.")]
	InvalidUrl(#[from] url::ParseError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},
}
impl ConfigError {
	/// Shorthand for [`ConfigError::InvalidValue`].
	pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidValue { field, reason: reason.into() }
	}

	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn fields_only_carry_present_keys() {
		let err = Error::from(StkPushFailure {
			message: "Request cancelled by user".into(),
			response_code: Some("1032".into()),
			merchant_request_id: Some("29115-34620561-1".into()),
			checkout_request_id: None,
		});
		let fields = err.fields();

		assert_eq!(err.kind(), ErrorKind::Operation(FailureKind::StkPush));
		assert_eq!(fields.get("responseCode").map(String::as_str), Some("1032"));
		assert_eq!(fields.get("merchantRequestId").map(String::as_str), Some("29115-34620561-1"));
		assert!(!fields.contains_key("checkoutRequestId"));
		assert!(!fields.contains_key("conversationId"));
	}

	#[test]
	fn authentication_error_reads_provider_envelope() {
		let body = ProviderErrorBody::parse(
			br#"{"requestId":"11728-2929992-1","errorCode":"400.008.01","errorMessage":"Invalid Authentication passed"}"#,
		);
		let err = Error::from(AuthenticationError::from_body(body, "rejected"));

		assert_eq!(err.kind(), ErrorKind::Authentication);
		assert_eq!(err.message(), "Invalid Authentication passed");
		assert_eq!(err.fields().get("errorCode").map(String::as_str), Some("400.008.01"));
		assert_eq!(
			err.to_string(),
			"[authentication] Invalid Authentication passed (errorCode=400.008.01)"
		);
	}

	#[test]
	fn non_json_bodies_fall_back_to_empty_envelope() {
		assert_eq!(ProviderErrorBody::parse(b"<html>bad gateway</html>"), Default::default());
	}

	#[test]
	fn network_errors_expose_their_source_and_interruption() {
		let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
		let err = Error::from(NetworkError::transport(io));

		assert!(StdError::source(&err).is_some());
		assert!(!err.is_interrupted());
		assert!(Error::from(NetworkError::cancelled("admission")).is_interrupted());
		assert_eq!(err.to_string(), "[network:transport] reset by peer");
	}

	#[test]
	fn payout_provider_code_prefers_error_code() {
		let err = Error::from(PayoutFailure {
			message: "System is busy".into(),
			error_code: Some("500.003.02".into()),
			response_code: Some("1".into()),
			..Default::default()
		});

		assert_eq!(err.provider_code(), Some("500.003.02"));
		assert_eq!(err.kind().as_str(), "payout");
	}
}
