//! Redacted token secrets and the cached access token model.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access token plus the instants that bound its validity.
///
/// A cached token is replaced wholesale on every refresh; it is never patched in place.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
	/// Bearer token value.
	pub value: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Provider-reported expiry.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Creates a token valid for `expires_in` from `issued_at`.
	///
	/// Returns `None` when the expiry falls outside the representable date range.
	pub fn new(
		value: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: TimeDuration,
	) -> Option<Self> {
		let expires_at = issued_at.checked_add(expires_in)?;

		Some(Self { value: TokenSecret::new(value), issued_at, expires_at })
	}

	/// Returns `true` once `instant` reached the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when the token may be served without a refresh at `instant`.
	///
	/// A margin reaching past the representable date range never counts as fresh.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, margin: TimeDuration) -> bool {
		self.expires_at.checked_sub(margin).is_some_and(|refresh_at| instant < refresh_at)
	}

	/// Time left until expiry (negative once expired).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> TimeDuration {
		self.expires_at - instant
	}
}
impl Debug for CachedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedToken")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Success body of the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
	pub(crate) access_token: String,
	pub(crate) expires_in: ExpiresIn,
}

/// The gateway reports `expires_in` as a string; other deployments send a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ExpiresIn {
	Seconds(i64),
	Text(String),
}
impl ExpiresIn {
	pub(crate) fn seconds(&self) -> Option<i64> {
		match self {
			Self::Seconds(secs) => Some(*secs),
			Self::Text(raw) => raw.trim().parse().ok(),
		}
	}
}
