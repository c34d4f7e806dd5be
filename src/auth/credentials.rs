//! Consumer key/secret pair exchanged for access tokens.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Immutable consumer credentials issued by the gateway.
#[derive(Clone)]
pub struct Credentials {
	consumer_key: String,
	consumer_secret: TokenSecret,
}
impl Credentials {
	/// Creates credentials, rejecting blank values.
	pub fn new(
		consumer_key: impl Into<String>,
		consumer_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let consumer_key = consumer_key.into();
		let consumer_secret = consumer_secret.into();

		if consumer_key.trim().is_empty() {
			return Err(ConfigError::invalid("credentials.consumer_key", "must not be blank"));
		}
		if consumer_secret.trim().is_empty() {
			return Err(ConfigError::invalid("credentials.consumer_secret", "must not be blank"));
		}

		Ok(Self { consumer_key, consumer_secret: TokenSecret::new(consumer_secret) })
	}

	/// Consumer key (not secret).
	pub fn consumer_key(&self) -> &str {
		&self.consumer_key
	}

	/// `Authorization` header value for the token endpoint.
	pub fn basic_authorization(&self) -> String {
		let raw = format!("{}:{}", self.consumer_key, self.consumer_secret.expose());

		format!("Basic {}", STANDARD.encode(raw))
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("consumer_key", &self.consumer_key)
			.field("consumer_secret", &"<redacted>")
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn basic_authorization_encodes_key_and_secret() {
		let credentials =
			Credentials::new("key", "hunter2").expect("Credential fixture should be valid.");

		assert_eq!(credentials.basic_authorization(), "Basic a2V5Omh1bnRlcjI=");
		assert!(!format!("{credentials:?}").contains("hunter2"));
	}

	#[test]
	fn blank_values_are_rejected() {
		assert!(Credentials::new(" ", "secret").is_err());
		assert!(Credentials::new("key", "").is_err());
	}
}
