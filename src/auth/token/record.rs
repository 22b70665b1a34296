//! Token records produced by refreshes and handed to token stores.

// crates.io
use serde::{Deserializer, Serializer, de::Error as _};
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret, clock};

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no relative expiry was configured.
	#[error("Expiry must be supplied via expires_in.")]
	MissingExpiry,
	/// Issued when the relative expiry is not a positive, finite, supported duration.
	#[error("Expiry must be a positive number of seconds no larger than ten years.")]
	InvalidExpiry,
}

/// Token set returned by the token endpoint, stamped with its absolute expiry.
///
/// The record serializes to the provider's JSON shape plus an `expires_at` key holding
/// fractional unix seconds, so stores can persist it verbatim and reload it later.
/// Fields the client does not model are kept in [`TokenRecord::extra`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret; rotated on every refresh.
	pub refresh_token: TokenSecret,
	/// Lifetime in seconds as reported by the provider.
	pub expires_in: f64,
	/// Instant after which the access token must be considered invalid.
	#[serde(with = "unix_seconds")]
	pub expires_at: OffsetDateTime,
	/// Token type reported by the provider (usually `Bearer`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Space-delimited scopes granted to the token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	/// Provider user identifier the token belongs to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
	/// Remaining provider fields, preserved as-is.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}
impl TokenRecord {
	/// Largest `expires_in` accepted from a provider, in seconds.
	pub const MAX_EXPIRES_IN_SECS: f64 = 10.0 * 365.0 * 86_400.0;

	/// Returns a builder for constructing records.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Returns `true` if the access token has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Time left before expiry at the provided instant, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.field("expires_at", &self.expires_at)
			.field("token_type", &self.token_type)
			.field("scope", &self.scope)
			.field("user_id", &self.user_id)
			.field("extra_keys", &self.extra.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<f64>,
	token_type: Option<String>,
	scope: Option<String>,
	user_id: Option<String>,
	extra: BTreeMap<String, serde_json::Value>,
}
impl TokenRecordBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant the token was received; defaults to the current UTC clock.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets the token lifetime in (possibly fractional) seconds.
	pub fn expires_in_secs(mut self, seconds: f64) -> Self {
		self.expires_in = Some(seconds);

		self
	}

	/// Sets the token lifetime.
	pub fn expires_in(self, duration: Duration) -> Self {
		self.expires_in_secs(duration.as_seconds_f64())
	}

	/// Sets the token type.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the granted scope string.
	pub fn scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the provider user identifier.
	pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Keeps an additional provider field.
	pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
		self.extra.insert(key.into(), value);

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(TokenRecordBuilderError::MissingRefreshToken)?;
		let expires_in = self.expires_in.ok_or(TokenRecordBuilderError::MissingExpiry)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);

		if !(expires_in.is_finite()
			&& expires_in > 0.0
			&& expires_in <= TokenRecord::MAX_EXPIRES_IN_SECS)
		{
			return Err(TokenRecordBuilderError::InvalidExpiry);
		}

		let expires_at = issued_at
			.checked_add(Duration::seconds_f64(expires_in))
			.ok_or(TokenRecordBuilderError::InvalidExpiry)?;

		Ok(TokenRecord {
			access_token,
			refresh_token,
			expires_in,
			expires_at,
			token_type: self.token_type,
			scope: self.scope,
			user_id: self.user_id,
			extra: self.extra,
		})
	}
}

mod unix_seconds {
	// self
	use super::*;

	pub(super) fn serialize<S>(instant: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(clock::to_unix_seconds(*instant))
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let seconds = f64::deserialize(deserializer)?;

		clock::from_unix_seconds(seconds)
			.ok_or_else(|| D::Error::custom(format!("expires_at {seconds} is out of range")))
	}
}
