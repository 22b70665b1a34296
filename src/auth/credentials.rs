//! Live credential state held by a client.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	clock,
};

/// Whether the held access token may be used at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// An access token is held and `expires_at` is in the future.
	Valid,
	/// No access token, no expiry, or the expiry has passed.
	Expired,
}

/// Access token, refresh token, and absolute expiry for one authorized user.
///
/// A missing `expires_at` means "treat as expired", so a client seeded with an access token
/// but no expiry refreshes before its first request.
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
	/// Bearer token attached to resource requests.
	pub access_token: Option<TokenSecret>,
	/// Token used to mint the next access token.
	pub refresh_token: Option<TokenSecret>,
	/// Instant after which `access_token` is invalid.
	pub expires_at: Option<OffsetDateTime>,
}
impl Credentials {
	/// Creates credentials without an expiry; the first fetch will refresh.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: Some(TokenSecret::new(access_token)),
			refresh_token: Some(TokenSecret::new(refresh_token)),
			expires_at: None,
		}
	}

	/// Creates credentials that only hold a refresh token.
	pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
		Self { refresh_token: Some(TokenSecret::new(refresh_token)), ..Default::default() }
	}

	/// Sets the absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry from fractional unix seconds (e.g. `1591749405.1234567`).
	///
	/// Values that cannot be represented leave the expiry unset.
	pub fn with_unix_expiry(mut self, seconds: f64) -> Self {
		self.expires_at = clock::from_unix_seconds(seconds);

		self
	}

	/// Computes the credential status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		match (&self.access_token, self.expires_at) {
			(Some(token), Some(expires_at)) if !token.is_empty() && instant < expires_at =>
				CredentialStatus::Valid,
			_ => CredentialStatus::Expired,
		}
	}

	/// Returns `true` if a refresh is required before the access token can be used.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Returns the access token when it is still valid at `instant`.
	pub fn usable_access_token(&self, instant: OffsetDateTime) -> Option<&TokenSecret> {
		if self.is_expired_at(instant) { None } else { self.access_token.as_ref() }
	}

	/// Replaces all three token fields with the values of a refreshed record.
	pub(crate) fn apply(&mut self, record: &TokenRecord) {
		*self = Self::from(record);
	}
}
impl From<&TokenRecord> for Credentials {
	fn from(record: &TokenRecord) -> Self {
		Self {
			access_token: Some(record.access_token.clone()),
			refresh_token: Some(record.refresh_token.clone()),
			expires_at: Some(record.expires_at),
		}
	}
}
impl From<TokenRecord> for Credentials {
	fn from(record: TokenRecord) -> Self {
		Self::from(&record)
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn missing_expiry_is_treated_as_expired() {
		let credentials = Credentials::new("access", "refresh");

		assert_eq!(
			credentials.status_at(macros::datetime!(2025-01-01 00:00 UTC)),
			CredentialStatus::Expired
		);
		assert!(credentials.usable_access_token(OffsetDateTime::now_utc()).is_none());
	}

	#[test]
	fn status_flips_at_expiry_instant() {
		let credentials = Credentials::new("access", "refresh")
			.with_expires_at(macros::datetime!(2025-01-01 08:00 UTC));

		assert_eq!(
			credentials.status_at(macros::datetime!(2025-01-01 07:59:59 UTC)),
			CredentialStatus::Valid
		);
		assert_eq!(
			credentials.status_at(macros::datetime!(2025-01-01 08:00 UTC)),
			CredentialStatus::Expired
		);
	}

	#[test]
	fn missing_access_token_is_treated_as_expired() {
		let credentials = Credentials::from_refresh_token("refresh")
			.with_expires_at(macros::datetime!(2030-01-01 00:00 UTC));

		assert!(credentials.is_expired_at(macros::datetime!(2025-01-01 00:00 UTC)));
	}

	#[test]
	fn unix_expiry_accepts_fractional_seconds() {
		let credentials = Credentials::new("access", "refresh").with_unix_expiry(1_591_749_405.5);
		let expires_at = credentials.expires_at.expect("Fractional expiry should be representable.");

		assert_eq!(expires_at.unix_timestamp(), 1_591_749_405);
		assert_eq!(expires_at.millisecond(), 500);
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let rendered = format!("{:?}", Credentials::new("access-secret", "refresh-secret"));

		assert!(!rendered.contains("access-secret"));
		assert!(!rendered.contains("refresh-secret"));
	}
}
