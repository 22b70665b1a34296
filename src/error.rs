//! Client-level error types shared across token refresh, resource requests, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed, thread-safe error used to carry transport failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The refresh-token grant failed; credential state is unchanged.
	#[error(transparent)]
	TokenRefresh(#[from] TokenRefreshError),
	/// A resource request failed or returned a non-200 status.
	#[error(transparent)]
	ApiRequest(#[from] ApiRequestError),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The token store rejected a freshly refreshed record.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl From<crate::provider::ProviderDescriptorError> for Error {
	fn from(e: crate::provider::ProviderDescriptorError) -> Self {
		Self::Config(e.into())
	}
}

/// Failures of the refresh-token grant.
#[derive(Debug, ThisError)]
pub enum TokenRefreshError {
	/// The client holds no refresh token, so the provider was not contacted.
	#[error("No refresh token is available.")]
	MissingRefreshToken,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint answered with a non-200 status.
	#[error("Token endpoint rejected the refresh with HTTP {status}{}.", describe(.error, .description))]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Provider error code (`error` or Fitbit `errorType`), when present.
		error: Option<String>,
		/// Provider error description, when present.
		description: Option<String>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint body was not JSON or lacked a required field.
	#[error("Token endpoint returned a malformed token response.")]
	Parse {
		/// Structured parsing failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Token endpoint returned an unusable `expires_in`.
	#[error("The expires_in value {value} is not a positive, supported duration.")]
	InvalidExpiresIn {
		/// Raw value reported by the provider.
		value: f64,
	},
}
impl TokenRefreshError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Returns the HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. } | Self::Parse { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Failures of rate-limited resource requests.
#[derive(Debug, ThisError)]
pub enum ApiRequestError {
	/// The API answered with a status other than 200.
	#[error("API responded with HTTP {status}.")]
	UnexpectedStatus {
		/// HTTP status code returned by the API.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
		/// Truncated response body for diagnostics.
		body_preview: Option<String>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// A 200 body could not be decoded into the requested type.
	#[error("API response body could not be decoded.")]
	Decode {
		/// Structured decoding failure, including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ApiRequestError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}

	/// Returns the HTTP status code for [`ApiRequestError::UnexpectedStatus`].
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::UnexpectedStatus { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed (bad URI or header value).
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Resource path could not be joined onto the API base.
	#[error("Resource URL is invalid.")]
	InvalidResourceUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
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

fn describe(error: &Option<String>, description: &Option<String>) -> String {
	match (error, description) {
		(Some(code), Some(text)) => format!(" ({code}: {text})"),
		(Some(code), None) => format!(" ({code})"),
		(None, Some(text)) => format!(" ({text})"),
		(None, None) => String::new(),
	}
}
