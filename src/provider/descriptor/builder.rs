// self
use crate::{
	_prelude::*,
	ext::RateLimitQuota,
	provider::{
		ClientAuthMethod, FITBIT_API_BASE, FITBIT_TOKEN_ENDPOINT, ProviderDescriptor,
		ProviderEndpoints,
	},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// API base is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// A built-in endpoint string failed to parse.
	#[error("The {endpoint} endpoint is not a valid URL: {url}.")]
	MalformedEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Raw endpoint value.
		url: String,
	},
	/// Endpoints must use HTTP or HTTPS.
	#[error("The {endpoint} endpoint must use HTTP or HTTPS: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The API base must be able to carry relative paths.
	#[error("The API base cannot be used as a base URL: {url}.")]
	CannotBeABase {
		/// API base that failed validation.
		url: String,
	},
	/// A zero call budget or window would block every request forever.
	#[error("Rate limit must allow at least one call per positive period.")]
	EmptyRateLimit,
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Token endpoint used for refreshes.
	pub token_endpoint: Option<Url>,
	/// Base URL for resource requests.
	pub api_base: Option<Url>,
	/// Client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Request budget.
	pub rate_limit: RateLimitQuota,
}
impl ProviderDescriptorBuilder {
	/// Creates a builder with no endpoints, HTTP Basic client auth, and the default quota.
	///
	/// Endpoints left unset fall back to the Fitbit production URLs on [`Self::build`].
	pub fn new() -> Self {
		Self {
			token_endpoint: None,
			api_base: None,
			client_auth_method: ClientAuthMethod::default(),
			rate_limit: RateLimitQuota::default(),
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Overrides the request budget.
	pub fn rate_limit(mut self, quota: RateLimitQuota) -> Self {
		self.rate_limit = quota;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let token = match self.token_endpoint {
			Some(url) => url,
			None => parse_default("token", FITBIT_TOKEN_ENDPOINT)?,
		};
		let api_base = match self.api_base {
			Some(url) => url,
			None => parse_default("api_base", FITBIT_API_BASE)?,
		};
		let descriptor = ProviderDescriptor {
			endpoints: ProviderEndpoints { token, api_base },
			client_auth_method: self.client_auth_method,
			rate_limit: self.rate_limit,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}
impl Default for ProviderDescriptorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("api_base", &self.endpoints.api_base)?;

		if self.endpoints.api_base.cannot_be_a_base() {
			return Err(ProviderDescriptorError::CannotBeABase {
				url: self.endpoints.api_base.to_string(),
			});
		}
		if self.rate_limit.calls == 0 || !self.rate_limit.period.is_positive() {
			return Err(ProviderDescriptorError::EmptyRateLimit);
		}

		Ok(())
	}
}

fn parse_default(endpoint: &'static str, raw: &str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw)
		.map_err(|_| ProviderDescriptorError::MalformedEndpoint { endpoint, url: raw.into() })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ProviderDescriptorError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}
