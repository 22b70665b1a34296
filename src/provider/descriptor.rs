//! Provider descriptor data structures shared by the client.
//!
//! The module exposes validated metadata and its builder so the endpoints, authentication
//! method, and request budget can be described once and reused by every client clone.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, ext::RateLimitQuota};

/// Default token endpoint.
pub const FITBIT_TOKEN_ENDPOINT: &str = "https://api.fitbit.com/oauth2/token";
/// Default API base that resource paths are joined onto.
pub const FITBIT_API_BASE: &str = "https://api.fitbit.com/";

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Token endpoint used for refreshes.
	pub token: Url,
	/// Base URL for resource requests; relative resource paths are joined onto it.
	pub api_base: Url,
}

/// Immutable provider descriptor consumed by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Client authentication mechanism for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Request budget enforced before every resource call.
	pub rate_limit: RateLimitQuota,
}
impl ProviderDescriptor {
	/// Creates a new builder seeded with the Fitbit defaults.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new()
	}

	/// Returns the Fitbit Web API descriptor: production endpoints, HTTP Basic client
	/// authentication, and 125 calls per rolling hour.
	pub fn fitbit() -> Result<Self, ProviderDescriptorError> {
		Self::builder().build()
	}
}
