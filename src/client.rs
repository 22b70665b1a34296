//! The Fitbit API client: token freshness, rate-limited dispatch, and resource helpers.
//!
//! Every resource fetch runs two explicit guard steps before touching the network:
//! [`Client::ensure_fresh_token`] refreshes the access token when it has expired, and the
//! [`RateGate`] waits until the request budget admits the call. Clones of a [`Client`] share
//! credentials, the request budget, the refresh guard, and metrics.

pub mod refresh;

mod metrics;

pub use metrics::CallMetrics;

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{CredentialStatus, Credentials, TokenSecret},
	clock::{Clock, Sleeper, SystemClock, TokioSleeper},
	error::{ApiRequestError, ConfigError},
	ext::{RateGate, RateLimitPolicy, SlidingWindowPolicy},
	http::{self, ApiHttpClient, HttpRequest, HttpResponse, ResponseMetadata},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderDescriptor, Resource},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type FitbitClient = Client<ReqwestHttpClient>;

/// Async client for one authorized user of the Fitbit Web API.
///
/// The client owns the HTTP transport, provider descriptor, OAuth client credentials, and the
/// user's token state. Access tokens are refreshed on demand with the refresh-token grant and
/// every refreshed record is handed to the optional [`TokenStore`].
pub struct Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP client used for every outbound call.
	pub http_client: Arc<C>,
	/// Provider descriptor that defines endpoints, client auth, and the request budget.
	pub descriptor: Arc<ProviderDescriptor>,
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	client_secret: Option<TokenSecret>,
	credentials: Arc<RwLock<Credentials>>,
	store: Option<Arc<dyn TokenStore>>,
	clock: Arc<dyn Clock>,
	rate_gate: RateGate,
	refresh_guard: Arc<AsyncMutex<()>>,
	refresh_metrics: Arc<CallMetrics>,
	request_metrics: Arc<CallMetrics>,
}
impl<C> Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client over a caller-provided transport.
	///
	/// The client starts without credentials, a token store, or a client secret; attach them
	/// with the `with_*` builders. The request budget comes from `descriptor.rate_limit`.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let policy = Arc::new(SlidingWindowPolicy::new(descriptor.rate_limit));

		Self {
			http_client: http_client.into(),
			descriptor: Arc::new(descriptor),
			client_id: client_id.into(),
			client_secret: None,
			credentials: Default::default(),
			store: None,
			clock: Arc::new(SystemClock),
			rate_gate: RateGate::new(policy, Arc::new(TokioSleeper)),
			refresh_guard: Default::default(),
			refresh_metrics: Default::default(),
			request_metrics: Default::default(),
		}
	}

	/// Sets or replaces the client secret used to authenticate refreshes.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Seeds the token state, typically from a previously persisted record.
	pub fn with_credentials(mut self, credentials: Credentials) -> Self {
		self.credentials = Arc::new(RwLock::new(credentials));

		self
	}

	/// Attaches the store that receives every refreshed record.
	pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Replaces the time source used for expiry checks and the request budget.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the sleeper the rate gate waits through.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.rate_gate = self.rate_gate.with_sleeper(sleeper);

		self
	}

	/// Replaces the request budget policy.
	///
	/// Passing the same policy to several clients makes them share one budget.
	pub fn with_rate_limit_policy(mut self, policy: Arc<dyn RateLimitPolicy>) -> Self {
		self.rate_gate = self.rate_gate.with_policy(policy);

		self
	}

	/// Returns a snapshot of the held credentials.
	pub fn credentials(&self) -> Credentials {
		self.credentials.read().clone()
	}

	/// Returns whether the held access token is usable right now.
	pub fn credential_status(&self) -> CredentialStatus {
		self.credentials.read().status_at(self.clock.now())
	}

	/// Counters for refresh attempts.
	pub fn refresh_metrics(&self) -> &CallMetrics {
		&self.refresh_metrics
	}

	/// Counters for rate-limited requests.
	pub fn request_metrics(&self) -> &CallMetrics {
		&self.request_metrics
	}

	/// Resolves a documented resource against the descriptor's API base.
	pub fn resource_url(&self, resource: &Resource) -> Result<Url> {
		resource
			.url(&self.descriptor.endpoints.api_base)
			.map_err(|source| ConfigError::InvalidResourceUrl { source }.into())
	}

	/// Returns a usable access token, refreshing first when the held one has expired.
	///
	/// A missing expiry or missing access token counts as expired. Concurrent callers that find
	/// the token expired wait for a single refresh and then reuse its result.
	pub async fn ensure_fresh_token(&self) -> Result<TokenSecret> {
		if let Some(token) = self.usable_access_token() {
			return Ok(token);
		}

		let _singleflight = self.refresh_guard.lock().await;

		// Another caller may have refreshed while we waited for the guard.
		if let Some(token) = self.usable_access_token() {
			return Ok(token);
		}

		self.refresh_locked().await.map(|record| record.access_token)
	}

	/// Sends `request` once the request budget admits it.
	///
	/// The caller is delayed, never rejected, when the budget is exhausted. A 200 response is
	/// returned unmodified; any other status becomes [`ApiRequestError::UnexpectedStatus`].
	/// Nothing is retried.
	pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Resource;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.request_metrics.record_attempt();

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(_) => {
				self.request_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.request_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Fetches a resource with the current bearer token, refreshing it first if needed.
	///
	/// `url` may be absolute or relative to the descriptor's API base.
	///
	/// The token is checked before the request budget is consulted. When the budget is spent
	/// the call can wait up to a full window, so a token that was valid at the check may have
	/// expired by the time the request goes out; the server then answers `401`, surfaced as
	/// [`ApiRequestError::UnexpectedStatus`].
	pub async fn get_resource(&self, url: &str) -> Result<HttpResponse> {
		let url = self
			.descriptor
			.endpoints
			.api_base
			.join(url)
			.map_err(|source| ConfigError::InvalidResourceUrl { source })?;
		let token = self.ensure_fresh_token().await?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", token.expose()))
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		self.request(request).await
	}

	/// Fetches a resource and decodes its JSON body into `T`.
	pub async fn get_resource_json<T>(&self, url: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.get_resource(url).await?;
		let mut de = serde_json::Deserializer::from_slice(response.body());

		Ok(serde_path_to_error::deserialize(&mut de)
			.map_err(|source| ApiRequestError::Decode { source })?)
	}

	fn usable_access_token(&self) -> Option<TokenSecret> {
		self.credentials.read().usable_access_token(self.clock.now()).cloned()
	}

	async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		self.rate_gate.acquire(self.clock.as_ref(), "request").await;

		let handle = self.http_client.handle();
		let response = handle.call(request).await.map_err(ApiRequestError::transport)?;

		if response.status() != StatusCode::OK {
			let meta = ResponseMetadata::from_response(&response);

			return Err(ApiRequestError::UnexpectedStatus {
				status: response.status().as_u16(),
				retry_after: meta.retry_after,
				body_preview: http::body_preview(response.body()),
			}
			.into());
		}

		Ok(response)
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestHttpClient> {
	/// Creates a client that provisions its own reqwest transport.
	pub fn new(descriptor: ProviderDescriptor, client_id: impl Into<String>) -> Self {
		Self::with_http_client(descriptor, client_id, ReqwestHttpClient::default())
	}

	/// Creates a client for the production Fitbit endpoints.
	pub fn fitbit(client_id: impl Into<String>) -> Result<Self> {
		Ok(Self::new(ProviderDescriptor::fitbit()?, client_id))
	}
}
impl<C> Clone for Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			descriptor: self.descriptor.clone(),
			client_id: self.client_id.clone(),
			client_secret: self.client_secret.clone(),
			credentials: self.credentials.clone(),
			store: self.store.clone(),
			clock: self.clock.clone(),
			rate_gate: self.rate_gate.clone(),
			refresh_guard: self.refresh_guard.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			request_metrics: self.request_metrics.clone(),
		}
	}
}
impl<C> Debug for Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("credentials", &*self.credentials.read())
			.field("store_set", &self.store.is_some())
			.finish()
	}
}
