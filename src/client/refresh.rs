//! Refresh-token grant: request building, response parsing, and credential rotation.
//!
//! A refresh is a single `POST` to the descriptor's token endpoint. The grant is never retried
//! and never counted against the request budget. On success the three token fields are
//! replaced together and the record is handed to the token store before the call returns; on
//! failure the held credentials are left exactly as they were.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::{
	AsyncHttpClient,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	client::Client,
	error::{ConfigError, TokenRefreshError},
	http::{ApiHttpClient, HttpRequest, HttpResponse, ResponseMetadata},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ClientAuthMethod,
};

impl<C> Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Exchanges the held refresh token for a new token set, unconditionally.
	///
	/// Waits for any refresh already in flight on this client (or its clones) before starting.
	/// Returns the new record after the token store (if any) has accepted it.
	pub async fn refresh_tokens(&self) -> Result<TokenRecord> {
		let _singleflight = self.refresh_guard.lock().await;

		self.refresh_locked().await
	}

	/// Performs the grant; callers must hold `refresh_guard`.
	pub(crate) async fn refresh_locked(&self) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_tokens");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.exchange_refresh_token()).await;

		match &result {
			Ok(record) => {
				self.refresh_metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				obs::record_refresh_success(record.expires_at);
			},
			Err(e) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::record_refresh_failure(e);
			},
		}

		result
	}

	async fn exchange_refresh_token(&self) -> Result<TokenRecord> {
		let refresh_token = self
			.credentials
			.read()
			.refresh_token
			.clone()
			.filter(|token| !token.is_empty())
			.ok_or(TokenRefreshError::MissingRefreshToken)?;
		let request = self.build_refresh_request(&refresh_token)?;
		let handle = self.http_client.handle();
		let response = handle.call(request).await.map_err(TokenRefreshError::transport)?;
		let record = parse_refresh_response(&response, self.clock.now())?;

		self.credentials.write().apply(&record);

		if let Some(store) = &self.store {
			store.save(record.clone()).await?;
		}

		Ok(record)
	}

	fn build_refresh_request(&self, refresh_token: &TokenSecret) -> Result<HttpRequest> {
		let mut form = Serializer::new(String::new());

		form.append_pair("client_id", &self.client_id)
			.append_pair("grant_type", "refresh_token")
			.append_pair("refresh_token", refresh_token.expose());

		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(self.descriptor.endpoints.token.as_str())
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
			.header(ACCEPT, "application/json");

		match (self.descriptor.client_auth_method, &self.client_secret) {
			(ClientAuthMethod::ClientSecretBasic, Some(secret)) => {
				let credentials = STANDARD.encode(format!("{}:{}", self.client_id, secret.expose()));

				builder = builder.header(AUTHORIZATION, format!("Basic {credentials}"));
			},
			(ClientAuthMethod::ClientSecretPost, Some(secret)) => {
				form.append_pair("client_secret", secret.expose());
			},
			(_, None) => {},
		}

		Ok(builder.body(form.finish().into_bytes()).map_err(ConfigError::from)?)
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	refresh_token: String,
	expires_in: ExpiresIn,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	user_id: Option<String>,
	#[serde(flatten)]
	extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresIn {
	Number(f64),
	Text(String),
}
impl ExpiresIn {
	fn seconds(&self) -> f64 {
		match self {
			Self::Number(value) => *value,
			Self::Text(raw) => raw.trim().parse().unwrap_or(f64::NAN),
		}
	}
}

#[derive(Default, Deserialize)]
struct ErrorResponse {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	errors: Vec<FitbitError>,
}

#[derive(Deserialize)]
struct FitbitError {
	#[serde(default, rename = "errorType")]
	error_type: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

/// Turns a token endpoint response into a record stamped with `received_at + expires_in`.
pub(crate) fn parse_refresh_response(
	response: &HttpResponse,
	received_at: OffsetDateTime,
) -> Result<TokenRecord, TokenRefreshError> {
	let status = response.status();

	if status != StatusCode::OK {
		return Err(rejection(response));
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let body: TokenResponse = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TokenRefreshError::Parse { source, status: status.as_u16() })?;
	let expires_in = body.expires_in.seconds();
	let mut builder = TokenRecord::builder()
		.access_token(body.access_token)
		.refresh_token(body.refresh_token)
		.issued_at(received_at)
		.expires_in_secs(expires_in);

	if let Some(token_type) = body.token_type {
		builder = builder.token_type(token_type);
	}
	if let Some(scope) = body.scope {
		builder = builder.scope(scope);
	}
	if let Some(user_id) = body.user_id {
		builder = builder.user_id(user_id);
	}
	for (key, value) in body.extra {
		builder = builder.extra(key, value);
	}

	// Both tokens and the lifetime are always supplied, so only the expiry check can fail.
	builder.build().map_err(|_| TokenRefreshError::InvalidExpiresIn { value: expires_in })
}

fn rejection(response: &HttpResponse) -> TokenRefreshError {
	let meta = ResponseMetadata::from_response(response);
	let body = serde_json::from_slice::<ErrorResponse>(response.body()).unwrap_or_default();
	let first = body.errors.into_iter().next();
	let (fitbit_type, fitbit_message) = match first {
		Some(e) => (e.error_type, e.message),
		None => (None, None),
	};

	TokenRefreshError::Rejected {
		status: response.status().as_u16(),
		error: body.error.or(fitbit_type),
		description: body.error_description.or(fitbit_message),
		retry_after: meta.retry_after,
	}
}
