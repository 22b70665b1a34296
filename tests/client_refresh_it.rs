#![cfg(feature = "reqwest")]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use time::macros;
// self
use fitbit_client::{
	_preludet::*,
	auth::{Credentials, TokenSecret},
	client::FitbitClient,
	clock::ManualClock,
	error::{ApiRequestError, TokenRefreshError},
	http::ReqwestHttpClient,
	provider::{ClientAuthMethod, ProviderDescriptor},
	store::MemoryStore,
};

const CLIENT_ID: &str = "22XXXX";
const CLIENT_SECRET: &str = "secret-refresh";
// base64("22XXXX:secret-refresh")
const BASIC_AUTH: &str = "Basic MjJYWFhYOnNlY3JldC1yZWZyZXNo";
const TOKEN_BODY: &str = r#"{"access_token":"A2","refresh_token":"R2","expires_in":28800,"token_type":"Bearer","user_id":"ABC123"}"#;

fn build_descriptor(server: &MockServer, method: ClientAuthMethod) -> ProviderDescriptor {
	ProviderDescriptor::builder()
		.token_endpoint(
			Url::parse(&server.url("/oauth2/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.api_base(Url::parse(&server.url("/")).expect("Mock API base should parse successfully."))
		.client_auth_method(method)
		.build()
		.expect("Provider descriptor should build successfully.")
}

fn build_client(descriptor: ProviderDescriptor, credentials: Credentials) -> FitbitClient {
	let http_client: ReqwestHttpClient = test_reqwest_http_client();

	FitbitClient::with_http_client(descriptor, CLIENT_ID, http_client)
		.with_client_secret(CLIENT_SECRET)
		.with_credentials(credentials)
}

#[tokio::test]
async fn expired_token_is_refreshed_over_http_then_resource_fetched() {
	let server = MockServer::start_async().await;
	let clock = ManualClock::new(macros::datetime!(2020-06-10 00:00 UTC));
	let store = MemoryStore::default();
	let client = build_client(
		build_descriptor(&server, ClientAuthMethod::ClientSecretBasic),
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-09 23:00 UTC)),
	)
	.with_clock(Arc::new(clock.clone()))
	.with_token_store(Arc::new(store.clone()));
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.header("authorization", BASIC_AUTH)
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1/user/-/profile.json").header("authorization", "Bearer A2");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"user":{"encodedId":"ABC123"}}"#);
		})
		.await;
	let response = client
		.get_resource("1/user/-/profile.json")
		.await
		.expect("Refresh then fetch should succeed.");

	token_mock.assert_async().await;
	profile_mock.assert_async().await;

	assert_eq!(response.body(), br#"{"user":{"encodedId":"ABC123"}}"#);
	assert_eq!(
		response.headers().get("content-type").and_then(|v| v.to_str().ok()),
		Some("application/json")
	);

	let saved = store.latest().expect("Refreshed record should be persisted.");

	assert_eq!(store.save_count(), 1);
	assert_eq!(saved.refresh_token.expose(), "R2");
	assert_eq!(saved.expires_at, macros::datetime!(2020-06-10 08:00 UTC));
}

#[tokio::test]
async fn client_secret_post_omits_basic_auth() {
	let server = MockServer::start_async().await;
	let client = build_client(
		build_descriptor(&server, ClientAuthMethod::ClientSecretPost),
		Credentials::from_refresh_token("R1"),
	);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(TOKEN_BODY);
		})
		.await;
	let record = client.refresh_tokens().await.expect("Refresh should succeed.");

	token_mock.assert_async().await;

	assert_eq!(record.access_token.expose(), "A2");
	assert_eq!(record.user_id.as_deref(), Some("ABC123"));
}

#[tokio::test]
async fn rejected_refresh_does_not_reach_resource() {
	let server = MockServer::start_async().await;
	let stale = Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-09 23:00 UTC));
	let client = build_client(
		build_descriptor(&server, ClientAuthMethod::ClientSecretBasic),
		stale.clone(),
	);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"errors":[{"errorType":"invalid_grant","message":"Refresh token invalid: R1."}],"success":false}"#);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1/user/-/profile.json");
			then.status(200).body("{}");
		})
		.await;
	let err = client
		.get_resource("1/user/-/profile.json")
		.await
		.expect_err("Rejected refresh should fail the fetch.");

	token_mock.assert_async().await;
	profile_mock.assert_calls_async(0).await;

	assert!(matches!(err, Error::TokenRefresh(TokenRefreshError::Rejected { status: 400, .. })));
	assert_eq!(client.credentials(), stale);
}

#[tokio::test]
async fn concurrent_fetches_share_one_refresh() {
	let server = MockServer::start_async().await;
	let client = build_client(
		build_descriptor(&server, ClientAuthMethod::ClientSecretBasic),
		Credentials::from_refresh_token("R1"),
	);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.delay(StdDuration::from_millis(200))
				.body(TOKEN_BODY);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1/user/-/profile.json").header("authorization", "Bearer A2");
			then.status(200).body("{}");
		})
		.await;
	let first = client.clone();
	let second = client.clone();
	let (a, b) = tokio::join!(
		first.get_resource("1/user/-/profile.json"),
		second.get_resource("1/user/-/profile.json"),
	);

	a.expect("First concurrent fetch should succeed.");
	b.expect("Second concurrent fetch should succeed.");
	token_mock.assert_calls_async(1).await;
	profile_mock.assert_calls_async(2).await;

	assert_eq!(client.refresh_metrics().attempts(), 1);
	assert_eq!(
		client.credentials().access_token.as_ref().map(TokenSecret::expose),
		Some("A2")
	);
}

#[tokio::test]
async fn throttled_resource_reports_status_and_retry_after() {
	let server = MockServer::start_async().await;
	let client = build_client(
		build_descriptor(&server, ClientAuthMethod::ClientSecretBasic),
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2099-01-01 00:00 UTC)),
	);
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/1/user/-/profile.json");
			then.status(429).header("retry-after", "60").body("Too Many Requests");
		})
		.await;
	let err = client
		.get_resource("1/user/-/profile.json")
		.await
		.expect_err("429 should surface as an error.");

	profile_mock.assert_async().await;

	match err {
		Error::ApiRequest(ApiRequestError::UnexpectedStatus { status, retry_after, body_preview }) => {
			assert_eq!(status, 429);
			assert_eq!(retry_after, Some(Duration::seconds(60)));
			assert_eq!(body_preview.as_deref(), Some("Too Many Requests"));
		},
		other => panic!("Expected an unexpected-status error, got {other:?}."),
	}
}
