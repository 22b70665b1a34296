// crates.io
use time::macros;
// self
use fitbit_client::{
	_preludet::*,
	auth::{CredentialStatus, Credentials, TokenSecret},
	client::Client,
	clock::{Clock, ManualClock, ManualSleeper},
	error::{ApiRequestError, TokenRefreshError},
	provider::ProviderDescriptor,
	store::MemoryStore,
};

const PROFILE: &str = "https://api.fitbit.com/1/user/-/profile.json";
const REFRESHED: &str = r#"{"access_token":"A2","refresh_token":"R2","expires_in":28800,"token_type":"Bearer","scope":"activity profile","user_id":"ABC123"}"#;

struct Harness {
	client: Client<ScriptedHttpClient>,
	transport: ScriptedHttpClient,
	store: MemoryStore,
	clock: ManualClock,
}

fn harness(credentials: Credentials) -> Harness {
	let clock = ManualClock::new(macros::datetime!(2020-06-10 12:00 UTC));
	let transport = ScriptedHttpClient::default();
	let store = MemoryStore::default();
	let descriptor = ProviderDescriptor::fitbit().expect("Default descriptor should validate.");
	let client = Client::with_http_client(descriptor, "22XXXX", transport.clone())
		.with_client_secret("secret")
		.with_credentials(credentials)
		.with_token_store(Arc::new(store.clone()))
		.with_clock(Arc::new(clock.clone()))
		.with_sleeper(Arc::new(ManualSleeper::new(clock.clone())));

	Harness { client, transport, store, clock }
}

fn access_token(credentials: &Credentials) -> Option<&str> {
	credentials.access_token.as_ref().map(TokenSecret::expose)
}

#[tokio::test]
async fn future_expiry_fetches_without_refresh() {
	let h = harness(
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-10 13:00 UTC)),
	);

	h.transport.push(scripted_response(200, r#"{"user":{}}"#));

	let response = h.client.get_resource(PROFILE).await.expect("Fetch should succeed.");

	assert_eq!(response.status().as_u16(), 200);
	assert_eq!(response.body(), br#"{"user":{}}"#);
	assert_eq!(h.transport.requests().len(), 1);
	assert_eq!(h.store.save_count(), 0);
	assert_eq!(h.client.refresh_metrics().attempts(), 0);
}

#[tokio::test]
async fn expired_token_refreshes_once_and_persists_record() {
	let h = harness(
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-10 11:00 UTC)),
	);

	h.transport.push(scripted_response(200, REFRESHED));
	h.transport.push(scripted_response(200, r#"{"user":{}}"#));

	let refreshed_at = h.clock.now();

	h.client.get_resource(PROFILE).await.expect("Refresh then fetch should succeed.");

	let sent = h.transport.requests();

	assert_eq!(sent.len(), 2);
	assert_eq!(sent[0].method().as_str(), "POST");
	assert_eq!(sent[0].uri().to_string(), "https://api.fitbit.com/oauth2/token");
	assert_eq!(
		sent[1].headers().get("authorization").and_then(|v| v.to_str().ok()),
		Some("Bearer A2")
	);

	let credentials = h.client.credentials();

	assert_eq!(access_token(&credentials), Some("A2"));
	assert_eq!(credentials.refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
	assert_eq!(credentials.expires_at, Some(refreshed_at + Duration::seconds(28_800)));
	assert_eq!(h.client.credential_status(), CredentialStatus::Valid);

	let saved = h.store.records();

	assert_eq!(saved.len(), 1);
	assert_eq!(saved[0].expires_at, refreshed_at + Duration::seconds(28_800));
	assert_eq!(saved[0].user_id.as_deref(), Some("ABC123"));
	assert_eq!(saved[0].scope.as_deref(), Some("activity profile"));
}

#[tokio::test]
async fn missing_expiry_is_refreshed_before_first_fetch() {
	let h = harness(Credentials::new("A1", "R1"));

	h.transport.push(scripted_response(200, REFRESHED));
	h.transport.push(scripted_response(200, "{}"));

	h.client.get_resource(PROFILE).await.expect("Refresh then fetch should succeed.");

	assert_eq!(h.client.refresh_metrics().successes(), 1);
	assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn rejected_refresh_keeps_stale_credentials() {
	let stale =
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-10 11:00 UTC));
	let h = harness(stale.clone());

	h.transport.push(scripted_response(
		400,
		r#"{"errors":[{"errorType":"invalid_grant","message":"Refresh token invalid: R1."}],"success":false}"#,
	));

	let err = h.client.get_resource(PROFILE).await.expect_err("Rejected refresh should fail.");

	match err {
		Error::TokenRefresh(TokenRefreshError::Rejected { status, error, .. }) => {
			assert_eq!(status, 400);
			assert_eq!(error.as_deref(), Some("invalid_grant"));
		},
		other => panic!("Expected a token refresh rejection, got {other:?}."),
	}

	assert_eq!(h.client.credentials(), stale);
	assert_eq!(h.transport.requests().len(), 1);
	assert_eq!(h.store.save_count(), 0);
	assert_eq!(h.client.refresh_metrics().failures(), 1);
	assert_eq!(h.client.request_metrics().attempts(), 0);
}

#[tokio::test]
async fn refresh_transport_failure_is_a_refresh_error() {
	let h = harness(Credentials::from_refresh_token("R1"));

	h.transport.push_transport_failure();

	let err = h.client.get_resource(PROFILE).await.expect_err("Transport failure should surface.");

	assert!(matches!(err, Error::TokenRefresh(TokenRefreshError::Transport { .. })));
	assert_eq!(h.client.credentials(), Credentials::from_refresh_token("R1"));
}

#[tokio::test]
async fn non_200_resource_surfaces_status() {
	let h = harness(
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-10 13:00 UTC)),
	);

	h.transport.push(scripted_response(
		401,
		r#"{"errors":[{"errorType":"expired_token","message":"Access token expired"}]}"#,
	));

	let err = h.client.get_resource(PROFILE).await.expect_err("401 should surface as an error.");

	match err {
		Error::ApiRequest(api) => {
			assert_eq!(api.status(), Some(401));
			assert!(matches!(
				api,
				ApiRequestError::UnexpectedStatus { body_preview: Some(ref body), .. }
					if body.contains("expired_token")
			));
		},
		other => panic!("Expected an API request error, got {other:?}."),
	}

	assert_eq!(h.client.request_metrics().failures(), 1);
}

#[tokio::test]
async fn resource_transport_failure_is_an_api_error() {
	let h = harness(
		Credentials::new("A1", "R1").with_expires_at(macros::datetime!(2020-06-10 13:00 UTC)),
	);

	h.transport.push_transport_failure();

	let err = h.client.get_resource(PROFILE).await.expect_err("Transport failure should surface.");

	assert!(matches!(err, Error::ApiRequest(ApiRequestError::Transport { .. })));
}

#[tokio::test]
async fn clones_share_refreshed_credentials() {
	let h = harness(Credentials::from_refresh_token("R1"));
	let clone = h.client.clone();

	h.transport.push(scripted_response(200, REFRESHED));
	h.transport.push(scripted_response(200, "{}"));
	h.transport.push(scripted_response(200, "{}"));

	h.client.get_resource(PROFILE).await.expect("First fetch should refresh.");
	clone.get_resource(PROFILE).await.expect("Clone should reuse the refreshed token.");

	assert_eq!(h.transport.requests().len(), 3);
	assert_eq!(access_token(&clone.credentials()), Some("A2"));
	assert_eq!(h.store.save_count(), 1);
}

#[tokio::test]
async fn token_expiring_later_triggers_second_refresh() {
	let h = harness(Credentials::from_refresh_token("R1"));

	h.transport.push(scripted_response(200, REFRESHED));
	h.transport.push(scripted_response(200, "{}"));

	h.client.get_resource(PROFILE).await.expect("First fetch should refresh.");
	h.clock.advance(Duration::hours(8));

	assert_eq!(h.client.credential_status(), CredentialStatus::Expired);

	h.transport.push(scripted_response(
		200,
		r#"{"access_token":"A3","refresh_token":"R3","expires_in":28800}"#,
	));
	h.transport.push(scripted_response(200, "{}"));

	h.client.get_resource(PROFILE).await.expect("Second fetch should refresh again.");

	let sent = h.transport.requests();

	assert!(String::from_utf8_lossy(sent[2].body()).contains("refresh_token=R2"));
	assert_eq!(access_token(&h.client.credentials()), Some("A3"));
	assert_eq!(h.store.save_count(), 2);
}
