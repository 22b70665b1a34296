//! Fetches a daily activity summary with an expired access token: the client refreshes it,
//! persists the rotated tokens to a JSON file, and a second client resumes from that file.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::macros;
use url::Url;
// self
use fitbit_client::{
	auth::Credentials,
	client::FitbitClient,
	provider::{ProviderDescriptor, Resource},
	store::FileStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"refresh_token\":\"demo-refresh-2\",\"expires_in\":28800,\"user_id\":\"DEMO01\"}",
			);
		})
		.await;
	let activity_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/1/user/-/activities/date/2020-06-09.json")
				.header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"summary\":{\"steps\":10432,\"caloriesOut\":2381}}");
		})
		.await;
	let descriptor = ProviderDescriptor::builder()
		.token_endpoint(Url::parse(&server.url("/oauth2/token"))?)
		.api_base(Url::parse(&server.url("/"))?)
		.build()?;
	let token_path = env::temp_dir().join("fitbit-client-demo").join("tokens.json");
	let store = Arc::new(FileStore::open(&token_path)?);
	let client = FitbitClient::new(descriptor.clone(), "demo-client")
		.with_client_secret("demo-secret")
		.with_credentials(Credentials::new("stale-access", "demo-refresh-1").with_unix_expiry(0.))
		.with_token_store(store.clone());
	let url = client.resource_url(&Resource::ActivitySummary { date: macros::date!(2020-06-09) })?;
	let summary: serde_json::Value = client.get_resource_json(url.as_str()).await?;

	println!("Activity summary: {summary}");

	token_mock.assert_async().await;
	activity_mock.assert_async().await;

	let saved = FileStore::open(&token_path)?
		.latest()
		.ok_or_else(|| color_eyre::eyre::eyre!("Refreshed tokens were not persisted."))?;
	let resumed = FitbitClient::new(descriptor, "demo-client")
		.with_client_secret("demo-secret")
		.with_credentials(Credentials::from(&saved));

	println!(
		"Persisted tokens for user {:?} to {}; resumed client status: {:?}.",
		saved.user_id,
		token_path.display(),
		resumed.credential_status()
	);

	Ok(())
}
