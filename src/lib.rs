//! Async Fitbit Web API client: OAuth 2.0 refresh-token rotation with pluggable persistence,
//! and a sliding-window request budget that waits instead of failing.
//!
//! ```no_run
//! use fitbit_client::{auth::Credentials, client::Client, store::MemoryStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> fitbit_client::error::Result<()> {
//! let client = Client::fitbit("client-id")?
//! 	.with_client_secret("client-secret")
//! 	.with_credentials(Credentials::from_refresh_token("refresh-token"))
//! 	.with_token_store(Arc::new(MemoryStore::default()));
//! let profile = client.get_resource("1/user/-/profile.json").await?;
//!
//! println!("{}", String::from_utf8_lossy(profile.body()));
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod clock;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fakes shared by unit and integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError,
		http::{Request, StatusCode},
	};
	// self
	use crate::http::{ApiHttpClient, HttpRequest, HttpResponse};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

	/// Error returned by [`ScriptedHttpClient`] for scripted transport failures.
	#[derive(Debug, ThisError)]
	#[error("Scripted transport failure.")]
	pub struct ScriptedTransportError;

	enum ScriptedReply {
		Response(HttpResponse),
		TransportFailure,
	}

	#[derive(Default)]
	struct ScriptedState {
		replies: Mutex<VecDeque<ScriptedReply>>,
		requests: Mutex<Vec<HttpRequest>>,
	}

	/// In-process transport that records every request and replays queued responses in order.
	///
	/// Clones share the same queue and request log. An empty queue answers with a transport
	/// failure.
	#[derive(Clone, Default)]
	pub struct ScriptedHttpClient(Arc<ScriptedState>);
	impl ScriptedHttpClient {
		/// Queues a response.
		pub fn push(&self, response: HttpResponse) {
			self.0.replies.lock().push_back(ScriptedReply::Response(response));
		}

		/// Queues a transport failure.
		pub fn push_transport_failure(&self) {
			self.0.replies.lock().push_back(ScriptedReply::TransportFailure);
		}

		/// Returns copies of every request received so far.
		pub fn requests(&self) -> Vec<HttpRequest> {
			self.0.requests.lock().iter().map(copy_request).collect()
		}
	}
	impl ApiHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHttpClient;
		type TransportError = ScriptedTransportError;

		fn handle(&self) -> Self::Handle {
			self.clone()
		}
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHttpClient {
		type Error = HttpClientError<ScriptedTransportError>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			self.0.requests.lock().push(request);

			let reply = self.0.replies.lock().pop_front();

			Box::pin(async move {
				match reply {
					Some(ScriptedReply::Response(response)) => Ok(response),
					Some(ScriptedReply::TransportFailure) | None =>
						Err(HttpClientError::from(Box::new(ScriptedTransportError))),
				}
			})
		}
	}
	impl Debug for ScriptedHttpClient {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.debug_struct("ScriptedHttpClient")
				.field("queued", &self.0.replies.lock().len())
				.field("received", &self.0.requests.lock().len())
				.finish()
		}
	}

	/// Builds a response with the given status and body.
	pub fn scripted_response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::IM_A_TEAPOT);

		response
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.unwrap_or_default();

		ReqwestHttpClient::with_client(client)
	}

	fn copy_request(request: &HttpRequest) -> HttpRequest {
		let mut copy = Request::new(request.body().clone());

		*copy.method_mut() = request.method().clone();
		*copy.uri_mut() = request.uri().clone();
		*copy.headers_mut() = request.headers().clone();

		copy
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use time;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
