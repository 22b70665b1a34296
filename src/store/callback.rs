//! Closure adapter so a plain function can act as the persistence capability.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{StoreError, StoreFuture, TokenStore},
};

/// Wraps a synchronous closure as a [`TokenStore`].
///
/// ```
/// use fitbit_client::store::{FnStore, StoreError};
///
/// let store = FnStore::new(|record| {
/// 	println!("refreshed; expires at {}", record.expires_at);
///
/// 	Ok::<_, StoreError>(())
/// });
/// # let _ = store;
/// ```
pub struct FnStore<F>(F);
impl<F> FnStore<F>
where
	F: Fn(TokenRecord) -> Result<(), StoreError> + Send + Sync,
{
	/// Wraps `f`.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F> TokenStore for FnStore<F>
where
	F: Fn(TokenRecord) -> Result<(), StoreError> + Send + Sync,
{
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let outcome = (self.0)(record);

		Box::pin(async move { outcome })
	}
}
impl<F> Debug for FnStore<F> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnStore(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn closure_receives_record_and_errors_propagate() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let store = FnStore::new(move |record: TokenRecord| {
			sink.lock().push(record.refresh_token.expose().to_owned());

			if record.refresh_token.expose() == "reject" {
				Err(StoreError::backend("rejected"))
			} else {
				Ok(())
			}
		});
		let record = |refresh: &str| {
			TokenRecord::builder()
				.access_token("access")
				.refresh_token(refresh)
				.expires_in_secs(60.0)
				.build()
				.expect("Token record fixture should build.")
		};

		store.save(record("R2")).await.expect("Accepting closure should succeed.");

		let err = store.save(record("reject")).await.expect_err("Rejecting closure should fail.");

		assert_eq!(err, StoreError::backend("rejected"));
		assert_eq!(*seen.lock(), vec!["R2".to_owned(), "reject".to_owned()]);
	}
}
