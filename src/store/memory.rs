//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	store::{StoreFuture, TokenStore},
};

/// Keeps every saved record in-process, oldest first.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Vec<TokenRecord>>>);
impl MemoryStore {
	/// Returns every record saved so far, oldest first.
	pub fn records(&self) -> Vec<TokenRecord> {
		self.0.read().clone()
	}

	/// Returns the most recently saved record.
	pub fn latest(&self) -> Option<TokenRecord> {
		self.0.read().last().cloned()
	}

	/// Returns how many times [`TokenStore::save`] was called.
	pub fn save_count(&self) -> usize {
		self.0.read().len()
	}
}
impl TokenStore for MemoryStore {
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let records = self.0.clone();

		Box::pin(async move {
			records.write().push(record);

			Ok(())
		})
	}
}
