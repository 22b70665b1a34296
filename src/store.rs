//! Persistence capability for refreshed token records, plus built-in adapters.
//!
//! The client calls [`TokenStore::save`] exactly once after every successful refresh, before
//! the refresh returns, so callers can keep the rotated refresh token. The client never reads
//! from a store; seeding credentials from a previously saved record is up to the caller
//! (see [`FileStore::latest`]).

pub mod callback;
pub mod file;
pub mod memory;

pub use callback::FnStore;
pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenRecord};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract that receives every refreshed token record.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists the freshly refreshed record.
	fn save(&self, record: TokenRecord) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Builds a [`StoreError::Backend`] from any displayable failure.
	pub fn backend(message: impl Display) -> Self {
		Self::Backend { message: message.to_string() }
	}
}
