//! Per-session key/value storage backing the durable token tier.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Future returned by every [`SessionStorage`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// String key/value store scoped to one user session.
///
/// Mirrors a browser's per-tab session storage: values are plain strings, writes replace, and
/// nothing outlives the session that owns the store.
pub trait SessionStorage
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`.
	fn get_item<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set_item<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes `key`; missing keys are not an error.
	fn remove_item<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

	/// Drops every entry.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`SessionStorage`] implementations.
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

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "quota exceeded".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("quota exceeded"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn store_error_serializes_with_variant_tag() {
		let payload = serde_json::to_string(&StoreError::Serialization { message: "bad".into() })
			.expect("StoreError should serialize to JSON.");

		assert_eq!(payload, r#"{"Serialization":{"message":"bad"}}"#);
	}
}
