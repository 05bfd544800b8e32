//! Durable key-value storage contracts and built-in backends for client credentials.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::_prelude::*;

/// String key-value storage that survives for as long as the backend does.
///
/// Calls are synchronous: the orchestrator reads and writes credentials between suspension
/// points, so a backend must never block on the network.
pub trait KeyValueStorage
where
	Self: Send + Sync,
{
	/// Returns the stored value, if any.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Persists or replaces the value for `key`.
	fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

	/// Deletes the value for `key`; absent keys are not an error.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`KeyValueStorage`] implementations.
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
