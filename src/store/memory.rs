//! Thread-safe in-memory [`KeyValueStorage`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	store::{KeyValueStorage, StoreError},
};

/// Storage backend that keeps entries in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<HashMap<String, String>>>);
impl MemoryStorage {
	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl KeyValueStorage for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value.to_owned());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn set_get_remove_cycle() {
		let storage = MemoryStorage::default();

		storage.set("access_token", "a-1").expect("Memory storage set should succeed.");

		assert_eq!(storage.get("access_token").expect("Get should succeed."), Some("a-1".into()));

		storage.set("access_token", "a-2").expect("Memory storage overwrite should succeed.");

		assert_eq!(storage.get("access_token").expect("Get should succeed."), Some("a-2".into()));

		storage.remove("access_token").expect("Remove should succeed.");
		storage.remove("access_token").expect("Removing an absent key should succeed.");

		assert!(storage.is_empty());
	}

	#[test]
	fn clones_share_entries() {
		let storage = MemoryStorage::default();
		let clone = storage.clone();

		clone.set("refresh_token", "r-1").expect("Memory storage set should succeed.");

		assert_eq!(storage.len(), 1);
	}
}
