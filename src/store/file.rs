//! File-backed [`KeyValueStorage`] so credentials survive process restarts.

// std
use std::{
	ffi::OsString,
	fs::{self, File},
	io::Write,
	process,
	sync::atomic::{AtomicU64, Ordering},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStorage, StoreError},
};

/// Persists entries to a JSON object file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<String, String>>>,
}
impl FileStorage {
	/// Opens (or creates) storage at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, String>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create storage directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<String, String>) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize storage snapshot: {e}"),
			})?;

		write_atomically(&self.path, &serialized)
	}
}
impl KeyValueStorage for FileStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		Ok(self.inner.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		guard.insert(key.to_owned(), value.to_owned());
		self.persist_locked(&guard)
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		let mut guard = self.inner.write();

		if guard.remove(key).is_some() {
			self.persist_locked(&guard)?;
		}

		Ok(())
	}
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to a sibling temp file, syncs it, then renames it over `path`.
///
/// The temp name extends the full file name with a per-write suffix, so siblings such as
/// `report.tmp` are never touched and concurrent writers never share a temp file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
	let tmp_path = tmp_path_for(path);

	{
		let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(bytes).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
	}

	fs::rename(&tmp_path, path).map_err(|e| {
		let _ = fs::remove_file(&tmp_path);

		StoreError::Backend { message: format!("Failed to replace {}: {e}", path.display()) }
	})
}

fn tmp_path_for(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(OsString::from).unwrap_or_default();

	name.push(format!(".{}.{}.tmp", process::id(), TMP_COUNTER.fetch_add(1, Ordering::Relaxed)));

	path.with_file_name(name)
}

#[cfg(test)]
mod tests {
	// std
	use std::env;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"request_broker_file_storage_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn values_survive_reopen() {
		let path = temp_path();
		let storage = FileStorage::open(&path).expect("Failed to open file storage.");

		storage.set("access_token", "persisted").expect("Failed to write access token.");
		storage.set("refresh_token", "rotating").expect("Failed to write refresh token.");
		storage.remove("refresh_token").expect("Failed to remove refresh token.");
		drop(storage);

		let reopened = FileStorage::open(&path).expect("Failed to reopen file storage.");

		assert_eq!(
			reopened.get("access_token").expect("Reopened get should succeed."),
			Some("persisted".into()),
		);
		assert_eq!(reopened.get("refresh_token").expect("Reopened get should succeed."), None);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary storage file {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupted_snapshot_is_reported() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Failed to write corrupted fixture.");

		let err = FileStorage::open(&path).expect_err("Corrupted snapshot should fail to load.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary storage file {}: {e}", path.display())
		});
	}

	#[test]
	fn temp_names_extend_the_target_name() {
		let dir = env::temp_dir();
		let first = tmp_path_for(&dir.join("report.csv"));
		let second = tmp_path_for(&dir.join("report.csv"));
		let name = first.file_name().and_then(|n| n.to_str()).expect("Temp name should be UTF-8.");

		assert!(name.starts_with("report.csv."));
		assert!(name.ends_with(".tmp"));
		assert_ne!(first, second);
		assert_eq!(first.parent(), Some(dir.as_path()));
	}
}
