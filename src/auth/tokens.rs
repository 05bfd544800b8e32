//! Access/refresh credential pair and its write-through [`TokenStore`].

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{KeyValueStorage, StoreError},
};

/// Storage key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Access + refresh credentials as issued by the token-refresh endpoint.
///
/// No expiry is tracked; an expired access token is only discovered through a 401.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Bearer credential attached to outgoing requests.
	pub access_token: TokenSecret,
	/// Credential exchanged for a new access token after a 401.
	pub refresh_token: TokenSecret,
}

/// Pass-through persistence for the credential pair under two fixed keys.
///
/// There is no validation or expiry logic; values are read and written as-is.
#[derive(Clone)]
pub struct TokenStore {
	storage: Arc<dyn KeyValueStorage>,
}
impl TokenStore {
	/// Wraps a storage backend.
	pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
		Self { storage }
	}

	/// Reads the stored access token.
	pub fn token(&self) -> Result<Option<TokenSecret>, StoreError> {
		self.read(ACCESS_TOKEN_KEY)
	}

	/// Reads the stored refresh token.
	pub fn refresh_token(&self) -> Result<Option<TokenSecret>, StoreError> {
		self.read(REFRESH_TOKEN_KEY)
	}

	/// Writes the access token through to storage.
	pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
		self.storage.set(ACCESS_TOKEN_KEY, token)
	}

	/// Writes the refresh token through to storage.
	pub fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
		self.storage.set(REFRESH_TOKEN_KEY, token)
	}

	/// Stores both halves of a credential pair.
	pub fn set_pair(&self, pair: &CredentialPair) -> Result<(), StoreError> {
		self.set_token(pair.access_token.expose())?;
		self.set_refresh_token(pair.refresh_token.expose())
	}

	/// Removes both tokens. Safe to call repeatedly.
	pub fn clear(&self) -> Result<(), StoreError> {
		let access = self.storage.remove(ACCESS_TOKEN_KEY);
		let refresh = self.storage.remove(REFRESH_TOKEN_KEY);

		access.and(refresh)
	}

	fn read(&self, key: &str) -> Result<Option<TokenSecret>, StoreError> {
		Ok(self.storage.get(key)?.map(TokenSecret::new))
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenStore(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStorage;

	#[test]
	fn tokens_live_under_fixed_keys() {
		let storage = MemoryStorage::default();
		let store = TokenStore::new(Arc::new(storage.clone()));

		store.set_token("access-1").expect("Setting the access token should succeed.");
		store.set_refresh_token("refresh-1").expect("Setting the refresh token should succeed.");

		assert_eq!(
			storage.get(ACCESS_TOKEN_KEY).expect("Get should succeed."),
			Some("access-1".into())
		);
		assert_eq!(
			storage.get(REFRESH_TOKEN_KEY).expect("Get should succeed."),
			Some("refresh-1".into())
		);
		assert_eq!(
			store.token().expect("Token read should succeed.").map(|t| t.expose().to_owned()),
			Some("access-1".into()),
		);
	}

	#[test]
	fn clear_removes_both_and_is_idempotent() {
		let store = TokenStore::new(Arc::new(MemoryStorage::default()));
		let pair = CredentialPair {
			access_token: TokenSecret::new("a"),
			refresh_token: TokenSecret::new("r"),
		};

		store.set_pair(&pair).expect("Storing the pair should succeed.");
		store.clear().expect("Clearing should succeed.");
		store.clear().expect("Clearing twice should succeed.");

		assert!(store.token().expect("Token read should succeed.").is_none());
		assert!(store.refresh_token().expect("Refresh read should succeed.").is_none());
	}

	#[test]
	fn credential_pair_uses_camel_case_on_the_wire() {
		let pair: CredentialPair =
			serde_json::from_str(r#"{"accessToken":"a","refreshToken":"r"}"#)
				.expect("Credential pair should deserialize from camelCase JSON.");

		assert_eq!(pair.access_token.expose(), "a");
		assert_eq!(pair.refresh_token.expose(), "r");
	}
}
