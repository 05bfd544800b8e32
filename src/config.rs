//! Environment-based configuration: deployment target selection and client defaults.
//!
//! `APP_ENV` picks a [`DeployTarget`] (default `dev`); `API_URL` overrides the target's base URL
//! when set to a non-empty value.

// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable naming the deployment target.
pub const APP_ENV_VAR: &str = "APP_ENV";
/// Environment variable overriding the backend base URL.
pub const API_URL_VAR: &str = "API_URL";
/// Base URL used for local development when `API_URL` is unset.
pub const LOCAL_API_URL: &str = "http://localhost:8000/api";

/// Backend deployment the client talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
	/// Local development.
	#[default]
	Dev,
	/// Shared test/UAT environment.
	Test,
	/// Production.
	Prod,
}
impl DeployTarget {
	/// Returns a stable label matching the `APP_ENV` value.
	pub const fn as_str(self) -> &'static str {
		match self {
			DeployTarget::Dev => "dev",
			DeployTarget::Test => "test",
			DeployTarget::Prod => "prod",
		}
	}

	/// Default backend base URL for the target.
	pub const fn default_api_url(self) -> &'static str {
		match self {
			DeployTarget::Dev => LOCAL_API_URL,
			DeployTarget::Test => "https://api.uat.qingyulan.net",
			DeployTarget::Prod => "https://api.qingyulan.net",
		}
	}
}
impl Display for DeployTarget {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for DeployTarget {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"dev" => Ok(Self::Dev),
			"test" => Ok(Self::Test),
			"prod" => Ok(Self::Prod),
			_ => Err(ConfigError::UnknownTarget { value: s.to_owned() }),
		}
	}
}

/// Settings shared by every request a [`RequestClient`](crate::RequestClient) issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Deployment the base URL was resolved for.
	pub target: DeployTarget,
	/// Base URL relative request paths are appended to.
	pub base_url: Url,
	/// Default per-request timeout.
	pub timeout: Duration,
	/// Timeout applied to uploads.
	pub upload_timeout: Duration,
	/// Fixed delay before each retry.
	pub retry_delay: Duration,
	/// Path of the token-refresh endpoint.
	pub refresh_path: String,
	/// Login entry point used by auth-error handling.
	pub login_path: String,
	/// Directory the default download sink writes to.
	pub download_dir: PathBuf,
}
impl ClientConfig {
	const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
	const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
	const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

	/// Creates a configuration with default timeouts for `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self {
			target: DeployTarget::default(),
			base_url,
			timeout: Self::DEFAULT_TIMEOUT,
			upload_timeout: Self::DEFAULT_UPLOAD_TIMEOUT,
			retry_delay: Self::DEFAULT_RETRY_DELAY,
			refresh_path: "/auth/refresh".into(),
			login_path: "/login".into(),
			download_dir: PathBuf::from("."),
		}
	}

	/// Parses `base_url` and creates a default configuration for it.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		let url = Url::parse(base_url)
			.map_err(|source| ConfigError::InvalidBaseUrl { value: base_url.to_owned(), source })?;

		Ok(Self::new(url))
	}

	/// Resolves the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_vars(|key| std::env::var(key).ok())
	}

	/// Resolves the configuration through `lookup` instead of the process environment.
	pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let target = match lookup(APP_ENV_VAR).filter(|value| !value.trim().is_empty()) {
			Some(value) => value.parse()?,
			None => DeployTarget::default(),
		};
		let base_url = lookup(API_URL_VAR)
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| target.default_api_url().to_owned());
		let mut config = Self::parse(&base_url)?;

		config.target = target;

		tracing::debug!(
			deploy_target = target.as_str(),
			base_url = %config.base_url,
			"Client configuration resolved."
		);

		Ok(config)
	}

	/// Overrides the default request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the upload timeout.
	pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
		self.upload_timeout = timeout;

		self
	}

	/// Overrides the delay between retries.
	pub fn with_retry_delay(mut self, delay: Duration) -> Self {
		self.retry_delay = delay;

		self
	}

	/// Overrides the token-refresh endpoint path.
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login entry point.
	pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the download directory.
	pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.download_dir = dir.into();

		self
	}

	/// Combines the base URL with `path`.
	///
	/// Only `scheme://` URLs count as absolute and pass through untouched; everything else,
	/// including `orders:search`, is appended to the base path with duplicate slashes collapsed.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		if path.contains("://") {
			return Url::parse(path)
				.map_err(|source| ConfigError::InvalidUrl { path: path.to_owned(), source });
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let relative = path.trim_start_matches('/');
		let combined =
			if relative.is_empty() { base.to_owned() } else { format!("{base}/{relative}") };

		Url::parse(&combined)
			.map_err(|source| ConfigError::InvalidUrl { path: path.to_owned(), source })
	}
}
