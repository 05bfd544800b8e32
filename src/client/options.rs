//! Per-call options recognized by the orchestrator.

// std
use std::collections::BTreeMap;
// self
use crate::_prelude::*;

/// Per-call configuration.
///
/// Defaults: auth and error handling enabled, no retries, loading indicator shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOptions {
	/// Omits the bearer header and bypasses 401 refresh handling.
	pub skip_auth: bool,
	/// Suppresses generic error classification and logging.
	pub skip_error_handler: bool,
	/// Remaining automatic retries on network or 5xx failures.
	pub retry_times: u32,
	/// Drives the loading indicator while the request is in flight.
	pub show_loading: bool,
	/// Label for the loading indicator.
	pub loading_text: Option<String>,
	/// Query parameters; ordered so fingerprints are deterministic.
	pub params: BTreeMap<String, String>,
	/// Extra headers appended after the defaults.
	pub headers: Vec<(String, String)>,
	/// Overrides the configured timeout.
	pub timeout: Option<Duration>,
}
impl RequestOptions {
	/// Skips bearer injection and 401 refresh handling.
	pub fn skip_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}

	/// Suppresses generic error classification and logging.
	pub fn skip_error_handler(mut self) -> Self {
		self.skip_error_handler = true;

		self
	}

	/// Sets the number of automatic retries.
	pub fn with_retry_times(mut self, times: u32) -> Self {
		self.retry_times = times;

		self
	}

	/// Enables or disables the loading indicator.
	pub fn with_loading(mut self, show: bool) -> Self {
		self.show_loading = show;

		self
	}

	/// Sets the loading indicator label.
	pub fn with_loading_text(mut self, text: impl Into<String>) -> Self {
		self.loading_text = Some(text.into());

		self
	}

	/// Adds a query parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.params.insert(key.into(), value.to_string());

		self
	}

	/// Adds a request header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Overrides the request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			skip_auth: false,
			skip_error_handler: false,
			retry_times: 0,
			show_loading: true,
			loading_text: None,
			params: BTreeMap::new(),
			headers: Vec::new(),
			timeout: None,
		}
	}
}
