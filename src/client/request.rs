//! Internal request model and the request-phase transformations applied before dispatch.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::RequestOptions,
	coalesce::Fingerprint,
	config::ClientConfig,
	envelope::ApiResponse,
	http::{Method, RequestBody, TransportRequest},
};

/// Query parameter carrying the cache-busting timestamp on GET requests.
pub const CACHE_BUST_PARAM: &str = "_t";
/// Content type sent with non-multipart requests.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

const ACCEPT: &str = "application/json, text/plain, */*";

/// How a 2xx body is handed back to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResponseKind {
	/// Parsed as an [`ApiResponse`] and checked for business success.
	Envelope,
	/// Returned as raw bytes.
	Raw,
}

/// Everything needed to (re)submit a request through the orchestrator.
#[derive(Clone, Debug)]
pub(crate) struct ApiRequest {
	pub(crate) method: Method,
	pub(crate) path: String,
	pub(crate) body: RequestBody,
	pub(crate) options: RequestOptions,
	pub(crate) response: ResponseKind,
	/// Set once the request has been resubmitted after a token refresh; a further 401 rejects.
	pub(crate) resubmitted_after_refresh: bool,
}
impl ApiRequest {
	pub(crate) fn new(
		method: Method,
		path: impl Into<String>,
		body: RequestBody,
		options: RequestOptions,
	) -> Self {
		Self {
			method,
			path: path.into(),
			body,
			options,
			response: ResponseKind::Envelope,
			resubmitted_after_refresh: false,
		}
	}

	/// Hands the body back untouched instead of unwrapping an envelope.
	pub(crate) fn raw(mut self) -> Self {
		self.response = ResponseKind::Raw;

		self
	}

	/// Fingerprint over method, path, params, and body; the cache-busting stamp is excluded.
	pub(crate) fn fingerprint(&self) -> Fingerprint {
		let params = serde_json::Value::Object(
			self.options
				.params
				.iter()
				.map(|(key, value)| (key.clone(), Value::String(value.clone())))
				.collect(),
		);

		Fingerprint::from_parts(
			self.method.as_str(),
			&self.path,
			&params.to_string(),
			&self.body.fingerprint_repr(),
		)
	}

	/// Resolves the URL and applies query params, the optional stamp, and headers.
	pub(crate) fn to_transport(
		&self,
		config: &ClientConfig,
		token: Option<&TokenSecret>,
		stamp: Option<i64>,
	) -> Result<TransportRequest> {
		let mut url = config.resolve(&self.path)?;

		if !self.options.params.is_empty() || stamp.is_some() {
			let mut pairs = url.query_pairs_mut();

			for (key, value) in &self.options.params {
				pairs.append_pair(key, value);
			}
			if let Some(stamp) = stamp {
				pairs.append_pair(CACHE_BUST_PARAM, &stamp.to_string());
			}
		}

		let mut headers = vec![("Accept".to_owned(), ACCEPT.to_owned())];

		if !matches!(self.body, RequestBody::Multipart(_)) {
			headers.push(("Content-Type".into(), JSON_CONTENT_TYPE.into()));
		}
		if let Some(token) = token {
			headers.push(("Authorization".into(), token.bearer()));
		}

		headers.extend(self.options.headers.iter().cloned());

		Ok(TransportRequest {
			method: self.method,
			url,
			headers,
			body: self.body.clone(),
			timeout: self.options.timeout.unwrap_or(config.timeout),
		})
	}
}

/// Settled 2xx payload.
#[derive(Debug)]
pub(crate) enum Payload {
	/// Decoded envelope together with the body it was decoded from.
	Envelope { envelope: ApiResponse, body: Vec<u8> },
	Raw(Vec<u8>),
}
impl Payload {
	pub(crate) fn into_envelope(self) -> Result<ApiResponse> {
		match self {
			Payload::Envelope { envelope, .. } => Ok(envelope),
			Payload::Raw(bytes) => ApiResponse::from_slice(&bytes, None),
		}
	}

	pub(crate) fn into_bytes(self) -> Vec<u8> {
		match self {
			Payload::Envelope { body, .. } | Payload::Raw(body) => body,
		}
	}
}

/// Millisecond timestamps that strictly increase per client, even within one millisecond.
#[derive(Debug, Default)]
pub(crate) struct CacheBuster {
	last: AtomicI64,
}
impl CacheBuster {
	pub(crate) fn next(&self) -> i64 {
		let now = i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000)
			.unwrap_or(i64::MAX);
		let mut previous = self.last.load(Ordering::Relaxed);

		loop {
			let candidate = now.max(previous.saturating_add(1));

			match self.last.compare_exchange_weak(
				previous,
				candidate,
				Ordering::Relaxed,
				Ordering::Relaxed,
			) {
				Ok(_) => return candidate,
				Err(actual) => previous = actual,
			}
		}
	}
}
