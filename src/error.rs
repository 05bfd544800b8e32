//! Broker-level error types shared across the orchestrator, transports, and stores.

// self
use crate::{_prelude::*, coalesce::CancelReason};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout); no response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Request was cancelled before it settled.
	#[error("Request was cancelled: {0}.")]
	Cancelled(CancelReason),
	/// Server answered with a non-2xx HTTP status.
	#[error("Server responded with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Raw response body, lossily decoded as UTF-8.
		body: String,
	},
	/// Server answered 2xx but the envelope reported a failure.
	#[error("{message}")]
	Business {
		/// Envelope `code`.
		code: i64,
		/// Envelope `message`, or a default when the server sent none.
		message: String,
	},
	/// Token refresh failed; every request waiting on the refresh receives the same reason.
	#[error("Token refresh failed: {reason}")]
	RefreshFailed {
		/// Human-readable refresh failure.
		reason: String,
	},
	/// Response body could not be decoded.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl Error {
	/// HTTP status attached to the failure, if the server answered at all.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::Decode { status, .. } => *status,
			_ => None,
		}
	}

	/// Returns true when the request was cancelled by the caller or the coalescer.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled(_))
	}

	/// Returns true for failures the retry protocol may resubmit: transport failures that
	/// reached the network, or HTTP 5xx answers.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Transport(TransportError::Request { .. }) => false,
			Self::Transport(_) => true,
			Self::Status { status, .. } => (500..600).contains(status),
			_ => false,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Offending value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be combined with the base URL.
	#[error("Request URL `{path}` is invalid.")]
	InvalidUrl {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// `APP_ENV` names no known deployment target.
	#[error("Unknown deployment target `{value}`.")]
	UnknownTarget {
		/// Offending value.
		value: String,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Body(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO); the server never produced a response.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The per-request timeout elapsed.
	#[error("Request timed out.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request could not be assembled (invalid header, body, or URL).
	#[error("Request could not be constructed.")]
	Request {
		/// Transport-specific builder error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific request construction error.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_builder() {
			Self::request(e)
		} else {
			Self::network(e)
		}
	}
}
