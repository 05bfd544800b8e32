//! Generic error classification applied to failed requests.

// self
use crate::{
	_prelude::*,
	client::RequestClient,
	envelope::ApiResponse,
	error::TransportError,
	http::HttpTransport,
};

/// Human-facing category of a failed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// HTTP 400.
	BadRequest,
	/// HTTP 401; also triggers auth-error handling.
	Unauthorized,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 500.
	InternalServerError,
	/// HTTP 502.
	BadGateway,
	/// HTTP 503.
	ServiceUnavailable,
	/// HTTP 504.
	GatewayTimeout,
	/// Any other HTTP status.
	Other(u16),
	/// The request was sent but no response arrived.
	NetworkUnreachable,
	/// The request could not be built or sent at all.
	RequestConfiguration,
}
impl ErrorCategory {
	/// Classifies `error` by HTTP status first, then by how far the request got.
	pub fn classify(error: &Error) -> Self {
		if let Some(status) = error.status() {
			return Self::from_status(status);
		}

		match error {
			Error::Transport(TransportError::Request { .. }) => Self::RequestConfiguration,
			Error::Transport(_) => Self::NetworkUnreachable,
			_ => Self::RequestConfiguration,
		}
	}

	/// Maps an HTTP status to its category.
	pub const fn from_status(status: u16) -> Self {
		match status {
			400 => Self::BadRequest,
			401 => Self::Unauthorized,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			500 => Self::InternalServerError,
			502 => Self::BadGateway,
			503 => Self::ServiceUnavailable,
			504 => Self::GatewayTimeout,
			other => Self::Other(other),
		}
	}

	/// Message reported for the category.
	pub fn message(self) -> String {
		match self {
			Self::BadRequest => "Bad request parameters.".into(),
			Self::Unauthorized => "Not authorized; please sign in again.".into(),
			Self::Forbidden => "Access denied.".into(),
			Self::NotFound => "The requested resource does not exist.".into(),
			Self::InternalServerError => "Internal server error.".into(),
			Self::BadGateway => "Bad gateway.".into(),
			Self::ServiceUnavailable => "Service unavailable.".into(),
			Self::GatewayTimeout => "Gateway timeout.".into(),
			Self::Other(status) => format!("Request failed with status {status}."),
			Self::NetworkUnreachable => "Network connection failed; check your network.".into(),
			Self::RequestConfiguration => "Request configuration error.".into(),
		}
	}
}
impl Display for ErrorCategory {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.message())
	}
}

impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Logs a classified failure; 401s also run auth-error handling.
	pub(crate) fn report(&self, error: &Error) -> ErrorCategory {
		let category = ErrorCategory::classify(error);

		tracing::error!(status = ?error.status(), error = %error, "{category}");

		if category == ErrorCategory::Unauthorized {
			self.handle_auth_error();
		}

		category
	}

	/// Reacts to an envelope that reported a business failure.
	pub(crate) fn report_business_failure(&self, envelope: &ApiResponse) {
		let message = envelope.failure_message();

		match envelope.code {
			401 => {
				tracing::warn!(
					code = envelope.code,
					detail = message,
					"Business authentication failure."
				);

				self.handle_auth_error();
			},
			403 => tracing::error!(code = envelope.code, detail = message, "Permission denied."),
			code => tracing::error!(code, detail = message, "Business error."),
		}
	}

	/// Clears credentials, cancels every pending request, and redirects to login.
	pub(crate) fn handle_auth_error(&self) {
		if let Err(e) = self.tokens.clear() {
			tracing::error!(error = %e, "Failed to clear stored credentials.");
		}

		self.coalescer.cancel_all_pending();
		self.redirect.redirect(&self.config.login_path);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{coalesce::CancelReason, store::StoreError};

	#[test]
	fn statuses_map_to_categories() {
		let status = |status| Error::Status { status, body: String::new() };

		assert_eq!(ErrorCategory::classify(&status(400)), ErrorCategory::BadRequest);
		assert_eq!(ErrorCategory::classify(&status(401)), ErrorCategory::Unauthorized);
		assert_eq!(ErrorCategory::classify(&status(504)), ErrorCategory::GatewayTimeout);
		assert_eq!(ErrorCategory::classify(&status(418)), ErrorCategory::Other(418));
		assert_eq!(ErrorCategory::Other(418).message(), "Request failed with status 418.");
	}

	#[test]
	fn non_http_failures_split_by_how_far_the_request_got() {
		let timeout = Error::from(TransportError::Timeout);
		let build = Error::from(TransportError::request(std::io::Error::other("bad header")));
		let storage = Error::from(StoreError::Backend { message: "locked".into() });

		assert_eq!(ErrorCategory::classify(&timeout), ErrorCategory::NetworkUnreachable);
		assert_eq!(ErrorCategory::classify(&build), ErrorCategory::RequestConfiguration);
		assert_eq!(ErrorCategory::classify(&storage), ErrorCategory::RequestConfiguration);
		assert_eq!(
			ErrorCategory::classify(&Error::Cancelled(CancelReason::CancelledAll)),
			ErrorCategory::RequestConfiguration,
		);
	}
}
