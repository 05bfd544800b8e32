//! Observability helpers for request dispatch.
//!
//! - Every dispatch runs inside a `request_broker.request` span carrying the `method` and
//!   `path` fields.
//! - Enable `metrics` to increment the `request_broker_request_total` counter for every
//!   attempt/success/failure/cancellation/retry/refresh, labeled by `method` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to the dispatcher.
	Attempt,
	/// Caller received a resolved envelope or payload.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Request was cancelled by the coalescer or a global cancel.
	Cancelled,
	/// Request was resubmitted by the retry protocol.
	Retry,
	/// Request waited on (or triggered) a token refresh.
	Refresh,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
			RequestOutcome::Cancelled => "cancelled",
			RequestOutcome::Retry => "retry",
			RequestOutcome::Refresh => "refresh",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
