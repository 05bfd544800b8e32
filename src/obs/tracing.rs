// crates.io
use tracing::{Instrument, instrument::Instrumented};
// self
use crate::{_prelude::*, http::Method};

/// Span wrapper used by the dispatcher.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the request method + path.
	pub fn new(method: Method, path: &str) -> Self {
		Self { span: tracing::info_span!("request_broker.request", method = method.as_str(), path) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}
