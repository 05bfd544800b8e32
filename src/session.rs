//! Navigation seam invoked when authentication can no longer be recovered.

// self
use crate::_prelude::*;

/// Sends the user to the login entry point after credentials are cleared.
pub trait LoginRedirect
where
	Self: Send + Sync,
{
	/// Navigates to `path`.
	fn redirect(&self, path: &str);
}

/// Redirect that only reports through `tracing`; suitable for headless processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRedirect;
impl LoginRedirect for LogRedirect {
	fn redirect(&self, path: &str) {
		tracing::warn!(path, "Authentication failed; login required.");
	}
}

/// Redirect that records every navigation; handy for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingRedirect(Arc<Mutex<Vec<String>>>);
impl RecordingRedirect {
	/// Paths navigated to so far, oldest first.
	pub fn paths(&self) -> Vec<String> {
		self.0.lock().clone()
	}
}
impl LoginRedirect for RecordingRedirect {
	fn redirect(&self, path: &str) {
		self.0.lock().push(path.to_owned());
	}
}
