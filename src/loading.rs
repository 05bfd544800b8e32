//! Reference-counted busy indicator driven by in-flight requests.

// self
use crate::_prelude::*;

/// Label shown when a request does not provide its own loading text.
pub const DEFAULT_LOADING_TEXT: &str = "Loading...";

/// Presentation seam for the global busy indicator.
///
/// [`LoadingTracker`] only calls [`show`](Self::show) on the 0 to 1 transition and
/// [`hide`](Self::hide) on the 1 to 0 transition (or on [`LoadingTracker::clear`]).
pub trait LoadingIndicator
where
	Self: Send + Sync,
{
	/// Displays the indicator with the provided label.
	fn show(&self, label: &str);

	/// Hides the indicator.
	fn hide(&self);
}

/// Indicator that only reports transitions through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogIndicator;
impl LoadingIndicator for LogIndicator {
	fn show(&self, label: &str) {
		tracing::info!(label, "Loading indicator shown.");
	}

	fn hide(&self) {
		tracing::debug!("Loading indicator hidden.");
	}
}

/// Counts in-flight requests so the indicator is visible iff the counter is positive.
///
/// The indicator is called after the counter lock is released, so it may read [`Self::count`].
pub struct LoadingTracker {
	count: Mutex<usize>,
	indicator: Arc<dyn LoadingIndicator>,
}
impl LoadingTracker {
	/// Builds a tracker that drives `indicator`.
	pub fn new(indicator: Arc<dyn LoadingIndicator>) -> Self {
		Self { count: Mutex::new(0), indicator }
	}

	/// Increments the counter; the first caller's label is used until the indicator hides.
	pub fn show(&self, text: Option<&str>) {
		let first = {
			let mut count = self.count.lock();

			*count += 1;

			*count == 1
		};

		if first {
			self.indicator.show(text.unwrap_or(DEFAULT_LOADING_TEXT));
		}
	}

	/// Decrements the counter, floored at zero.
	pub fn hide(&self) {
		let last = {
			let mut count = self.count.lock();

			if *count == 0 {
				return;
			}

			*count -= 1;

			*count == 0
		};

		if last {
			self.indicator.hide();
		}
	}

	/// Forces the counter to zero and hides the indicator unconditionally.
	pub fn clear(&self) {
		*self.count.lock() = 0;

		self.indicator.hide();
	}

	/// Current number of requests holding the indicator.
	pub fn count(&self) -> usize {
		*self.count.lock()
	}

	/// Returns true while at least one request holds the indicator.
	pub fn is_visible(&self) -> bool {
		self.count() > 0
	}
}
impl Default for LoadingTracker {
	fn default() -> Self {
		Self::new(Arc::new(LogIndicator))
	}
}
impl Debug for LoadingTracker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoadingTracker").field("count", &self.count()).finish()
	}
}
