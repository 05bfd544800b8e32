//! Duplicate in-flight request detection and cooperative cancellation.
//!
//! Every dispatched request registers its [`Fingerprint`] with the [`RequestCoalescer`]. A second
//! registration under the same fingerprint cancels the first one before it is recorded, so at
//! most one live record exists per fingerprint and only the most recent request may complete.
//! Cancellation is delivered through a [`CancelSignal`] the dispatcher races against the
//! transport call.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

/// Deterministic key over method, URL, serialized params, and serialized body.
///
/// Distinct requests with identical components are deliberately treated as duplicates.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);
impl Fingerprint {
	/// Computes the fingerprint as a base64 (no padding) SHA-256 digest of the `&`-joined parts.
	pub fn from_parts(method: &str, url: &str, params: &str, body: &str) -> Self {
		let mut hasher = Sha256::new();

		hasher.update([method, url, params, body].join("&").as_bytes());

		Self(STANDARD_NO_PAD.encode(hasher.finalize()))
	}

	/// Returns the encoded digest.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for Fingerprint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Fingerprint({})", self.0)
	}
}

/// Why a request was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancelReason {
	/// An identical request was issued while this one was in flight.
	Superseded,
	/// Every pending request was cancelled (auth failure, navigation, or shutdown).
	CancelledAll,
}
impl CancelReason {
	/// Returns a stable label suitable for logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			CancelReason::Superseded => "duplicate request superseded",
			CancelReason::CancelledAll => "all pending requests cancelled",
		}
	}
}
impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Sending half of a cancellation; consumed when fired.
#[derive(Debug)]
pub struct CancelHandle(oneshot::Sender<CancelReason>);
impl CancelHandle {
	/// Signals the paired [`CancelSignal`].
	pub fn cancel(self, reason: CancelReason) {
		let _ = self.0.send(reason);
	}
}

/// Receiving half of a cancellation.
#[derive(Debug)]
pub struct CancelSignal(oneshot::Receiver<CancelReason>);
impl CancelSignal {
	/// Resolves with the reason once cancelled.
	///
	/// A handle dropped without firing (the record was removed) never resolves.
	pub async fn cancelled(self) -> CancelReason {
		match self.0.await {
			Ok(reason) => reason,
			Err(_) => std::future::pending().await,
		}
	}
}

/// Creates a linked handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
	let (tx, rx) = oneshot::channel();

	(CancelHandle(tx), CancelSignal(rx))
}

/// Identifies one registration in the pending table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTicket {
	/// Fingerprint the request registered under.
	pub fingerprint: Fingerprint,
	id: u64,
}

#[derive(Debug)]
struct PendingEntry {
	id: u64,
	handle: CancelHandle,
}

/// Table of live requests keyed by [`Fingerprint`].
#[derive(Debug, Default)]
pub struct RequestCoalescer {
	pending: Mutex<HashMap<Fingerprint, PendingEntry>>,
	next_id: AtomicU64,
}
impl RequestCoalescer {
	/// Registers a request, cancelling any live record with the same fingerprint first.
	pub fn add_pending(&self, fingerprint: Fingerprint) -> (PendingTicket, CancelSignal) {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let (handle, signal) = cancel_pair();
		let mut pending = self.pending.lock();

		if let Some(previous) = pending.remove(&fingerprint) {
			tracing::debug!(fingerprint = fingerprint.as_str(), "Cancelling duplicate request.");

			previous.handle.cancel(CancelReason::Superseded);
		}

		pending.insert(fingerprint.clone(), PendingEntry { id, handle });

		(PendingTicket { fingerprint, id }, signal)
	}

	/// Deletes the record for `fingerprint`, whoever registered it. No-op when absent.
	pub fn remove_pending(&self, fingerprint: &Fingerprint) {
		self.pending.lock().remove(fingerprint);
	}

	/// Deletes the record only if it still belongs to `ticket`.
	///
	/// A superseded request settling late must not drop its successor's record.
	pub fn release(&self, ticket: &PendingTicket) {
		let mut pending = self.pending.lock();

		if pending.get(&ticket.fingerprint).is_some_and(|entry| entry.id == ticket.id) {
			pending.remove(&ticket.fingerprint);
		}
	}

	/// Cancels every live record and clears the table.
	pub fn cancel_all_pending(&self) {
		let drained = std::mem::take(&mut *self.pending.lock());

		if !drained.is_empty() {
			tracing::info!(count = drained.len(), "Cancelling all pending requests.");
		}

		for (_, entry) in drained {
			entry.handle.cancel(CancelReason::CancelledAll);
		}
	}

	/// Number of live records.
	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Returns true when no request is registered.
	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}

	/// Returns true when a record exists for `fingerprint`.
	pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
		self.pending.lock().contains_key(fingerprint)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::time::{self, Duration as TokioDuration};
	// self
	use super::*;

	fn users() -> Fingerprint {
		Fingerprint::from_parts("GET", "/users", r#"{"id":"1"}"#, "null")
	}

	#[test]
	fn fingerprint_is_deterministic_and_component_sensitive() {
		assert_eq!(users(), users());
		assert_ne!(users(), Fingerprint::from_parts("POST", "/users", r#"{"id":"1"}"#, "null"));
		assert_ne!(users(), Fingerprint::from_parts("GET", "/users", r#"{"id":"2"}"#, "null"));
		assert_ne!(users(), Fingerprint::from_parts("GET", "/users", r#"{"id":"1"}"#, "{}"));
	}

	#[tokio::test]
	async fn duplicate_registration_cancels_previous_request() {
		let coalescer = RequestCoalescer::default();
		let (first, first_signal) = coalescer.add_pending(users());
		let (second, _second_signal) = coalescer.add_pending(users());

		assert_eq!(first_signal.cancelled().await, CancelReason::Superseded);
		assert_eq!(coalescer.len(), 1);

		coalescer.release(&first);

		assert!(coalescer.contains(&users()), "Stale ticket must not remove the successor.");

		coalescer.release(&second);

		assert!(coalescer.is_empty());
	}

	#[tokio::test]
	async fn removed_record_never_reports_cancellation() {
		let coalescer = RequestCoalescer::default();
		let (_ticket, signal) = coalescer.add_pending(users());

		coalescer.remove_pending(&users());
		coalescer.remove_pending(&users());

		let outcome = time::timeout(TokioDuration::from_millis(20), signal.cancelled()).await;

		assert!(outcome.is_err(), "Dropped handles should leave the signal pending.");
	}

	#[tokio::test]
	async fn cancel_all_fires_every_signal_and_clears_table() {
		let coalescer = RequestCoalescer::default();
		let (_a, signal_a) = coalescer.add_pending(users());
		let (_b, signal_b) =
			coalescer.add_pending(Fingerprint::from_parts("GET", "/orders", "null", "null"));

		coalescer.cancel_all_pending();

		assert!(coalescer.is_empty());
		assert_eq!(signal_a.cancelled().await, CancelReason::CancelledAll);
		assert_eq!(signal_b.cancelled().await, CancelReason::CancelledAll);
	}
}
