//! Single-flight token refresh with a FIFO queue of waiting requests.
//!
//! The first request to observe a 401 becomes the leader and performs the exchange. Requests
//! that observe a 401 while the exchange is in flight park on the gate and are released, in the
//! order they arrived, with the leader's outcome.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{
		RequestClient, RequestOptions,
		request::{ApiRequest, Payload},
	},
	envelope::ApiResponse,
	http::{HttpTransport, Method, RequestBody},
	obs::{self, RequestOutcome},
};

const ABANDONED: &str = "Token refresh was abandoned before it settled.";

type Waiter = oneshot::Sender<Result<(), String>>;

#[derive(Debug, Default)]
struct RefreshState {
	refreshing: bool,
	queue: VecDeque<Waiter>,
}

/// Serializes refresh attempts; at most one is in flight per client.
#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
	state: Mutex<RefreshState>,
}
impl RefreshGate {
	/// Claims the refresh if none is running, otherwise enqueues the caller.
	pub(crate) fn enter(&self) -> RefreshTurn<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (tx, rx) = oneshot::channel();

			state.queue.push_back(tx);

			RefreshTurn::Follower(rx)
		} else {
			state.refreshing = true;

			RefreshTurn::Leader(RefreshLease { gate: self, settled: false })
		}
	}

	pub(crate) fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	#[cfg(test)]
	fn queued(&self) -> usize {
		self.state.lock().queue.len()
	}

	fn finish(&self, outcome: Result<(), String>) {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			mem::take(&mut state.queue)
		};

		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}
	}
}

pub(crate) enum RefreshTurn<'a> {
	Leader(RefreshLease<'a>),
	Follower(oneshot::Receiver<Result<(), String>>),
}

/// Leader's claim on the gate; dropping it unsettled fails every queued request.
pub(crate) struct RefreshLease<'a> {
	gate: &'a RefreshGate,
	settled: bool,
}
impl RefreshLease<'_> {
	pub(crate) fn settle(mut self, outcome: Result<(), String>) {
		self.settled = true;
		self.gate.finish(outcome);
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.gate.finish(Err(ABANDONED.into()));
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshGrant {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefreshBody {
	Bare(RefreshGrant),
	Enveloped(ApiResponse<Option<RefreshGrant>>),
}

fn parse_grant(bytes: &[u8]) -> Result<RefreshGrant, String> {
	match serde_json::from_slice::<RefreshBody>(bytes) {
		Ok(RefreshBody::Bare(grant)) => Ok(grant),
		Ok(RefreshBody::Enveloped(envelope)) if envelope.is_success() => envelope
			.data
			.ok_or_else(|| "Refresh response carried no credentials.".to_owned()),
		Ok(RefreshBody::Enveloped(envelope)) => Err(envelope.failure_message().to_owned()),
		Err(e) => Err(format!("Refresh response could not be decoded: {e}.")),
	}
}

impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Refreshes the credentials (or waits for the in-flight refresh) and resubmits `request`.
	///
	/// The resubmitted request is marked so a second 401 rejects instead of refreshing again.
	pub(crate) async fn refresh_and_resubmit(&self, mut request: ApiRequest) -> Result<Payload> {
		obs::record_request_outcome(request.method, RequestOutcome::Refresh);

		request.resubmitted_after_refresh = true;

		match self.refresh.enter() {
			RefreshTurn::Follower(waiter) => {
				tracing::debug!("Token refresh in flight; queueing request.");

				match waiter.await {
					Ok(Ok(())) => self.dispatch(request).await,
					Ok(Err(reason)) => Err(Error::RefreshFailed { reason }),
					Err(_) => Err(Error::RefreshFailed { reason: ABANDONED.into() }),
				}
			},
			RefreshTurn::Leader(lease) => match self.exchange_refresh_token().await {
				Ok(()) => {
					tracing::info!("Access token refreshed.");
					lease.settle(Ok(()));

					self.dispatch(request).await
				},
				Err(reason) => {
					tracing::warn!(reason = reason.as_str(), "Token refresh failed.");
					lease.settle(Err(reason.clone()));

					if let Err(e) = self.tokens.clear() {
						tracing::error!(error = %e, "Failed to clear stored credentials.");
					}

					self.handle_auth_error();

					Err(Error::RefreshFailed { reason })
				},
			},
		}
	}

	async fn exchange_refresh_token(&self) -> Result<(), String> {
		let refresh_token = self
			.tokens
			.refresh_token()
			.map_err(|e| e.to_string())?
			.ok_or_else(|| "No refresh token is stored.".to_owned())?;
		let body = serde_json::json!({ "refreshToken": refresh_token.expose() });
		let request = ApiRequest::new(
			Method::Post,
			self.config.refresh_path.as_str(),
			RequestBody::Json(body),
			RequestOptions::default().skip_auth().skip_error_handler(),
		)
		.raw();
		let bytes = self.dispatch(request).await.map_err(|e| e.to_string())?.into_bytes();
		let grant = parse_grant(&bytes)?;

		self.tokens.set_token(grant.access_token.expose()).map_err(|e| e.to_string())?;

		if let Some(refresh_token) = grant.refresh_token {
			self.tokens.set_refresh_token(refresh_token.expose()).map_err(|e| e.to_string())?;
		}

		Ok(())
	}
}
