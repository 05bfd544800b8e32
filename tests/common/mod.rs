#![allow(dead_code)]

// std
use std::{
	future,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
// self
use request_broker::{
	RequestClient,
	config::ClientConfig,
	error::TransportError,
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	loading::LoadingIndicator,
	session::RecordingRedirect,
	store::MemoryStorage,
};

pub const BASE_URL: &str = "https://api.example.com/api";

type Handler = dyn Fn(usize, TransportRequest) -> TransportFuture<'static> + Send + Sync;

/// Transport that records every request and answers through a per-call handler.
#[derive(Clone)]
pub struct MockTransport {
	calls: Arc<Mutex<Vec<TransportRequest>>>,
	handler: Arc<Handler>,
}
impl MockTransport {
	pub fn new<F>(handler: F) -> Self
	where
		F: 'static + Fn(usize, TransportRequest) -> TransportFuture<'static> + Send + Sync,
	{
		Self { calls: Arc::default(), handler: Arc::new(handler) }
	}

	pub fn calls(&self) -> Vec<TransportRequest> {
		self.calls.lock().clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().len()
	}
}
impl HttpTransport for MockTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let index = {
			let mut calls = self.calls.lock();

			calls.push(request.clone());

			calls.len() - 1
		};

		(self.handler)(index, request)
	}
}

/// Indicator recording `show:<label>` / `hide` transitions.
#[derive(Clone, Debug, Default)]
pub struct RecordingIndicator {
	events: Arc<Mutex<Vec<String>>>,
	shown: Arc<AtomicUsize>,
}
impl RecordingIndicator {
	pub fn events(&self) -> Vec<String> {
		self.events.lock().clone()
	}

	pub fn shown(&self) -> usize {
		self.shown.load(Ordering::SeqCst)
	}
}
impl LoadingIndicator for RecordingIndicator {
	fn show(&self, label: &str) {
		self.shown.fetch_add(1, Ordering::SeqCst);
		self.events.lock().push(format!("show:{label}"));
	}

	fn hide(&self) {
		self.events.lock().push("hide".into());
	}
}

pub fn ready(response: TransportResponse) -> TransportFuture<'static> {
	Box::pin(future::ready(Ok(response)))
}

pub fn delayed(delay: Duration, response: TransportResponse) -> TransportFuture<'static> {
	Box::pin(async move {
		tokio::time::sleep(delay).await;

		Ok(response)
	})
}

pub fn fail(error: TransportError) -> TransportFuture<'static> {
	Box::pin(future::ready(Err(error)))
}

pub fn never() -> TransportFuture<'static> {
	Box::pin(future::pending())
}

pub fn envelope(data: Value) -> TransportResponse {
	TransportResponse::json(200, &serde_json::json!({ "code": 200, "data": data, "message": "ok" }))
}

pub fn status(code: u16) -> TransportResponse {
	TransportResponse::json(code, &serde_json::json!({ "message": "upstream failure" }))
}

pub fn test_config(base_url: &str) -> ClientConfig {
	ClientConfig::parse(base_url)
		.expect("Test base URL should parse.")
		.with_retry_delay(Duration::from_secs(1))
}

/// Builds a client over `transport` with in-memory credentials and a recording redirect.
pub fn mock_client(
	transport: MockTransport,
) -> (RequestClient<MockTransport>, MemoryStorage, RecordingRedirect) {
	let storage = MemoryStorage::default();
	let redirect = RecordingRedirect::default();
	let client = RequestClient::<MockTransport>::with_transport(
		test_config(BASE_URL),
		Arc::new(storage.clone()),
		transport,
	)
	.with_login_redirect(Arc::new(redirect.clone()));

	(client, storage, redirect)
}
