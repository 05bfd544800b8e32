//! Demonstrates plugging an in-process [`HttpTransport`] into the client.
//!
//! 1. Implement [`HttpTransport::send`] and return a boxed future.
//! 2. Hand the transport to [`RequestClient::with_transport`].
//! 3. Observe retries on a flaky upstream and the classification of a permanent failure.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use serde_json::{Value, json};
// self
use request_broker::{
	RequestClient, RequestOptions,
	client::ErrorCategory,
	config::ClientConfig,
	error::TransportError,
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	store::MemoryStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::parse("https://api.example.com/api")?
		.with_retry_delay(std::time::Duration::from_millis(50));
	let client = <RequestClient<FlakyTransport>>::with_transport(
		config,
		Arc::new(MemoryStorage::default()),
		FlakyTransport::default(),
	);
	let response = client
		.get::<Value>("/status", RequestOptions::default().with_retry_times(2))
		.await?;

	println!("Upstream recovered after retries: {}.", response.data);

	match client.get::<Value>("/missing", RequestOptions::default()).await {
		Ok(_) => println!("Missing resource unexpectedly resolved."),
		Err(e) => println!("{}: {e}", ErrorCategory::classify(&e)),
	}

	Ok(())
}

/// Fails the first two `/status` calls with 503 and answers 404 for anything else.
#[derive(Default)]
struct FlakyTransport {
	attempts: AtomicUsize,
}
impl HttpTransport for FlakyTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			let response = match request.url.path() {
				"/api/status" if attempt < 2 =>
					TransportResponse::json(503, &json!({ "message": "warming up" })),
				"/api/status" => TransportResponse::json(
					200,
					&json!({ "code": 200, "data": { "healthy": true }, "message": "ok" }),
				),
				_ => TransportResponse::json(404, &json!({ "message": "not found" })),
			};

			Ok::<_, TransportError>(response)
		})
	}
}
