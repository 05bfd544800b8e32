mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::{Value, json};
// self
use common::*;
use request_broker::{
	Error, RequestOptions,
	client::CACHE_BUST_PARAM,
	coalesce::CancelReason,
	error::TransportError,
	http::TransportResponse,
};

async fn wait_for_calls(transport: &MockTransport, count: usize) {
	while transport.call_count() < count {
		tokio::task::yield_now().await;
	}
}

#[tokio::test]
async fn get_requests_carry_distinct_cache_busters() {
	let transport = MockTransport::new(|_, _| ready(envelope(json!([]))));
	let (client, _, _) = mock_client(transport.clone());

	client.set_token("token-1").expect("Token should be stored.");

	for _ in 0..2 {
		client
			.get::<Value>("/users", RequestOptions::default())
			.await
			.expect("GET should succeed.");
	}

	client
		.post::<_, Value>("/users", &json!({ "name": "Ada" }), RequestOptions::default())
		.await
		.expect("POST should succeed.");

	let calls = transport.calls();
	let first = calls[0].query(CACHE_BUST_PARAM).expect("First GET should be stamped.");
	let second = calls[1].query(CACHE_BUST_PARAM).expect("Second GET should be stamped.");

	assert_ne!(first, second);
	assert_eq!(calls[2].query(CACHE_BUST_PARAM), None);
	assert!(calls.iter().all(|call| call.header("authorization") == Some("Bearer token-1")));
	assert_eq!(calls[2].header("content-type"), Some("application/json;charset=utf-8"));
}

#[tokio::test]
async fn skip_auth_omits_bearer() {
	let transport = MockTransport::new(|_, _| ready(envelope(Value::Null)));
	let (client, _, _) = mock_client(transport.clone());

	client.set_token("token-1").expect("Token should be stored.");
	client
		.get::<Value>("/public", RequestOptions::default().skip_auth())
		.await
		.expect("GET should succeed.");

	assert_eq!(transport.calls()[0].header("authorization"), None);
}

#[tokio::test]
async fn loading_indicator_tracks_only_requests_that_show_it() {
	let indicator = RecordingIndicator::default();
	let transport = MockTransport::new(|_, _| ready(envelope(Value::Null)));
	let (client, _, _) = mock_client(transport);
	let client = client.with_loading_indicator(Arc::new(indicator.clone()));

	client
		.get::<Value>("/a", RequestOptions::default().with_loading_text("Saving..."))
		.await
		.expect("GET should succeed.");
	client
		.get::<Value>("/b", RequestOptions::default().with_loading(false))
		.await
		.expect("Silent GET should succeed.");

	assert_eq!(indicator.events(), vec!["show:Saving...".to_owned(), "hide".to_owned()]);
	assert_eq!(client.loading().count(), 0);
}

#[tokio::test]
async fn duplicate_request_supersedes_in_flight_one() {
	let transport = MockTransport::new(|index, _| {
		if index == 0 { never() } else { ready(envelope(json!({ "id": 1 }))) }
	});
	let (client, _, _) = mock_client(transport.clone());
	let first = tokio::spawn({
		let client = client.clone();

		async move { client.get::<Value>("/users", RequestOptions::default()).await }
	});

	wait_for_calls(&transport, 1).await;

	let second = client
		.get::<Value>("/users", RequestOptions::default())
		.await
		.expect("Latest duplicate should complete.");
	let first = first.await.expect("First request task should join.");

	assert_eq!(second.data, json!({ "id": 1 }));
	assert!(matches!(first, Err(Error::Cancelled(CancelReason::Superseded))));
	assert!(client.coalescer().is_empty());
	assert_eq!(client.loading().count(), 0);
}

#[tokio::test]
async fn cancel_all_rejects_every_pending_request() {
	let transport = MockTransport::new(|_, _| never());
	let (client, _, _) = mock_client(transport.clone());
	let tasks: Vec<_> = ["/a", "/b"]
		.into_iter()
		.map(|path| {
			let client = client.clone();

			tokio::spawn(async move { client.get::<Value>(path, RequestOptions::default()).await })
		})
		.collect();

	wait_for_calls(&transport, 2).await;

	assert_eq!(client.coalescer().len(), 2);

	client.cancel_all_requests();

	for task in tasks {
		let result = task.await.expect("Request task should join.");

		assert!(matches!(result, Err(Error::Cancelled(CancelReason::CancelledAll))));
	}

	assert!(client.coalescer().is_empty());
	assert_eq!(client.loading().count(), 0);
}

#[tokio::test]
async fn business_unauthorized_clears_credentials_and_redirects() {
	let transport = MockTransport::new(|_, _| {
		ready(TransportResponse::json(200, &json!({ "code": 401, "message": "Session expired." })))
	});
	let (client, _, redirect) = mock_client(transport.clone());

	client.set_token("stale").expect("Token should be stored.");
	client.set_refresh_token("refresh").expect("Refresh token should be stored.");

	let err = client
		.get::<Value>("/profile", RequestOptions::default())
		.await
		.expect_err("Business 401 should reject.");

	assert!(matches!(&err, Error::Business { code: 401, message } if message == "Session expired."));
	assert_eq!(client.token().expect("Token read should succeed."), None);
	assert_eq!(client.tokens().refresh_token().expect("Refresh token read should succeed."), None);
	assert_eq!(redirect.paths(), vec!["/login".to_owned()]);
	assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn malformed_envelope_is_a_decode_error() {
	let transport = MockTransport::new(|_, _| {
		ready(TransportResponse { status: 200, headers: Vec::new(), body: b"<html>".to_vec() })
	});
	let (client, _, _) = mock_client(transport);
	let err = client
		.get::<Value>("/broken", RequestOptions::default())
		.await
		.expect_err("Non-JSON body should reject.");

	assert!(matches!(err, Error::Decode { status: Some(200), .. }));
}

#[tokio::test]
async fn transport_failure_surfaces_original_error() {
	let transport = MockTransport::new(|_, _| fail(TransportError::Timeout));
	let (client, _, redirect) = mock_client(transport);
	let err = client
		.get::<Value>("/slow", RequestOptions::default())
		.await
		.expect_err("Timeout should reject.");

	assert!(matches!(err, Error::Transport(TransportError::Timeout)));
	assert!(redirect.paths().is_empty());
}

#[tokio::test]
async fn shutdown_cancels_pending_and_hides_loading() {
	let indicator = RecordingIndicator::default();
	let transport = MockTransport::new(|_, _| never());
	let (client, _, _) = mock_client(transport.clone());
	let client = client.with_loading_indicator(Arc::new(indicator.clone()));
	let task = tokio::spawn({
		let client = client.clone();

		async move { client.get::<Value>("/stream", RequestOptions::default()).await }
	});

	wait_for_calls(&transport, 1).await;

	assert!(client.loading().is_visible());

	client.shutdown();

	let result = task.await.expect("Request task should join.");

	assert!(matches!(result, Err(Error::Cancelled(CancelReason::CancelledAll))));
	assert!(!client.loading().is_visible());
	assert_eq!(indicator.shown(), 1);
}
