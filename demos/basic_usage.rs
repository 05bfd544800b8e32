//! Demonstrates the default reqwest-backed client: bearer injection, envelope unwrapping, and a
//! transparent token refresh after the access token expires.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
// self
use request_broker::{RequestClient, RequestOptions, config::ClientConfig, store::MemoryStorage};

#[derive(Debug, Deserialize)]
struct Profile {
	id: u64,
	name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer expired-access");
			then.status(401).body("token expired");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":200,\"data\":{\"accessToken\":\"demo-access\",\"refreshToken\":\"demo-refresh\"}}",
			);
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/profile").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"code\":200,\"data\":{\"id\":42,\"name\":\"Ada\"},\"message\":\"ok\"}");
		})
		.await;
	let config = ClientConfig::parse(&server.url("/api"))?;
	let client = RequestClient::new(config, Arc::new(MemoryStorage::default()))?;

	client.set_token("expired-access")?;
	client.set_refresh_token("bootstrap-refresh")?;

	let response = client
		.get::<Profile>("/profile", RequestOptions::default().with_loading_text("Fetching profile"))
		.await?;

	println!("Profile {} belongs to {}.", response.data.id, response.data.name);

	expired.assert_async().await;
	refresh.assert_async().await;
	profile.assert_async().await;

	Ok(())
}
