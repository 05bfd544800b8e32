//! Transport primitives the orchestrator dispatches through.
//!
//! [`HttpTransport`] is the broker's only dependency on an HTTP stack. It owns socket I/O,
//! header serialization, and timeout enforcement; everything above it (auth, coalescing,
//! refresh, retry) lives in [`crate::client`]. The default [`ReqwestTransport`] is enabled by the
//! `reqwest` feature; tests and embedders can supply their own implementation.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute one fully-built request.
///
/// Implementations must enforce [`TransportRequest::timeout`] and report its expiry as
/// [`TransportError::Timeout`]. Non-2xx answers are successful transport calls; status handling
/// belongs to the orchestrator.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response body.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// HTTP methods the broker issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
	/// `PATCH`
	Patch,
}
impl Method {
	/// Upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
			Method::Patch => "PATCH",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request payload handed to the transport.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document, sent with the JSON content type.
	Json(Value),
	/// `multipart/form-data` parts; the transport picks the boundary.
	Multipart(Vec<FormPart>),
}
impl RequestBody {
	/// Stable textual form used when fingerprinting requests.
	pub fn fingerprint_repr(&self) -> String {
		match self {
			RequestBody::Empty => "null".into(),
			RequestBody::Json(value) => value.to_string(),
			RequestBody::Multipart(parts) => parts
				.iter()
				.map(|part| match &part.value {
					FormValue::Text(text) => format!("{}={text}", part.name),
					FormValue::File { filename, bytes, .. } => format!(
						"{}=@{filename}:{}",
						part.name,
						STANDARD_NO_PAD.encode(Sha256::digest(bytes))
					),
				})
				.collect::<Vec<_>>()
				.join(";"),
		}
	}
}

/// Single named field inside a multipart body.
#[derive(Clone, Debug, PartialEq)]
pub struct FormPart {
	/// Form field name.
	pub name: String,
	/// Field value.
	pub value: FormValue,
}
impl FormPart {
	/// Builds a plain-text field.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: FormValue::Text(value.into()) }
	}

	/// Builds a file field.
	pub fn file(name: impl Into<String>, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self {
			name: name.into(),
			value: FormValue::File { filename: filename.into(), bytes, content_type: None },
		}
	}
}

/// Multipart field value.
#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
	/// Text field.
	Text(String),
	/// File attachment.
	File {
		/// Filename reported to the server.
		filename: String,
		/// File contents.
		bytes: Vec<u8>,
		/// Optional MIME type.
		content_type: Option<String>,
	},
}

/// Fully-resolved request: absolute URL, final headers, and timeout.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(String, String)>,
	/// Payload.
	pub body: RequestBody,
	/// Per-request timeout the transport must enforce.
	pub timeout: Duration,
}
impl TransportRequest {
	/// Returns the first header value matching `name` case-insensitively.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the first query parameter named `name`.
	pub fn query(&self, name: &str) -> Option<String> {
		self.url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
	}
}

/// Buffered response returned by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: Vec<(String, String)>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Builds a response with a JSON body.
	pub fn json(status: u16, body: &Value) -> Self {
		Self {
			status,
			headers: vec![("content-type".into(), "application/json".into())],
			body: body.to_string().into_bytes(),
		}
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Lossy UTF-8 view of the body.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestTransport::new`] enables a cookie store so requests are sent with credentials.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a cookie-aware reqwest client.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn build(&self, request: TransportRequest) -> Result<reqwest::Request, TransportError> {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
			Method::Patch => reqwest::Method::PATCH,
		};
		let mut builder = self.0.request(method, request.url).timeout(request.timeout);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}

		builder = match request.body {
			RequestBody::Empty => builder,
			RequestBody::Json(value) => builder.body(value.to_string()),
			RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
		};

		builder.build().map_err(TransportError::request)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = self.build(request)?;
			let response = self.0.execute(request).await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(parts: Vec<FormPart>) -> Result<reqwest::multipart::Form, TransportError> {
	use reqwest::multipart::{Form, Part};

	let mut form = Form::new();

	for FormPart { name, value } in parts {
		form = match value {
			FormValue::Text(text) => form.text(name, text),
			FormValue::File { filename, bytes, content_type } => {
				let mut part = Part::bytes(bytes).file_name(filename);

				if let Some(mime) = content_type {
					part = part.mime_str(&mime).map_err(TransportError::request)?;
				}

				form.part(name, part)
			},
		};
	}

	Ok(form)
}
