//! Request orchestrator: the single entry point every API call flows through.
//!
//! A dispatch runs these phases in order:
//!
//! 1. Register with the [`RequestCoalescer`], cancelling an identical in-flight request.
//! 2. Raise the loading indicator when [`RequestOptions::show_loading`] is set.
//! 3. Stamp GET requests with `_t`, attach the bearer token, and resolve the URL.
//! 4. Race the transport call against the request's cancellation signal.
//! 5. On 2xx, unwrap the [`ApiResponse`] envelope and reject business failures.
//! 6. On 401, refresh the credentials once (single-flight) and resubmit. A resubmitted request
//!    that is rejected with 401 again fails instead of refreshing a second time.
//! 7. On network failures or 5xx, wait [`ClientConfig::retry_delay`] and resubmit while retries
//!    remain.
//! 8. Otherwise classify and log the failure and hand the original error back.

mod classify;
mod options;
mod refresh;
mod request;
mod transfer;

pub use classify::ErrorCategory;
pub use options::RequestOptions;
pub use request::{CACHE_BUST_PARAM, JSON_CONTENT_TYPE};
pub use transfer::{
	DEFAULT_DOWNLOAD_NAME, DEFAULT_UPLOAD_FIELD, DirectorySink, DownloadSink, UploadPayload,
};

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenStore},
	coalesce::RequestCoalescer,
	config::ClientConfig,
	envelope::ApiResponse,
	error::ConfigError,
	http::{HttpTransport, Method, RequestBody, TransportRequest, TransportResponse},
	loading::{LoadingIndicator, LoadingTracker},
	obs::{self, RequestOutcome, RequestSpan},
	session::{LogRedirect, LoginRedirect},
	store::KeyValueStorage,
};
use refresh::RefreshGate;
use request::{ApiRequest, CacheBuster, Payload, ResponseKind};

type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Payload>> + 'a + Send>>;

/// [`RequestClient`] specialized to the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestRequestClient = RequestClient<ReqwestTransport>;

/// Envelope-aware HTTP client with auth injection, refresh, coalescing, and retries.
///
/// Cloning is cheap; clones share the transport, credentials, pending table, refresh gate, and
/// loading counter.
pub struct RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	config: Arc<ClientConfig>,
	tokens: TokenStore,
	loading: Arc<LoadingTracker>,
	coalescer: Arc<RequestCoalescer>,
	refresh: Arc<RefreshGate>,
	redirect: Arc<dyn LoginRedirect>,
	downloads: Arc<dyn DownloadSink>,
	cache_buster: Arc<CacheBuster>,
}
#[cfg(feature = "reqwest")]
impl RequestClient<ReqwestTransport> {
	/// Builds a client over a cookie-aware reqwest transport.
	pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
		let transport = ReqwestTransport::new()?;

		Ok(Self::with_transport(config, storage, transport))
	}

	/// Resolves [`ClientConfig`] from the environment and builds a reqwest-backed client.
	pub fn from_env(storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
		Self::new(ClientConfig::from_env()?, storage)
	}
}
impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a client over a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		storage: Arc<dyn KeyValueStorage>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		tracing::info!(
			version = env!("CARGO_PKG_VERSION"),
			deploy_target = config.target.as_str(),
			base_url = %config.base_url,
			"Request client initialized."
		);

		let downloads = Arc::new(DirectorySink::new(config.download_dir.clone()));

		Self {
			transport: transport.into(),
			config: Arc::new(config),
			tokens: TokenStore::new(storage),
			loading: Arc::new(LoadingTracker::default()),
			coalescer: Arc::new(RequestCoalescer::default()),
			refresh: Arc::new(RefreshGate::default()),
			redirect: Arc::new(LogRedirect),
			downloads,
			cache_buster: Arc::new(CacheBuster::default()),
		}
	}

	/// Drives `indicator` from the loading counter.
	pub fn with_loading_indicator(mut self, indicator: Arc<dyn LoadingIndicator>) -> Self {
		self.loading = Arc::new(LoadingTracker::new(indicator));

		self
	}

	/// Routes auth-error navigation through `redirect`.
	pub fn with_login_redirect(mut self, redirect: Arc<dyn LoginRedirect>) -> Self {
		self.redirect = redirect;

		self
	}

	/// Saves downloads through `sink` instead of the configured directory.
	pub fn with_download_sink(mut self, sink: Arc<dyn DownloadSink>) -> Self {
		self.downloads = sink;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Credential store backing bearer injection and refresh.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Loading counter shared by every request of this client.
	pub fn loading(&self) -> &LoadingTracker {
		&self.loading
	}

	/// Table of in-flight requests.
	pub fn coalescer(&self) -> &RequestCoalescer {
		&self.coalescer
	}

	/// Returns true while a token refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.refresh.is_refreshing()
	}

	/// Issues a GET request.
	pub async fn get<R>(&self, path: &str, options: RequestOptions) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		self.request(ApiRequest::new(Method::Get, path, RequestBody::Empty, options)).await
	}

	/// Issues a POST request with a JSON body.
	pub async fn post<B, R>(
		&self,
		path: &str,
		body: &B,
		options: RequestOptions,
	) -> Result<ApiResponse<R>>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::new(Method::Post, path, json_body(body)?, options)).await
	}

	/// Issues a PUT request with a JSON body.
	pub async fn put<B, R>(
		&self,
		path: &str,
		body: &B,
		options: RequestOptions,
	) -> Result<ApiResponse<R>>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::new(Method::Put, path, json_body(body)?, options)).await
	}

	/// Issues a DELETE request.
	pub async fn delete<R>(&self, path: &str, options: RequestOptions) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		self.request(ApiRequest::new(Method::Delete, path, RequestBody::Empty, options)).await
	}

	/// Issues a PATCH request with a JSON body.
	pub async fn patch<B, R>(
		&self,
		path: &str,
		body: &B,
		options: RequestOptions,
	) -> Result<ApiResponse<R>>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		self.request(ApiRequest::new(Method::Patch, path, json_body(body)?, options)).await
	}

	/// Cancels every in-flight request; each rejects with [`Error::Cancelled`].
	pub fn cancel_all_requests(&self) {
		self.coalescer.cancel_all_pending();
	}

	/// Stores a new access token.
	pub fn set_token(&self, token: &str) -> Result<()> {
		Ok(self.tokens.set_token(token)?)
	}

	/// Stores a new refresh token.
	pub fn set_refresh_token(&self, token: &str) -> Result<()> {
		Ok(self.tokens.set_refresh_token(token)?)
	}

	/// Reads the stored access token.
	pub fn token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.tokens.token()?)
	}

	/// Removes both stored tokens.
	pub fn clear_token(&self) -> Result<()> {
		Ok(self.tokens.clear()?)
	}

	/// Cancels in-flight requests and hides the loading indicator.
	pub fn shutdown(&self) {
		tracing::info!(pending = self.coalescer.len(), "Request client shutting down.");

		self.coalescer.cancel_all_pending();
		self.loading.clear();
	}

	async fn request<R>(&self, request: ApiRequest) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		self.dispatch(request).await?.into_envelope()?.into_typed()
	}

	/// Runs one attempt of `request` and any recovery it triggers.
	pub(crate) fn dispatch(&self, request: ApiRequest) -> DispatchFuture<'_> {
		Box::pin(async move {
			let span = RequestSpan::new(request.method, &request.path);

			span.instrument(self.execute(request)).await
		})
	}

	async fn execute(&self, request: ApiRequest) -> Result<Payload> {
		let method = request.method;

		obs::record_request_outcome(method, RequestOutcome::Attempt);

		let (ticket, signal) = self.coalescer.add_pending(request.fingerprint());
		let shows_loading = request.options.show_loading;

		if shows_loading {
			self.loading.show(request.options.loading_text.as_deref());
		}

		let settle = || {
			self.coalescer.release(&ticket);

			if shows_loading {
				self.loading.hide();
			}
		};
		let outgoing = match self.prepare(&request) {
			Ok(outgoing) => outgoing,
			Err(e) => {
				settle();
				obs::record_request_outcome(method, RequestOutcome::Failure);

				return Err(e);
			},
		};
		let sent = tokio::select! {
			biased;
			reason = signal.cancelled() => Err(Error::Cancelled(reason)),
			response = self.transport.send(outgoing) => response.map_err(Error::from),
		};

		settle();

		let result = match sent {
			Ok(response) if response.is_success() => self.accept(&request, response),
			Ok(response) =>
				self.recover(request, Error::Status { status: response.status, body: response.text() })
					.await,
			Err(e) => self.recover(request, e).await,
		};
		let outcome = match &result {
			Ok(_) => RequestOutcome::Success,
			Err(e) if e.is_cancelled() => RequestOutcome::Cancelled,
			Err(_) => RequestOutcome::Failure,
		};

		obs::record_request_outcome(method, outcome);

		result
	}

	fn prepare(&self, request: &ApiRequest) -> Result<TransportRequest> {
		let token = if request.options.skip_auth { None } else { self.tokens.token()? };
		let stamp = (request.method == Method::Get).then(|| self.cache_buster.next());

		request.to_transport(&self.config, token.as_ref(), stamp)
	}

	fn accept(&self, request: &ApiRequest, response: TransportResponse) -> Result<Payload> {
		match request.response {
			ResponseKind::Raw => Ok(Payload::Raw(response.body)),
			ResponseKind::Envelope => {
				let envelope = ApiResponse::from_slice(&response.body, Some(response.status))?;

				if envelope.is_success() {
					return Ok(Payload::Envelope { envelope, body: response.body });
				}

				self.report_business_failure(&envelope);

				Err(Error::Business {
					code: envelope.code,
					message: envelope.failure_message().to_owned(),
				})
			},
		}
	}

	async fn recover(&self, mut request: ApiRequest, error: Error) -> Result<Payload> {
		if error.is_cancelled() {
			tracing::debug!(reason = %error, "Request cancelled.");

			return Err(error);
		}
		if error.status() == Some(401) && !request.options.skip_auth {
			if !request.resubmitted_after_refresh {
				return self.refresh_and_resubmit(request).await;
			}

			tracing::warn!("Request was rejected again after a token refresh.");
		}
		if request.options.retry_times > 0 && error.is_transient() {
			request.options.retry_times -= 1;

			tracing::info!(
				remaining = request.options.retry_times,
				delay_ms = self.config.retry_delay.as_millis() as u64,
				error = %error,
				"Retrying request."
			);
			obs::record_request_outcome(request.method, RequestOutcome::Retry);
			tokio::time::sleep(self.config.retry_delay).await;

			return self.dispatch(request).await;
		}
		if !request.options.skip_error_handler {
			self.report(&error);
		}

		Err(error)
	}
}
impl<T> Clone for RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			tokens: self.tokens.clone(),
			loading: self.loading.clone(),
			coalescer: self.coalescer.clone(),
			refresh: self.refresh.clone(),
			redirect: self.redirect.clone(),
			downloads: self.downloads.clone(),
			cache_buster: self.cache_buster.clone(),
		}
	}
}
impl<T> Debug for RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("pending", &self.coalescer.len())
			.field("loading", &self.loading.count())
			.finish()
	}
}

fn json_body<B>(body: &B) -> Result<RequestBody>
where
	B: ?Sized + Serialize,
{
	serde_json::to_value(body).map(RequestBody::Json).map_err(|e| ConfigError::Body(e).into())
}
