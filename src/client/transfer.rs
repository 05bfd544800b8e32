//! Multipart uploads and binary downloads.

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	client::{RequestClient, RequestOptions, request::ApiRequest},
	envelope::ApiResponse,
	http::{FormPart, FormValue, HttpTransport, Method, RequestBody},
	store::{StoreError, file},
};

/// Form field used by [`UploadPayload::file`].
pub const DEFAULT_UPLOAD_FIELD: &str = "file";
/// Filename used when a download is saved without one.
pub const DEFAULT_DOWNLOAD_NAME: &str = "download";

/// Body of an upload request.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadPayload {
	/// Single file wrapped into a one-field form.
	File {
		/// Form field name.
		field: String,
		/// Filename reported to the server.
		filename: String,
		/// File contents.
		bytes: Vec<u8>,
		/// Optional MIME type.
		content_type: Option<String>,
	},
	/// Pre-built form sent as-is.
	Form(Vec<FormPart>),
}
impl UploadPayload {
	/// Wraps a file under the `file` field.
	pub fn file(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self::File {
			field: DEFAULT_UPLOAD_FIELD.into(),
			filename: filename.into(),
			bytes,
			content_type: None,
		}
	}

	/// Sets the MIME type of a file payload; forms are left untouched.
	pub fn with_content_type(mut self, mime: impl Into<String>) -> Self {
		if let Self::File { content_type, .. } = &mut self {
			*content_type = Some(mime.into());
		}

		self
	}

	fn into_parts(self) -> Vec<FormPart> {
		match self {
			Self::File { field, filename, bytes, content_type } =>
				vec![FormPart { name: field, value: FormValue::File { filename, bytes, content_type } }],
			Self::Form(parts) => parts,
		}
	}
}
impl From<Vec<FormPart>> for UploadPayload {
	fn from(parts: Vec<FormPart>) -> Self {
		Self::Form(parts)
	}
}

/// Destination for downloaded bytes.
pub trait DownloadSink
where
	Self: Send + Sync,
{
	/// Saves `bytes` under `filename` and returns where they landed.
	fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StoreError>;
}

/// Writes downloads into a directory, replacing existing files atomically.
#[derive(Clone, Debug)]
pub struct DirectorySink {
	dir: PathBuf,
}
impl DirectorySink {
	/// Targets `dir`; it is created on first save.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Directory downloads are written to.
	pub fn dir(&self) -> &Path {
		&self.dir
	}
}
impl DownloadSink for DirectorySink {
	fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
		fs::create_dir_all(&self.dir).map_err(|e| StoreError::Backend {
			message: format!("Failed to create download directory {}: {e}", self.dir.display()),
		})?;

		let target = self.dir.join(file_name(filename));

		file::write_atomically(&target, bytes)?;

		Ok(target)
	}
}

// Only the final component is kept so a name cannot escape the sink directory.
fn file_name(filename: &str) -> &str {
	Path::new(filename)
		.file_name()
		.and_then(|name| name.to_str())
		.filter(|name| !name.is_empty())
		.unwrap_or(DEFAULT_DOWNLOAD_NAME)
}

impl<T> RequestClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Posts `payload` as `multipart/form-data` using the upload timeout.
	pub async fn upload<R>(
		&self,
		path: &str,
		payload: UploadPayload,
		options: RequestOptions,
	) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		let options = options.with_timeout(self.config.upload_timeout);
		let body = RequestBody::Multipart(payload.into_parts());

		self.request(ApiRequest::new(Method::Post, path, body, options)).await
	}

	/// Fetches `path` as raw bytes and hands them to the download sink.
	///
	/// The body bypasses envelope unwrapping. Returns the saved location.
	pub async fn download(
		&self,
		path: &str,
		filename: Option<&str>,
		options: RequestOptions,
	) -> Result<PathBuf> {
		let request = ApiRequest::new(Method::Get, path, RequestBody::Empty, options).raw();
		let bytes = self.dispatch(request).await?.into_bytes();
		let saved = self.downloads.save(filename.unwrap_or(DEFAULT_DOWNLOAD_NAME), &bytes)?;

		tracing::info!(location = %saved.display(), size = bytes.len(), "Download saved.");

		Ok(saved)
	}
}
