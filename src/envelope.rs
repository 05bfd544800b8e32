//! Uniform JSON response envelope `{ code, data, message, success }`.

// self
use crate::_prelude::*;

/// Envelope code that marks success.
pub const SUCCESS_CODE: i64 = 200;
/// Message used when a failing envelope carries none.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Request failed.";

/// Wrapper every backend JSON response uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ApiResponse<T = Value> {
	/// Business status code; `200` means success. Absent codes decode as `0`.
	#[serde(default)]
	pub code: i64,
	/// Payload, `null`/default when absent.
	#[serde(default)]
	pub data: T,
	/// Human-readable message.
	#[serde(default)]
	pub message: String,
	/// Explicit success flag; either this or `code == 200` marks success.
	#[serde(default)]
	pub success: bool,
}
impl<T> ApiResponse<T> {
	/// Returns true iff `code == 200` or `success` is set.
	pub fn is_success(&self) -> bool {
		self.code == SUCCESS_CODE || self.success
	}

	/// The envelope message, or [`DEFAULT_FAILURE_MESSAGE`] when empty.
	pub fn failure_message(&self) -> &str {
		if self.message.is_empty() { DEFAULT_FAILURE_MESSAGE } else { &self.message }
	}
}
impl ApiResponse<Value> {
	/// Parses an envelope from a response body.
	pub fn from_slice(bytes: &[u8], status: Option<u16>) -> Result<Self> {
		let mut de = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|source| Error::Decode { source, status })
	}

	/// Converts the untyped payload into `R`, keeping the envelope fields.
	pub fn into_typed<R>(self) -> Result<ApiResponse<R>>
	where
		R: DeserializeOwned,
	{
		let data = serde_path_to_error::deserialize(self.data)
			.map_err(|source| Error::Decode { source, status: None })?;

		Ok(ApiResponse { code: self.code, data, message: self.message, success: self.success })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_requires_code_200_or_flag() {
		let ok = ApiResponse::from_slice(br#"{"code":200,"data":{"id":1},"message":""}"#, None)
			.expect("Envelope should parse.");
		let flagged = ApiResponse::from_slice(br#"{"code":0,"success":true}"#, None)
			.expect("Envelope should parse.");
		let failed = ApiResponse::from_slice(br#"{"code":401,"message":"expired"}"#, None)
			.expect("Envelope without data should parse.");

		assert!(ok.is_success());
		assert!(flagged.is_success());
		assert!(!failed.is_success());
		assert_eq!(failed.data, Value::Null);
		assert_eq!(failed.failure_message(), "expired");
	}

	#[test]
	fn success_flag_alone_marks_success() {
		let envelope = ApiResponse::from_slice(br#"{"success":true,"data":[1,2]}"#, None)
			.expect("Envelope without a code should parse.");

		assert_eq!(envelope.code, 0);
		assert!(envelope.is_success());
		assert_eq!(envelope.data, serde_json::json!([1, 2]));
	}

	#[test]
	fn failure_message_falls_back_to_default() {
		let envelope = ApiResponse::from_slice(br#"{"code":500}"#, None)
			.expect("Minimal envelope should parse.");

		assert_eq!(envelope.failure_message(), DEFAULT_FAILURE_MESSAGE);
	}

	#[test]
	fn malformed_body_reports_path_and_status() {
		let err = ApiResponse::from_slice(br#"{"code":"nope"}"#, Some(200))
			.expect_err("String code should be rejected.");

		match err {
			Error::Decode { source, status } => {
				assert_eq!(status, Some(200));
				assert_eq!(source.path().to_string(), "code");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn typed_conversion_keeps_envelope_fields() {
		#[derive(Debug, Deserialize, PartialEq)]
		struct User {
			id: u32,
		}

		let typed = ApiResponse::from_slice(br#"{"code":200,"data":{"id":7},"success":true}"#, None)
			.expect("Envelope should parse.")
			.into_typed::<User>()
			.expect("Payload should convert into the typed model.");

		assert_eq!(typed.data, User { id: 7 });
		assert!(typed.success);
	}
}
