//! Response envelope written back for every command.
//!
//! ```json
//! {"id":"1","success":true,"result":{"url":"https://example.com"}}
//! {"id":"2","success":false,"error":{"reason":"MISSING_FIELD","message":"missing field `url`","field":"url"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	MalformedInput,
	MissingField,
	WrongType,
	UnknownAction,
	MutuallyExclusiveFields,
	OutOfRange,
	StaleReference,
	UnknownReference,
	UnsupportedByProvider,
	/// Provider reported a timeout
	Timeout,
	/// Provider could not find the element
	ElementNotFound,
	/// Provider failed to navigate
	NavigationFailed,
	/// Any other provider-side failure, passed through
	ProviderError,
	/// The session was torn down before the command could run
	SessionClosed,
	/// The provider for a new session could not be started
	LaunchFailed,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::MalformedInput => "MALFORMED_INPUT",
			ErrorCode::MissingField => "MISSING_FIELD",
			ErrorCode::WrongType => "WRONG_TYPE",
			ErrorCode::UnknownAction => "UNKNOWN_ACTION",
			ErrorCode::MutuallyExclusiveFields => "MUTUALLY_EXCLUSIVE_FIELDS",
			ErrorCode::OutOfRange => "OUT_OF_RANGE",
			ErrorCode::StaleReference => "STALE_REFERENCE",
			ErrorCode::UnknownReference => "UNKNOWN_REFERENCE",
			ErrorCode::UnsupportedByProvider => "UNSUPPORTED_BY_PROVIDER",
			ErrorCode::Timeout => "TIMEOUT",
			ErrorCode::ElementNotFound => "ELEMENT_NOT_FOUND",
			ErrorCode::NavigationFailed => "NAVIGATION_FAILED",
			ErrorCode::ProviderError => "PROVIDER_ERROR",
			ErrorCode::SessionClosed => "SESSION_CLOSED",
			ErrorCode::LaunchFailed => "LAUNCH_FAILED",
		};
		f.write_str(code)
	}
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
	pub reason: ErrorCode,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
}

impl From<&ValidationError> for ErrorBody {
	fn from(err: &ValidationError) -> Self {
		Self {
			reason: err.reason.code(),
			message: err.to_string(),
			field: err.field.clone(),
		}
	}
}

/// Single response envelope, correlated to its request by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
	/// Echo of the request id; empty when the id could not be recovered.
	pub id: String,
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorBody>,
}

impl Response {
	pub fn ok(id: impl Into<String>, result: Value) -> Self {
		Self {
			id: id.into(),
			success: true,
			result: Some(result),
			error: None,
		}
	}

	pub fn failure(id: impl Into<String>, error: ErrorBody) -> Self {
		Self {
			id: id.into(),
			success: false,
			result: None,
			error: Some(error),
		}
	}

	/// Response for a command that never passed validation.
	pub fn rejected(err: &ValidationError) -> Self {
		Self::failure(err.id.clone().unwrap_or_default(), ErrorBody::from(err))
	}

	pub fn error_code(&self) -> Option<ErrorCode> {
		self.error.as_ref().map(|error| error.reason)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::error::ValidationError;

	#[test]
	fn success_skips_error() {
		let response = Response::ok("1", json!({"url": "https://example.com"}));
		let value = serde_json::to_value(&response).unwrap();
		assert_eq!(value, json!({"id": "1", "success": true, "result": {"url": "https://example.com"}}));
	}

	#[test]
	fn rejected_echoes_recovered_id() {
		let err = ValidationError::missing("url").with_id(Some("42"));
		let value = serde_json::to_value(Response::rejected(&err)).unwrap();
		assert_eq!(value["id"], "42");
		assert_eq!(value["success"], false);
		assert_eq!(value["error"]["reason"], "MISSING_FIELD");
		assert_eq!(value["error"]["field"], "url");
	}

	#[test]
	fn error_code_display_matches_serde() {
		for code in [ErrorCode::StaleReference, ErrorCode::UnsupportedByProvider, ErrorCode::MutuallyExclusiveFields] {
			assert_eq!(serde_json::to_value(code).unwrap(), json!(code.to_string()));
		}
	}
}
