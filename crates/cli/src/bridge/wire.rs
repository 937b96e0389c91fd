//! Line format spoken with driver processes.
//!
//! Requests: `{"seq":n,"kind":"call","call":{...}}`,
//! `{"seq":n,"kind":"snapshot","request":{...}}`, `{"seq":n,"kind":"shutdown"}`.
//! Replies: `{"seq":n,"ok":true,"value":...}` or
//! `{"seq":n,"ok":false,"error":{"kind":"timeout","message":"..."}}`.

use abr_core::{FailureKind, ProviderCall, ProviderError, SnapshotRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
	pub seq: u64,
	#[serde(flatten)]
	pub body: RequestBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestBody<'a> {
	Call { call: &'a ProviderCall },
	Snapshot { request: &'a SnapshotRequest },
	Shutdown,
}

impl RequestBody<'_> {
	pub fn name(&self) -> &'static str {
		match self {
			RequestBody::Call { call } => call.op(),
			RequestBody::Snapshot { .. } => "snapshot",
			RequestBody::Shutdown => "shutdown",
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Reply {
	pub seq: u64,
	pub ok: bool,
	#[serde(default)]
	pub value: Value,
	#[serde(default)]
	pub error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyError {
	#[serde(default)]
	pub kind: ReplyErrorKind,
	#[serde(default)]
	pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyErrorKind {
	Timeout,
	ElementNotFound,
	Navigation,
	/// The driver lost its engine and cannot serve further calls.
	Fatal,
	#[default]
	#[serde(other)]
	Other,
}

impl Reply {
	pub fn into_result(self) -> Result<Value, ProviderError> {
		if self.ok {
			return Ok(self.value);
		}

		let Some(error) = self.error else {
			return Err(ProviderError::failed(FailureKind::Other, "driver reported failure without details"));
		};
		let kind = match error.kind {
			ReplyErrorKind::Timeout => FailureKind::Timeout,
			ReplyErrorKind::ElementNotFound => FailureKind::ElementNotFound,
			ReplyErrorKind::Navigation => FailureKind::Navigation,
			ReplyErrorKind::Other => FailureKind::Other,
			ReplyErrorKind::Fatal => return Err(ProviderError::fatal(error.message)),
		};
		Err(ProviderError::failed(kind, error.message))
	}
}

#[cfg(test)]
mod tests {
	use abr_core::Target;
	use serde_json::json;

	use super::*;

	#[test]
	fn call_request_nests_provider_call() {
		let call = ProviderCall::Hover {
			target: Target::Selector("#menu".into()),
		};
		let request = Request {
			seq: 3,
			body: RequestBody::Call { call: &call },
		};
		assert_eq!(
			serde_json::to_value(&request).unwrap(),
			json!({"seq": 3, "kind": "call", "call": {"op": "hover", "target": {"selector": "#menu"}}})
		);
	}

	#[test]
	fn shutdown_request_is_bare() {
		let request = Request {
			seq: 9,
			body: RequestBody::Shutdown,
		};
		assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"seq":9,"kind":"shutdown"}"#);
	}

	#[test]
	fn failure_kinds_map_onto_provider_errors() {
		let reply: Reply = serde_json::from_value(json!({"seq": 1, "ok": false, "error": {"kind": "element_not_found", "message": "no #x"}})).unwrap();
		assert_eq!(reply.into_result(), Err(ProviderError::failed(FailureKind::ElementNotFound, "no #x")));

		let reply: Reply = serde_json::from_value(json!({"seq": 1, "ok": false, "error": {"kind": "fatal", "message": "simulator died"}})).unwrap();
		assert_eq!(reply.into_result(), Err(ProviderError::fatal("simulator died")));
	}

	#[test]
	fn unknown_failure_kind_is_other() {
		let reply: Reply = serde_json::from_value(json!({"seq": 1, "ok": false, "error": {"kind": "weird", "message": "?"}})).unwrap();
		assert_eq!(reply.into_result(), Err(ProviderError::failed(FailureKind::Other, "?")));
	}

	#[test]
	fn success_without_value_is_null() {
		let reply: Reply = serde_json::from_value(json!({"seq": 1, "ok": true})).unwrap();
		assert_eq!(reply.into_result(), Ok(Value::Null));
	}
}
