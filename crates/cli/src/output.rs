//! Rendering of responses and listings on stdout.
//!
//! `serve` always speaks NDJSON. The one-shot commands honor `--format`.

use std::io::{self, Write};

use abr_protocol::Response;
use serde::Serialize;
use serde_json::Value;

/// Output format for CLI results.
///
/// Used both for clap argument parsing and internal formatting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// TOON output (default, token-efficient for LLMs)
	#[default]
	Toon,
	/// JSON output
	Json,
	/// Newline-delimited JSON (streaming)
	Ndjson,
	/// Human-readable text
	Text,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"toon" => Ok(OutputFormat::Toon),
			"json" => Ok(OutputFormat::Json),
			"ndjson" => Ok(OutputFormat::Ndjson),
			"text" => Ok(OutputFormat::Text),
			_ => Err(format!("unknown format: {s}")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Toon => write!(f, "toon"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}

/// Renders any serializable value. Text falls back to pretty JSON.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Option<String> {
	match format {
		OutputFormat::Toon => serde_json::to_value(value).ok().map(|json| toon::encode(&json, None)),
		OutputFormat::Json | OutputFormat::Text => serde_json::to_string_pretty(value).ok(),
		OutputFormat::Ndjson => serde_json::to_string(value).ok(),
	}
}

/// Renders a response envelope.
///
/// Text output shows the result alone on success and `Error [CODE]: message`
/// on failure; the other formats show the whole envelope.
pub fn render_response(response: &Response, format: OutputFormat) -> Option<String> {
	if format != OutputFormat::Text {
		return render(response, format);
	}

	match (&response.result, &response.error) {
		(_, Some(error)) => {
			let mut text = format!("Error [{}]: {}", error.reason, error.message);
			if let Some(field) = &error.field {
				text.push_str(&format!(" (field: {field})"));
			}
			Some(text)
		}
		(Some(Value::Null) | None, None) => Some("ok".to_string()),
		(Some(result), None) => serde_json::to_string_pretty(result).ok(),
	}
}

pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) {
	if let Some(text) = render(value, format) {
		println!("{text}");
	}
}

pub fn print_response(response: &Response, format: OutputFormat) {
	if let Some(text) = render_response(response, format) {
		println!("{text}");
	}
}

/// Print an error message to stderr, for failures that never produced a response.
pub fn print_error_stderr(code: &str, message: &str) {
	let _ = writeln!(io::stderr(), "Error [{code}]: {message}");
}

#[cfg(test)]
mod tests {
	use abr_protocol::{ErrorBody, ErrorCode};
	use serde_json::json;

	use super::*;

	fn failure() -> Response {
		Response::failure(
			"7",
			ErrorBody {
				reason: ErrorCode::MissingField,
				message: "missing field `url`".into(),
				field: Some("url".into()),
			},
		)
	}

	#[test]
	fn ndjson_is_one_line() {
		let text = render_response(&Response::ok("1", json!({"url": "https://example.com"})), OutputFormat::Ndjson).unwrap();
		assert!(!text.contains('\n'));
		assert_eq!(
			serde_json::from_str::<Value>(&text).unwrap(),
			json!({"id": "1", "success": true, "result": {"url": "https://example.com"}})
		);
	}

	#[test]
	fn text_failure_names_code_and_field() {
		let text = render_response(&failure(), OutputFormat::Text).unwrap();
		assert_eq!(text, "Error [MISSING_FIELD]: missing field `url` (field: url)");
	}

	#[test]
	fn text_success_shows_result_only() {
		let text = render_response(&Response::ok("1", json!({"closed": true})), OutputFormat::Text).unwrap();
		assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"closed": true}));
	}

	#[test]
	fn json_keeps_whole_envelope() {
		let text = render_response(&failure(), OutputFormat::Json).unwrap();
		let value: Value = serde_json::from_str(&text).unwrap();
		assert_eq!(value["success"], false);
		assert_eq!(value["error"]["reason"], "MISSING_FIELD");
	}

	#[test]
	fn format_round_trips_through_str() {
		for format in [OutputFormat::Toon, OutputFormat::Json, OutputFormat::Ndjson, OutputFormat::Text] {
			assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
		}
	}
}
