mod actions;
mod exec;
pub mod serve;
mod validate;

use std::sync::Arc;

use abr_core::Router;
use abr_protocol::{Command, ValidationError, parse_value};
use serde_json::Value;

use crate::bridge::BridgeFactory;
use crate::cli::{Cli, CommandInput, Commands};
use crate::config::Settings;
use crate::error::{CliError, Result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let format = cli.format;

	match cli.command {
		Commands::Actions => {
			actions::execute(format);
			Ok(())
		}
		Commands::Validate(input) => {
			let settings = Settings::load(&cli.provider, cli.config.as_deref())?;
			validate::execute(&read_input(&input)?, &settings.session, format)
		}
		Commands::Exec(input) => {
			let settings = Settings::load(&cli.provider, cli.config.as_deref())?;
			let text = read_input(&input)?;
			exec::execute(&text, &settings.session, router(&settings), format).await
		}
		Commands::Serve => {
			let settings = Settings::load(&cli.provider, cli.config.as_deref())?;
			serve::execute(router(&settings), settings.session).await
		}
	}
}

fn router(settings: &Settings) -> Router {
	Router::new(Arc::new(BridgeFactory::new(settings.drivers.clone())), settings.launch.clone())
}

fn read_input(input: &CommandInput) -> Result<String> {
	match (&input.json, &input.file) {
		(Some(json), _) => Ok(json.clone()),
		(None, Some(path)) => std::fs::read_to_string(path).map_err(CliError::Input),
		(None, None) => Ok(String::new()),
	}
}

/// Parses one command, filling in `default_session` when the envelope has
/// no session of its own.
pub fn prepare(text: &str, default_session: &str) -> std::result::Result<Command, ValidationError> {
	let mut value: Value = serde_json::from_str(text).map_err(|err| ValidationError::malformed(err.to_string()))?;
	if let Value::Object(fields) = &mut value {
		if fields.get("session").is_none_or(Value::is_null) {
			fields.insert("session".into(), Value::String(default_session.to_string()));
		}
	}
	parse_value(value)
}

#[cfg(test)]
mod tests {
	use abr_protocol::{ErrorCode, Reason};

	use super::*;

	#[test]
	fn default_session_fills_gap() {
		let command = prepare(r#"{"id":"1","action":"back"}"#, "work").unwrap();
		assert_eq!(command.session, "work");
	}

	#[test]
	fn explicit_session_wins() {
		let command = prepare(r#"{"id":"1","action":"back","session":"mine"}"#, "work").unwrap();
		assert_eq!(command.session, "mine");
	}

	#[test]
	fn malformed_text_is_rejected() {
		let err = prepare("{not json", "default").unwrap_err();
		assert_eq!(err.reason, Reason::MalformedInput);
		assert_eq!(err.reason.code(), ErrorCode::MalformedInput);
	}

	#[test]
	fn non_object_is_still_malformed() {
		let err = prepare("[1, 2]", "default").unwrap_err();
		assert_eq!(err.reason, Reason::MalformedInput);
	}
}
