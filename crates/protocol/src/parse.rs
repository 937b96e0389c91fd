//! Two-phase command validation.
//!
//! 1. Envelope: the input is a JSON object with a non-empty string `id` and
//!    an `action` naming a registered schema. Failures here short-circuit.
//! 2. Shape: the object satisfies the schema's required/optional fields and
//!    joint-field rules.
//!
//! Only when both phases pass is the object turned into a typed [`Command`].
//! `null` values are treated as absent; unrecognised fields are ignored.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::command::{Action, Command, DEFAULT_SESSION};
use crate::error::{Exclusivity, Reason, ValidationError};
use crate::schema::{ActionKind, ActionSchema, FieldSpec, FieldType, Rule, SAME_SITE, schema_for};

type Object = Map<String, Value>;

/// Parses and validates one command from raw text.
pub fn parse_command(input: &str) -> Result<Command, ValidationError> {
	let value: Value = serde_json::from_str(input).map_err(|err| ValidationError::malformed(err.to_string()))?;
	parse_value(value)
}

/// Validates an already-decoded JSON value.
pub fn parse_value(value: Value) -> Result<Command, ValidationError> {
	let Value::Object(mut fields) = value else {
		return Err(ValidationError::malformed(format!("expected a JSON object, found {}", json_kind(&value))));
	};
	fields.retain(|_, value| !value.is_null());

	let envelope = read_envelope(&fields)?;
	let id = envelope.id.to_string();
	let session = envelope.session.to_string();
	let schema = envelope.schema;

	check_shape(schema, &fields).map_err(|err| err.with_id(Some(&id)))?;
	let action = build_action(schema.kind, fields).map_err(|err| ValidationError::new(Reason::WrongType, None).with_id(Some(&id)).with_detail(err.to_string()))?;

	Ok(Command { id, session, action })
}

struct Envelope<'a> {
	id: &'a str,
	session: &'a str,
	schema: &'static ActionSchema,
}

fn read_envelope(fields: &Object) -> Result<Envelope<'_>, ValidationError> {
	let id = match fields.get("id") {
		None => return Err(ValidationError::missing("id")),
		Some(Value::String(id)) if id.is_empty() => return Err(ValidationError::missing("id").with_detail("id must not be empty")),
		Some(Value::String(id)) => id.as_str(),
		Some(other) => {
			return Err(ValidationError::new(Reason::MalformedInput, Some("id")).with_detail(format!("expected string, found {}", json_kind(other))));
		}
	};

	let action = match fields.get("action") {
		None => return Err(ValidationError::missing("action").with_id(Some(id))),
		Some(Value::String(action)) => action.as_str(),
		Some(other) => {
			return Err(ValidationError::new(Reason::MalformedInput, Some("action"))
				.with_id(Some(id))
				.with_detail(format!("expected string, found {}", json_kind(other))));
		}
	};

	let schema = schema_for(action).ok_or_else(|| {
		ValidationError::new(Reason::UnknownAction, Some("action"))
			.with_id(Some(id))
			.with_detail(format!("no action named '{action}'"))
	})?;

	let session = match fields.get("session") {
		None => DEFAULT_SESSION,
		Some(Value::String(session)) if !session.is_empty() => session.as_str(),
		Some(_) => {
			return Err(ValidationError::new(Reason::MalformedInput, Some("session"))
				.with_id(Some(id))
				.with_detail("session must be a non-empty string"));
		}
	};

	Ok(Envelope { id, session, schema })
}

/// Outcome of checking one value against a [`FieldType`].
#[derive(Debug, PartialEq, Eq)]
enum Fault {
	/// An empty value where a non-empty one is required.
	Empty,
	Mistyped(String),
}

/// Checks `fields` against `schema` without building anything.
pub fn check_shape(schema: &ActionSchema, fields: &Object) -> Result<(), ValidationError> {
	for spec in schema.required {
		let Some(value) = fields.get(spec.name) else {
			return Err(ValidationError::missing(spec.name));
		};
		match check_value(spec, value) {
			Ok(()) => {}
			Err(Fault::Empty) => return Err(ValidationError::missing(spec.name).with_detail(format!("expected {}", spec.ty))),
			Err(Fault::Mistyped(detail)) => return Err(ValidationError::wrong_type(spec.name, detail)),
		}
	}

	for spec in schema.optional {
		let Some(value) = fields.get(spec.name) else {
			continue;
		};
		match check_value(spec, value) {
			Ok(()) => {}
			Err(Fault::Empty) => return Err(ValidationError::wrong_type(spec.name, format!("expected {}", spec.ty))),
			Err(Fault::Mistyped(detail)) => return Err(ValidationError::wrong_type(spec.name, detail)),
		}
	}

	for rule in schema.rules {
		check_rule(rule, fields)?;
	}

	Ok(())
}

fn check_rule(rule: &Rule, fields: &Object) -> Result<(), ValidationError> {
	match *rule {
		Rule::AtLeastOneOf(names) => {
			if !names.iter().any(|name| fields.contains_key(*name)) {
				return Err(ValidationError::new(Reason::MutuallyExclusiveFields(Exclusivity::NoneProvided), Some(names.join("|").as_str()))
					.with_detail(format!("at least one of {} is required", names.join(", "))));
			}
		}
		Rule::AtMostOneOf(names) => {
			let present: Vec<&str> = names.iter().copied().filter(|name| fields.contains_key(*name)).collect();
			if present.len() > 1 {
				return Err(ValidationError::new(Reason::MutuallyExclusiveFields(Exclusivity::Conflicting), Some(present.join("|").as_str()))
					.with_detail(format!("only one of {} may be given", names.join(", "))));
			}
		}
		Rule::RequiredWhen { field, values, then } => {
			let triggered = fields.get(field).and_then(Value::as_str).is_some_and(|value| values.contains(&value));
			if triggered && !fields.contains_key(then) {
				let trigger = fields.get(field).and_then(Value::as_str).unwrap_or_default();
				return Err(ValidationError::missing(then).with_detail(format!("required when {field} is '{trigger}'")));
			}
		}
	}
	Ok(())
}

fn check_value(spec: &FieldSpec, value: &Value) -> Result<(), Fault> {
	let expected = || Fault::Mistyped(format!("expected {}, found {}", spec.ty, json_kind(value)));

	match spec.ty {
		FieldType::String => value.as_str().map(drop).ok_or_else(expected),
		FieldType::NonEmptyString => match value.as_str() {
			Some("") => Err(Fault::Empty),
			Some(_) => Ok(()),
			None => Err(expected()),
		},
		FieldType::Bool => value.as_bool().map(drop).ok_or_else(expected),
		FieldType::PositiveInt => match value.as_u64() {
			Some(0) => Err(Fault::Mistyped("expected positive integer, found 0".into())),
			Some(_) => Ok(()),
			None => Err(expected()),
		},
		FieldType::NonNegativeInt => value.as_u64().map(drop).ok_or_else(expected),
		FieldType::Enum(allowed) => match value.as_str() {
			Some(found) if allowed.contains(&found) => Ok(()),
			Some(found) => Err(Fault::Mistyped(format!("expected {}, found '{found}'", spec.ty))),
			None => Err(expected()),
		},
		FieldType::Strings => match value {
			Value::String(_) => Ok(()),
			Value::Array(items) if items.is_empty() => Err(Fault::Empty),
			Value::Array(items) if items.iter().all(Value::is_string) => Ok(()),
			_ => Err(expected()),
		},
		FieldType::Cookies => {
			let items = value.as_array().ok_or_else(expected)?;
			if items.is_empty() {
				return Err(Fault::Empty);
			}
			for (index, item) in items.iter().enumerate() {
				check_cookie(item).map_err(|detail| Fault::Mistyped(format!("cookie {index}: {detail}")))?;
			}
			Ok(())
		}
	}
}

fn check_cookie(item: &Value) -> Result<(), String> {
	let cookie = item.as_object().ok_or_else(|| format!("expected object, found {}", json_kind(item)))?;

	for key in ["name", "value"] {
		match cookie.get(key) {
			Some(Value::String(_)) => {}
			Some(other) => return Err(format!("`{key}` must be a string, found {}", json_kind(other))),
			None => return Err(format!("`{key}` is required")),
		}
	}

	for (key, value) in cookie {
		let ok = match key.as_str() {
			"domain" | "path" | "url" => value.is_string() || value.is_null(),
			"expires" => value.is_number() || value.is_null(),
			"httpOnly" | "secure" => value.is_boolean() || value.is_null(),
			"sameSite" => value.is_null() || value.as_str().is_some_and(|s| SAME_SITE.contains(&s)),
			_ => true,
		};
		if !ok {
			return Err(format!("`{key}` has the wrong type"));
		}
	}
	Ok(())
}

fn build_action(kind: ActionKind, fields: Object) -> Result<Action, serde_json::Error> {
	fn args<T: DeserializeOwned>(fields: Object) -> Result<T, serde_json::Error> {
		serde_json::from_value(Value::Object(fields))
	}

	Ok(match kind {
		ActionKind::Navigate => Action::Navigate(args(fields)?),
		ActionKind::Back => Action::Back,
		ActionKind::Forward => Action::Forward,
		ActionKind::Reload => Action::Reload,
		ActionKind::Click => Action::Click(args(fields)?),
		ActionKind::Type => Action::Type(args(fields)?),
		ActionKind::Fill => Action::Fill(args(fields)?),
		ActionKind::Hover => Action::Hover(args(fields)?),
		ActionKind::Select => Action::Select(args(fields)?),
		ActionKind::Press => Action::Press(args(fields)?),
		ActionKind::GetByRole => Action::GetByRole(args(fields)?),
		ActionKind::GetByText => Action::GetByText(args(fields)?),
		ActionKind::GetByLabel => Action::GetByLabel(args(fields)?),
		ActionKind::Wait => Action::Wait(args(fields)?),
		ActionKind::Screenshot => Action::Screenshot(args(fields)?),
		ActionKind::Snapshot => Action::Snapshot(args(fields)?),
		ActionKind::Pdf => Action::Pdf(args(fields)?),
		ActionKind::ScreencastStart => Action::ScreencastStart(args(fields)?),
		ActionKind::ScreencastStop => Action::ScreencastStop,
		ActionKind::CookiesGet => Action::CookiesGet(args(fields)?),
		ActionKind::CookiesSet => Action::CookiesSet(args(fields)?),
		ActionKind::CookiesClear => Action::CookiesClear,
		ActionKind::StorageGet => Action::StorageGet(args(fields)?),
		ActionKind::StorageSet => Action::StorageSet(args(fields)?),
		ActionKind::TabNew => Action::TabNew(args(fields)?),
		ActionKind::TabList => Action::TabList,
		ActionKind::TabSwitch => Action::TabSwitch(args(fields)?),
		ActionKind::TabClose => Action::TabClose(args(fields)?),
		ActionKind::Swipe => Action::Swipe(args(fields)?),
		ActionKind::Close => Action::Close,
	})
}

fn json_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
