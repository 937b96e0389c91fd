use std::fmt;

use thiserror::Error;

use crate::response::ErrorCode;

/// How a joint-field constraint was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusivity {
	/// None of the alternatives was provided.
	NoneProvided,
	/// More than one of a set of exclusive fields was provided.
	Conflicting,
}

/// Why a command was rejected before it reached any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
	MalformedInput,
	MissingField,
	WrongType,
	UnknownAction,
	MutuallyExclusiveFields(Exclusivity),
	/// A well-typed index that does not address an existing item (tabs).
	OutOfRange,
}

impl Reason {
	pub fn code(self) -> ErrorCode {
		match self {
			Reason::MalformedInput => ErrorCode::MalformedInput,
			Reason::MissingField => ErrorCode::MissingField,
			Reason::WrongType => ErrorCode::WrongType,
			Reason::UnknownAction => ErrorCode::UnknownAction,
			Reason::MutuallyExclusiveFields(_) => ErrorCode::MutuallyExclusiveFields,
			Reason::OutOfRange => ErrorCode::OutOfRange,
		}
	}
}

impl fmt::Display for Reason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Reason::MalformedInput => f.write_str("malformed input"),
			Reason::MissingField => f.write_str("missing field"),
			Reason::WrongType => f.write_str("wrong type"),
			Reason::UnknownAction => f.write_str("unknown action"),
			Reason::MutuallyExclusiveFields(Exclusivity::NoneProvided) => f.write_str("none of the alternative fields provided"),
			Reason::MutuallyExclusiveFields(Exclusivity::Conflicting) => f.write_str("mutually exclusive fields provided"),
			Reason::OutOfRange => f.write_str("out of range"),
		}
	}
}

/// Structured validation failure.
///
/// `field` is `None` for envelope-level problems such as unparsable input.
/// `id` carries the request id whenever it could be recovered, so the
/// failure can still be correlated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}{}{}", .field.as_deref().map(|f| format!(" `{f}`")).unwrap_or_default(), .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
pub struct ValidationError {
	pub field: Option<String>,
	pub reason: Reason,
	pub id: Option<String>,
	pub detail: Option<String>,
}

impl ValidationError {
	pub fn new(reason: Reason, field: Option<&str>) -> Self {
		Self {
			field: field.map(str::to_string),
			reason,
			id: None,
			detail: None,
		}
	}

	pub fn malformed(detail: impl Into<String>) -> Self {
		Self::new(Reason::MalformedInput, None).with_detail(detail)
	}

	pub fn missing(field: &str) -> Self {
		Self::new(Reason::MissingField, Some(field))
	}

	pub fn wrong_type(field: &str, detail: impl Into<String>) -> Self {
		Self::new(Reason::WrongType, Some(field)).with_detail(detail)
	}

	pub fn out_of_range(field: &str, detail: impl Into<String>) -> Self {
		Self::new(Reason::OutOfRange, Some(field)).with_detail(detail)
	}

	pub fn with_id(mut self, id: Option<&str>) -> Self {
		self.id = id.map(str::to_string);
		self
	}

	pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
		self.detail = Some(detail.into());
		self
	}
}
