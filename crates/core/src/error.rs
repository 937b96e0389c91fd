use abr_protocol::{ActionKind, ErrorBody, ErrorCode, ValidationError};
use thiserror::Error;

use crate::provider::{FailureKind, ProviderError, ProviderKind};
use crate::refs::RefError;

/// Every way a validated command can fail once it reaches the router.
///
/// Each variant maps to one wire [`ErrorCode`]; none of them except a fatal
/// provider error ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error(transparent)]
	Reference(#[from] RefError),

	#[error("{action} is not supported by the {provider} provider")]
	UnsupportedByProvider { action: ActionKind, provider: ProviderKind },

	#[error(transparent)]
	Provider(#[from] ProviderError),

	#[error("session {0} is closed")]
	SessionClosed(String),

	#[error("failed to launch {provider} provider: {message}")]
	Launch { provider: ProviderKind, message: String },
}

impl CommandError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CommandError::Validation(err) => err.reason.code(),
			CommandError::Reference(RefError::Stale { .. } | RefError::Superseded { .. }) => ErrorCode::StaleReference,
			CommandError::Reference(RefError::Unknown { .. }) => ErrorCode::UnknownReference,
			CommandError::UnsupportedByProvider { .. } => ErrorCode::UnsupportedByProvider,
			CommandError::Provider(ProviderError::Failed { kind, .. }) => match kind {
				FailureKind::Timeout => ErrorCode::Timeout,
				FailureKind::ElementNotFound => ErrorCode::ElementNotFound,
				FailureKind::Navigation => ErrorCode::NavigationFailed,
				FailureKind::Other => ErrorCode::ProviderError,
			},
			CommandError::Provider(ProviderError::Fatal(_)) => ErrorCode::ProviderError,
			CommandError::SessionClosed(_) => ErrorCode::SessionClosed,
			CommandError::Launch { .. } => ErrorCode::LaunchFailed,
		}
	}

	/// Field the failure is attributed to, when there is one.
	pub fn field(&self) -> Option<&str> {
		match self {
			CommandError::Validation(err) => err.field.as_deref(),
			_ => None,
		}
	}

	pub fn to_error_body(&self) -> ErrorBody {
		ErrorBody {
			reason: self.code(),
			message: self.to_string(),
			field: self.field().map(str::to_string),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::refs::Epoch;

	#[test]
	fn provider_failures_keep_their_tag() {
		let err = CommandError::from(ProviderError::failed(FailureKind::Timeout, "waited 5000ms"));
		let body = err.to_error_body();
		assert_eq!(body.reason, ErrorCode::Timeout);
		assert_eq!(body.message, "timeout: waited 5000ms");
	}

	#[test]
	fn stale_reference_code() {
		let err = CommandError::from(RefError::Stale {
			token: "@e1:1".into(),
			issued: Epoch(1),
			current: Epoch(2),
		});
		assert_eq!(err.code(), ErrorCode::StaleReference);
		assert_eq!(err.field(), None);
	}

	#[test]
	fn validation_keeps_field() {
		let err = CommandError::from(ValidationError::out_of_range("index", "session has 1 tab"));
		let body = err.to_error_body();
		assert_eq!(body.reason, ErrorCode::OutOfRange);
		assert_eq!(body.field.as_deref(), Some("index"));
	}

	#[test]
	fn unsupported_message_names_both_sides() {
		let err = CommandError::UnsupportedByProvider {
			action: ActionKind::TabNew,
			provider: ProviderKind::Mobile,
		};
		assert_eq!(err.to_string(), "tab_new is not supported by the mobile provider");
	}
}
