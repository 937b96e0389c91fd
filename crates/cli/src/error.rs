use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// A failed response is already on stdout. Signals exit code 1 without
	/// further output.
	#[error("")]
	OutputAlreadyPrinted,

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("failed to read command file: {0}")]
	Input(#[source] std::io::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("response writer failed: {0}")]
	Writer(#[from] tokio::task::JoinError),
}

impl CliError {
	pub fn is_output_already_printed(&self) -> bool {
		matches!(self, CliError::OutputAlreadyPrinted)
	}

	pub fn code(&self) -> &'static str {
		match self {
			CliError::OutputAlreadyPrinted => "COMMAND_FAILED",
			CliError::Config(_) => "CONFIG_ERROR",
			CliError::Input(_) => "INPUT_ERROR",
			CliError::Io(_) | CliError::Writer(_) => "IO_ERROR",
		}
	}
}
