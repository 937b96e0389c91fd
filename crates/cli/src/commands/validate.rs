use abr_protocol::Response;

use super::prepare;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};

/// Prints the typed command, or the rejection and exit status 1.
pub fn execute(text: &str, default_session: &str, format: OutputFormat) -> Result<()> {
	match prepare(text, default_session) {
		Ok(command) => {
			output::print_value(&command, format);
			Ok(())
		}
		Err(err) => {
			output::print_response(&Response::rejected(&err), format);
			Err(CliError::OutputAlreadyPrinted)
		}
	}
}
