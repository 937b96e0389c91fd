use abr_core::Router;
use abr_protocol::Response;
use tracing::debug;

use super::prepare;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};

/// Runs one command on a fresh router and closes whatever session it opened.
pub async fn execute(text: &str, default_session: &str, router: Router, format: OutputFormat) -> Result<()> {
	let response = match prepare(text, default_session) {
		Ok(command) => {
			debug!(target = "abr.exec", id = %command.id, session = %command.session, action = %command.kind(), "executing");
			let response = router.submit(command).await;
			router.shutdown().await;
			response
		}
		Err(err) => Response::rejected(&err),
	};

	output::print_response(&response, format);
	if response.success { Ok(()) } else { Err(CliError::OutputAlreadyPrinted) }
}
