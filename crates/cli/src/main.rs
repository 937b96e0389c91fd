use abr_cli::cli::Cli;
use abr_cli::error::CliError;
use abr_cli::{commands, logging, output};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		match err.downcast_ref::<CliError>() {
			// Failed responses are already on stdout.
			Some(cli_err) if cli_err.is_output_already_printed() => {}
			Some(cli_err) => output::print_error_stderr(cli_err.code(), &format!("{err:#}")),
			None => output::print_error_stderr("INTERNAL_ERROR", &format!("{err:#}")),
		}
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	commands::dispatch(cli).await?;
	Ok(())
}
