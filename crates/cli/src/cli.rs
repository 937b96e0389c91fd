use std::path::PathBuf;

use abr_core::ProviderKind;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Root CLI for abr.
#[derive(Parser, Debug)]
#[command(name = "abr")]
#[command(about = "Browser and device automation over a line-oriented JSON protocol")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: toon (default), json, ndjson, or text
	#[arg(short = 'f', long, global = true, value_enum, default_value = "toon")]
	pub format: OutputFormat,

	/// Config file (defaults to <config dir>/abr/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(flatten)]
	pub provider: ProviderArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Provider identity flags. Each falls back to its environment variable.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderArgs {
	/// Provider for new sessions: desktop, ios, or mobile
	#[arg(long, global = true, env = "AGENT_BROWSER_PROVIDER", value_name = "KIND")]
	pub provider: Option<ProviderKind>,

	/// Device name or UDID for mobile sessions
	#[arg(long, global = true, env = "AGENT_BROWSER_IOS_DEVICE", value_name = "DEVICE")]
	pub device: Option<String>,

	/// Device UDID for mobile sessions; wins over --device
	#[arg(long, global = true, env = "AGENT_BROWSER_IOS_UDID", value_name = "UDID")]
	pub udid: Option<String>,

	/// Driver command line for the selected provider (split on whitespace)
	#[arg(long, global = true, env = "AGENT_BROWSER_DRIVER", value_name = "COMMAND")]
	pub driver: Option<String>,

	/// Session used by commands that do not name one
	#[arg(long, global = true, env = "AGENT_BROWSER_SESSION", value_name = "NAME")]
	pub session: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Stream commands over stdin/stdout (NDJSON).
	Serve,
	/// Execute a single command through a fresh router.
	Exec(CommandInput),
	/// Check a command against the schema without running it.
	Validate(CommandInput),
	/// List every action the protocol accepts.
	Actions,
}

#[derive(Args, Debug, Clone)]
pub struct CommandInput {
	/// Command object as JSON.
	#[arg(value_name = "JSON", conflicts_with = "file", required_unless_present = "file")]
	pub json: Option<String>,

	/// Path to a file holding the command JSON.
	#[arg(long, value_name = "FILE")]
	pub file: Option<PathBuf>,
}

/// Help colors matching cargo's.
pub fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;

	#[test]
	fn parse_exec_with_inline_json() {
		let cli = Cli::try_parse_from(["abr", "exec", r#"{"id":"1","action":"back"}"#]).unwrap();

		match cli.command {
			Commands::Exec(input) => {
				assert_eq!(input.json.as_deref(), Some(r#"{"id":"1","action":"back"}"#));
				assert_eq!(input.file, None);
			}
			_ => panic!("Expected Exec command"),
		}
		assert_eq!(cli.format, OutputFormat::Toon);
	}

	#[test]
	fn parse_validate_from_file() {
		let cli = Cli::try_parse_from(["abr", "validate", "--file", "/tmp/cmd.json"]).unwrap();

		match cli.command {
			Commands::Validate(input) => assert_eq!(input.file, Some(PathBuf::from("/tmp/cmd.json"))),
			_ => panic!("Expected Validate command"),
		}
	}

	#[test]
	fn exec_requires_some_input() {
		assert!(Cli::try_parse_from(["abr", "exec"]).is_err());
	}

	#[test]
	fn provider_flags_are_global() {
		let cli = Cli::try_parse_from(["abr", "serve", "--provider", "ios", "--device", "iPhone 15", "-f", "json", "-vv"]).unwrap();

		assert!(matches!(cli.command, Commands::Serve));
		assert_eq!(cli.provider.provider, Some(ProviderKind::Mobile));
		assert_eq!(cli.provider.device.as_deref(), Some("iPhone 15"));
		assert_eq!(cli.format, OutputFormat::Json);
		assert_eq!(cli.verbose, 2);
	}

	#[test]
	fn unknown_provider_is_rejected() {
		assert!(Cli::try_parse_from(["abr", "serve", "--provider", "android"]).is_err());
	}
}
