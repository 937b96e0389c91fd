use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs the global subscriber. Everything goes to stderr; stdout carries
/// protocol responses only.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

/// Filter used when `RUST_LOG` is unset. Directives match module paths, so
/// they name the crates (`abr_core`, `abr_cli`) that emit the events.
fn default_filter(verbosity: u8) -> &'static str {
	// 0 = errors only
	// 1 (-v) = session lifecycle from abr, warnings from everything else
	// 2 (-vv) = debug everywhere, 3+ = trace
	match verbosity {
		0 => "error",
		1 => "warn,abr_core=info,abr_cli=info",
		2 => "debug",
		_ => "trace",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_only_name_workspace_crates() {
		for verbosity in 0..=3 {
			let filter = default_filter(verbosity);
			assert!(filter.parse::<EnvFilter>().is_ok(), "{filter}");
			for directive in filter.split(',') {
				if let Some((target, _)) = directive.split_once('=') {
					assert!(["abr_core", "abr_cli", "abr_protocol"].contains(&target), "{directive} matches no module path");
				}
			}
		}
	}
}
