//! Layered settings for new sessions.
//!
//! Highest first: command-line flags, then `AGENT_BROWSER_*` environment
//! variables (both handled by clap), then the JSON config file, then
//! built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use abr_core::{DeviceSelector, LaunchSpec, ProviderKind};
use abr_protocol::DEFAULT_SESSION;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cli::ProviderArgs;

/// Driver started for desktop sessions when nothing else is configured.
pub const DEFAULT_DESKTOP_DRIVER: &str = "abr-desktop-driver";
/// Driver started for mobile sessions when nothing else is configured.
pub const DEFAULT_MOBILE_DRIVER: &str = "abr-ios-driver";

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read config {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {}: {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("invalid provider in config: {0}")]
	Provider(String),

	#[error("empty driver command for the {0} provider")]
	EmptyDriver(ProviderKind),
}

/// On-disk shape of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
	/// `desktop`, `ios`, or `mobile`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub device: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub udid: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session: Option<String>,
	pub drivers: DriverTable,
}

/// Driver argv per provider, as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverTable {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub desktop: Option<Vec<String>>,
	#[serde(alias = "ios", skip_serializing_if = "Option::is_none")]
	pub mobile: Option<Vec<String>>,
}

impl ConfigFile {
	/// `<config dir>/abr/config.json`, when the platform has a config dir.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("abr").join("config.json"))
	}

	/// Loads `explicit` if given (it must exist), otherwise the default path
	/// if present, otherwise an empty config.
	pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
		match explicit {
			Some(path) => Self::read(path),
			None => match Self::default_path() {
				Some(path) if path.exists() => Self::read(&path),
				_ => Ok(Self::default()),
			},
		}
	}

	pub fn read(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		debug!(target = "abr.config", path = %path.display(), "loaded config");
		Ok(config)
	}
}

/// Resolved driver argv per provider. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drivers {
	pub desktop: Vec<String>,
	pub mobile: Vec<String>,
}

impl Default for Drivers {
	fn default() -> Self {
		Self {
			desktop: vec![DEFAULT_DESKTOP_DRIVER.to_string()],
			mobile: vec![DEFAULT_MOBILE_DRIVER.to_string()],
		}
	}
}

impl Drivers {
	pub fn for_kind(&self, kind: ProviderKind) -> &[String] {
		match kind {
			ProviderKind::Desktop => &self.desktop,
			ProviderKind::Mobile => &self.mobile,
		}
	}

	fn set(&mut self, kind: ProviderKind, argv: Vec<String>) -> Result<(), ConfigError> {
		if argv.is_empty() {
			return Err(ConfigError::EmptyDriver(kind));
		}
		match kind {
			ProviderKind::Desktop => self.desktop = argv,
			ProviderKind::Mobile => self.mobile = argv,
		}
		Ok(())
	}
}

/// Everything needed to build a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	/// Launch spec for sessions without an explicit binding.
	pub launch: LaunchSpec,
	/// Session for commands that omit one.
	pub session: String,
	pub drivers: Drivers,
}

impl Settings {
	pub fn load(args: &ProviderArgs, config: Option<&Path>) -> Result<Self, ConfigError> {
		Self::resolve(args, ConfigFile::load(config)?)
	}

	pub fn resolve(args: &ProviderArgs, file: ConfigFile) -> Result<Self, ConfigError> {
		let kind = match (args.provider, file.provider.as_deref()) {
			(Some(kind), _) => kind,
			(None, Some(name)) => name.parse().map_err(ConfigError::Provider)?,
			(None, None) => ProviderKind::Desktop,
		};

		let device = select_device(args.udid.as_deref(), args.device.as_deref())
			.or_else(|| select_device(file.udid.as_deref(), file.device.as_deref()));

		let launch = match kind {
			ProviderKind::Desktop => {
				if let Some(device) = &device {
					debug!(target = "abr.config", device = device.value(), "ignoring device for desktop provider");
				}
				LaunchSpec::desktop()
			}
			ProviderKind::Mobile => LaunchSpec::mobile(device),
		};

		let mut drivers = Drivers::default();
		if let Some(argv) = file.drivers.desktop {
			drivers.set(ProviderKind::Desktop, argv)?;
		}
		if let Some(argv) = file.drivers.mobile {
			drivers.set(ProviderKind::Mobile, argv)?;
		}
		if let Some(line) = args.driver.as_deref() {
			drivers.set(kind, line.split_whitespace().map(str::to_string).collect())?;
		}

		let session = args
			.session
			.clone()
			.or(file.session)
			.filter(|session| !session.is_empty())
			.unwrap_or_else(|| DEFAULT_SESSION.to_string());

		Ok(Self { launch, session, drivers })
	}
}

/// An explicit UDID always wins; a free-form device value is classified.
fn select_device(udid: Option<&str>, device: Option<&str>) -> Option<DeviceSelector> {
	match (udid, device) {
		(Some(udid), _) if !udid.is_empty() => Some(DeviceSelector::Udid(udid.to_string())),
		(_, Some(device)) if !device.is_empty() => Some(DeviceSelector::detect(device)),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	const SIM_UDID: &str = "6F3A2B1C-1234-4ABC-9DEF-0123456789AB";

	fn write_config(dir: &TempDir, content: &str) -> PathBuf {
		let path = dir.path().join("config.json");
		fs::write(&path, content).unwrap();
		path
	}

	#[test]
	fn defaults_to_desktop_and_default_session() {
		let settings = Settings::resolve(&ProviderArgs::default(), ConfigFile::default()).unwrap();
		assert_eq!(settings.launch, LaunchSpec::desktop());
		assert_eq!(settings.session, "default");
		assert_eq!(settings.drivers, Drivers::default());
	}

	#[test]
	fn file_supplies_provider_device_and_drivers() {
		let dir = TempDir::new().unwrap();
		let path = write_config(
			&dir,
			r#"{"provider": "ios", "device": "iPhone 15 Pro", "session": "phone", "drivers": {"ios": ["node", "driver.js"]}}"#,
		);

		let settings = Settings::resolve(&ProviderArgs::default(), ConfigFile::read(&path).unwrap()).unwrap();
		assert_eq!(settings.launch, LaunchSpec::mobile(Some(DeviceSelector::Name("iPhone 15 Pro".into()))));
		assert_eq!(settings.session, "phone");
		assert_eq!(settings.drivers.for_kind(ProviderKind::Mobile), ["node", "driver.js"]);
		assert_eq!(settings.drivers.for_kind(ProviderKind::Desktop), [DEFAULT_DESKTOP_DRIVER]);
	}

	#[test]
	fn flags_override_file() {
		let file = ConfigFile {
			provider: Some("desktop".into()),
			session: Some("from-file".into()),
			..ConfigFile::default()
		};
		let args = ProviderArgs {
			provider: Some(ProviderKind::Mobile),
			device: Some(SIM_UDID.into()),
			session: Some("from-flag".into()),
			driver: Some("python3 -m ios_driver".into()),
			..ProviderArgs::default()
		};

		let settings = Settings::resolve(&args, file).unwrap();
		assert_eq!(settings.launch, LaunchSpec::mobile(Some(DeviceSelector::Udid(SIM_UDID.into()))));
		assert_eq!(settings.session, "from-flag");
		assert_eq!(settings.drivers.mobile, ["python3", "-m", "ios_driver"]);
	}

	#[test]
	fn udid_wins_over_device() {
		let args = ProviderArgs {
			provider: Some(ProviderKind::Mobile),
			device: Some("iPhone 15".into()),
			udid: Some("00008110-001A2B3C4D5E6F70".into()),
			..ProviderArgs::default()
		};
		let settings = Settings::resolve(&args, ConfigFile::default()).unwrap();
		assert_eq!(settings.launch.device, Some(DeviceSelector::Udid("00008110-001A2B3C4D5E6F70".into())));
	}

	#[test]
	fn flag_device_beats_file_udid() {
		let file = ConfigFile {
			provider: Some("mobile".into()),
			udid: Some(SIM_UDID.into()),
			..ConfigFile::default()
		};
		let args = ProviderArgs {
			device: Some("iPad Air".into()),
			..ProviderArgs::default()
		};
		let settings = Settings::resolve(&args, file).unwrap();
		assert_eq!(settings.launch.device, Some(DeviceSelector::Name("iPad Air".into())));
	}

	#[test]
	fn desktop_ignores_device() {
		let args = ProviderArgs {
			device: Some("iPhone 15".into()),
			..ProviderArgs::default()
		};
		let settings = Settings::resolve(&args, ConfigFile::default()).unwrap();
		assert_eq!(settings.launch, LaunchSpec::desktop());
	}

	#[test]
	fn bad_provider_in_file_is_an_error() {
		let file = ConfigFile {
			provider: Some("android".into()),
			..ConfigFile::default()
		};
		assert!(matches!(Settings::resolve(&ProviderArgs::default(), file), Err(ConfigError::Provider(_))));
	}

	#[test]
	fn empty_driver_is_an_error() {
		let args = ProviderArgs {
			driver: Some("   ".into()),
			..ProviderArgs::default()
		};
		assert!(matches!(
			Settings::resolve(&args, ConfigFile::default()),
			Err(ConfigError::EmptyDriver(ProviderKind::Desktop))
		));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let dir = TempDir::new().unwrap();
		let path = write_config(&dir, r#"{"browser": "chromium"}"#);
		assert!(matches!(ConfigFile::read(&path), Err(ConfigError::Parse { .. })));
	}

	#[test]
	fn explicit_missing_file_is_an_error() {
		let dir = TempDir::new().unwrap();
		let missing = dir.path().join("nope.json");
		assert!(matches!(ConfigFile::load(Some(&missing)), Err(ConfigError::Read { .. })));
	}
}
