//! The capability interface every automation backend implements.
//!
//! The core never drives a browser itself. A session owns one boxed
//! [`Provider`], obtained from a [`ProviderFactory`] on first use, and hands
//! it fully resolved [`ProviderCall`]s.

use std::fmt;
use std::str::FromStr;

use abr_protocol::ActionKind;
use abr_protocol::command::{MouseButton, StorageArea, Subaction, SwipeDirection, WaitUntil};
use abr_protocol::cookie::Cookie;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::refs::ElementHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	/// Multi-tab desktop browser engine.
	Desktop,
	/// Single-tab mobile device bridge.
	Mobile,
}

impl ProviderKind {
	pub fn as_str(self) -> &'static str {
		match self {
			ProviderKind::Desktop => "desktop",
			ProviderKind::Mobile => "mobile",
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ProviderKind {
	type Err = String;

	/// `ios` is accepted as the mobile provider's public name.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"desktop" | "browser" => Ok(ProviderKind::Desktop),
			"mobile" | "ios" => Ok(ProviderKind::Mobile),
			_ => Err(format!("unknown provider: {s} (expected desktop, ios, or mobile)")),
		}
	}
}

/// Action groups a provider may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
	Navigation,
	Interaction,
	SemanticLocators,
	Waiting,
	Screenshot,
	Snapshot,
	Cookies,
	Storage,
	Tabs,
	Pdf,
	Screencast,
	Gestures,
	Lifecycle,
}

impl Capability {
	pub const ALL: [Capability; 13] = [
		Capability::Navigation,
		Capability::Interaction,
		Capability::SemanticLocators,
		Capability::Waiting,
		Capability::Screenshot,
		Capability::Snapshot,
		Capability::Cookies,
		Capability::Storage,
		Capability::Tabs,
		Capability::Pdf,
		Capability::Screencast,
		Capability::Gestures,
		Capability::Lifecycle,
	];

	/// Capability an action needs.
	pub fn required_by(kind: ActionKind) -> Capability {
		match kind {
			ActionKind::Navigate | ActionKind::Back | ActionKind::Forward | ActionKind::Reload => Capability::Navigation,
			ActionKind::Click | ActionKind::Type | ActionKind::Fill | ActionKind::Hover | ActionKind::Select | ActionKind::Press => {
				Capability::Interaction
			}
			ActionKind::GetByRole | ActionKind::GetByText | ActionKind::GetByLabel => Capability::SemanticLocators,
			ActionKind::Wait => Capability::Waiting,
			ActionKind::Screenshot => Capability::Screenshot,
			ActionKind::Snapshot => Capability::Snapshot,
			ActionKind::Pdf => Capability::Pdf,
			ActionKind::ScreencastStart | ActionKind::ScreencastStop => Capability::Screencast,
			ActionKind::CookiesGet | ActionKind::CookiesSet | ActionKind::CookiesClear => Capability::Cookies,
			ActionKind::StorageGet | ActionKind::StorageSet => Capability::Storage,
			ActionKind::TabNew | ActionKind::TabList | ActionKind::TabSwitch | ActionKind::TabClose => Capability::Tabs,
			ActionKind::Swipe => Capability::Gestures,
			ActionKind::Close => Capability::Lifecycle,
		}
	}

	fn bit(self) -> u16 {
		1 << self as u16
	}
}

/// Fixed set of [`Capability`] groups.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
	pub const fn empty() -> Self {
		Self(0)
	}

	pub fn all() -> Self {
		Capability::ALL.into_iter().collect()
	}

	/// Default capability set for a provider kind.
	pub fn for_kind(kind: ProviderKind) -> Self {
		match kind {
			ProviderKind::Desktop => Self::all().without(Capability::Gestures),
			ProviderKind::Mobile => Self::all().without(Capability::Tabs).without(Capability::Pdf).without(Capability::Screencast),
		}
	}

	pub fn with(self, capability: Capability) -> Self {
		Self(self.0 | capability.bit())
	}

	pub fn without(self, capability: Capability) -> Self {
		Self(self.0 & !capability.bit())
	}

	pub fn contains(&self, capability: Capability) -> bool {
		self.0 & capability.bit() != 0
	}

	pub fn supports(&self, kind: ActionKind) -> bool {
		self.contains(Capability::required_by(kind))
	}

	pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
		Capability::ALL.into_iter().filter(|capability| self.contains(*capability))
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		iter.into_iter().fold(Self::empty(), Self::with)
	}
}

impl fmt::Debug for CapabilitySet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.iter()).finish()
	}
}

/// Which physical device a mobile session should attach to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelector {
	/// Human-readable device name, e.g. `iPhone 15 Pro`.
	Name(String),
	/// Hardware or simulator identifier.
	Udid(String),
}

impl DeviceSelector {
	/// Classifies a free-form device value.
	///
	/// Simulator UDIDs are `8-4-4-4-12` hex; physical device UDIDs are 25 or
	/// 40 hex characters, optionally with a single dash after the 8th.
	pub fn detect(value: &str) -> Self {
		if looks_like_udid(value) {
			DeviceSelector::Udid(value.to_string())
		} else {
			DeviceSelector::Name(value.to_string())
		}
	}

	pub fn value(&self) -> &str {
		match self {
			DeviceSelector::Name(value) | DeviceSelector::Udid(value) => value,
		}
	}
}

fn looks_like_udid(value: &str) -> bool {
	let groups: Vec<&str> = value.split('-').collect();
	let all_hex = groups.iter().all(|group| !group.is_empty() && group.bytes().all(|b| b.is_ascii_hexdigit()));
	if !all_hex {
		return false;
	}
	let lengths: Vec<usize> = groups.iter().map(|group| group.len()).collect();
	matches!(lengths.as_slice(), [8, 4, 4, 4, 12] | [25] | [40] | [8, 16])
}

/// Provider identity a session is launched with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
	pub kind: ProviderKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device: Option<DeviceSelector>,
}

impl LaunchSpec {
	pub fn desktop() -> Self {
		Self {
			kind: ProviderKind::Desktop,
			device: None,
		}
	}

	pub fn mobile(device: Option<DeviceSelector>) -> Self {
		Self {
			kind: ProviderKind::Mobile,
			device,
		}
	}
}

impl Default for LaunchSpec {
	fn default() -> Self {
		Self::desktop()
	}
}

/// Element a provider call acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
	/// Plain selector, passed through untouched.
	Selector(String),
	/// Element resolved from a snapshot reference.
	Element(ElementHandle),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum SemanticLocator {
	Role {
		role: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		name: Option<String>,
		exact: bool,
	},
	Text {
		text: String,
		exact: bool,
	},
	Label {
		label: String,
		exact: bool,
	},
}

/// A fully resolved request for the provider. No refs remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ProviderCall {
	Navigate {
		url: String,
		wait_until: WaitUntil,
	},
	Back,
	Forward,
	Reload,
	Click {
		target: Target,
		button: MouseButton,
		click_count: u64,
	},
	Type {
		target: Target,
		text: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		delay_ms: Option<u64>,
	},
	Fill {
		target: Target,
		value: String,
	},
	Hover {
		target: Target,
	},
	Select {
		target: Target,
		values: Vec<String>,
	},
	Press {
		key: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		target: Option<Target>,
	},
	Locate {
		locator: SemanticLocator,
		subaction: Subaction,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		value: Option<String>,
	},
	Wait {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		target: Option<Target>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		text: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		timeout_ms: Option<u64>,
	},
	Screenshot {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		path: Option<String>,
		full_page: bool,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		target: Option<Target>,
	},
	Pdf {
		path: String,
	},
	ScreencastStart {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		path: Option<String>,
	},
	ScreencastStop,
	CookiesGet {
		urls: Vec<String>,
	},
	CookiesSet {
		cookies: Vec<Cookie>,
	},
	CookiesClear,
	StorageGet {
		area: StorageArea,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		key: Option<String>,
	},
	StorageSet {
		area: StorageArea,
		key: String,
		value: String,
	},
	TabNew {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		url: Option<String>,
	},
	TabList,
	TabSwitch {
		index: usize,
	},
	TabClose {
		index: usize,
	},
	Swipe {
		direction: SwipeDirection,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		distance: Option<u64>,
	},
}

impl ProviderCall {
	/// Wire name of the operation, for logging.
	pub fn op(&self) -> &'static str {
		match self {
			ProviderCall::Navigate { .. } => "navigate",
			ProviderCall::Back => "back",
			ProviderCall::Forward => "forward",
			ProviderCall::Reload => "reload",
			ProviderCall::Click { .. } => "click",
			ProviderCall::Type { .. } => "type",
			ProviderCall::Fill { .. } => "fill",
			ProviderCall::Hover { .. } => "hover",
			ProviderCall::Select { .. } => "select",
			ProviderCall::Press { .. } => "press",
			ProviderCall::Locate { .. } => "locate",
			ProviderCall::Wait { .. } => "wait",
			ProviderCall::Screenshot { .. } => "screenshot",
			ProviderCall::Pdf { .. } => "pdf",
			ProviderCall::ScreencastStart { .. } => "screencast_start",
			ProviderCall::ScreencastStop => "screencast_stop",
			ProviderCall::CookiesGet { .. } => "cookies_get",
			ProviderCall::CookiesSet { .. } => "cookies_set",
			ProviderCall::CookiesClear => "cookies_clear",
			ProviderCall::StorageGet { .. } => "storage_get",
			ProviderCall::StorageSet { .. } => "storage_set",
			ProviderCall::TabNew { .. } => "tab_new",
			ProviderCall::TabList => "tab_list",
			ProviderCall::TabSwitch { .. } => "tab_switch",
			ProviderCall::TabClose { .. } => "tab_close",
			ProviderCall::Swipe { .. } => "swipe",
		}
	}
}

/// Parameters for enumerating the page or screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotRequest {
	pub interactive: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	Timeout,
	ElementNotFound,
	Navigation,
	Other,
}

impl fmt::Display for FailureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			FailureKind::Timeout => "timeout",
			FailureKind::ElementNotFound => "element not found",
			FailureKind::Navigation => "navigation failed",
			FailureKind::Other => "provider error",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
	/// The engine rejected or failed this one call. The session survives.
	#[error("{kind}: {message}")]
	Failed { kind: FailureKind, message: String },

	/// The engine itself is gone. The session is torn down.
	#[error("provider lost: {0}")]
	Fatal(String),
}

impl ProviderError {
	pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
		ProviderError::Failed { kind, message: message.into() }
	}

	pub fn fatal(message: impl Into<String>) -> Self {
		ProviderError::Fatal(message.into())
	}

	pub fn is_fatal(&self) -> bool {
		matches!(self, ProviderError::Fatal(_))
	}
}

/// One live automation backend, exclusively owned by a session.
#[async_trait]
pub trait Provider: Send {
	fn kind(&self) -> ProviderKind;

	fn capabilities(&self) -> CapabilitySet {
		CapabilitySet::for_kind(self.kind())
	}

	async fn call(&mut self, call: ProviderCall) -> Result<Value, ProviderError>;

	/// Enumerates elements in discovery order.
	async fn snapshot(&mut self, request: SnapshotRequest) -> Result<Vec<ElementHandle>, ProviderError>;

	/// Releases the browser or device. Called once, on `close` or teardown.
	async fn shutdown(&mut self) -> Result<(), ProviderError>;
}

/// Starts providers for new sessions.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
	async fn launch(&self, session: &str, spec: &LaunchSpec) -> Result<Box<dyn Provider>, ProviderError>;
}
