//! Typed, validated commands.
//!
//! A [`Command`] is only ever produced by [`crate::parse`] after both the
//! envelope and shape checks pass, so downstream code never re-checks fields.

use serde::{Deserialize, Deserializer, Serialize};

use crate::cookie::Cookie;
use crate::schema::ActionKind;

/// Session targeted when the envelope does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// One validated unit of the protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
	/// Correlation id, echoed on the response. Never empty.
	pub id: String,
	/// Logical browser/device instance this command targets.
	pub session: String,
	#[serde(flatten)]
	pub action: Action,
}

impl Command {
	pub fn kind(&self) -> ActionKind {
		self.action.kind()
	}
}

/// Command payload, one variant per [`ActionKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
	Navigate(NavigateArgs),
	Back,
	Forward,
	Reload,
	Click(ClickArgs),
	Type(TypeArgs),
	Fill(FillArgs),
	Hover(HoverArgs),
	Select(SelectArgs),
	Press(PressArgs),
	#[serde(rename = "getbyrole")]
	GetByRole(GetByRoleArgs),
	#[serde(rename = "getbytext")]
	GetByText(GetByTextArgs),
	#[serde(rename = "getbylabel")]
	GetByLabel(GetByLabelArgs),
	Wait(WaitArgs),
	Screenshot(ScreenshotArgs),
	Snapshot(SnapshotArgs),
	Pdf(PdfArgs),
	ScreencastStart(ScreencastStartArgs),
	ScreencastStop,
	CookiesGet(CookiesGetArgs),
	CookiesSet(CookiesSetArgs),
	CookiesClear,
	StorageGet(StorageGetArgs),
	StorageSet(StorageSetArgs),
	TabNew(TabNewArgs),
	TabList,
	TabSwitch(TabSwitchArgs),
	TabClose(TabCloseArgs),
	Swipe(SwipeArgs),
	Close,
}

impl Action {
	pub fn kind(&self) -> ActionKind {
		match self {
			Action::Navigate(_) => ActionKind::Navigate,
			Action::Back => ActionKind::Back,
			Action::Forward => ActionKind::Forward,
			Action::Reload => ActionKind::Reload,
			Action::Click(_) => ActionKind::Click,
			Action::Type(_) => ActionKind::Type,
			Action::Fill(_) => ActionKind::Fill,
			Action::Hover(_) => ActionKind::Hover,
			Action::Select(_) => ActionKind::Select,
			Action::Press(_) => ActionKind::Press,
			Action::GetByRole(_) => ActionKind::GetByRole,
			Action::GetByText(_) => ActionKind::GetByText,
			Action::GetByLabel(_) => ActionKind::GetByLabel,
			Action::Wait(_) => ActionKind::Wait,
			Action::Screenshot(_) => ActionKind::Screenshot,
			Action::Snapshot(_) => ActionKind::Snapshot,
			Action::Pdf(_) => ActionKind::Pdf,
			Action::ScreencastStart(_) => ActionKind::ScreencastStart,
			Action::ScreencastStop => ActionKind::ScreencastStop,
			Action::CookiesGet(_) => ActionKind::CookiesGet,
			Action::CookiesSet(_) => ActionKind::CookiesSet,
			Action::CookiesClear => ActionKind::CookiesClear,
			Action::StorageGet(_) => ActionKind::StorageGet,
			Action::StorageSet(_) => ActionKind::StorageSet,
			Action::TabNew(_) => ActionKind::TabNew,
			Action::TabList => ActionKind::TabList,
			Action::TabSwitch(_) => ActionKind::TabSwitch,
			Action::TabClose(_) => ActionKind::TabClose,
			Action::Swipe(_) => ActionKind::Swipe,
			Action::Close => ActionKind::Close,
		}
	}

	/// Selector strings carried by this action, if any.
	///
	/// Used by the session layer to find element references (`@e<N>`)
	/// that need resolving before dispatch.
	pub fn selector(&self) -> Option<&str> {
		match self {
			Action::Click(args) => Some(&args.selector),
			Action::Type(args) => Some(&args.selector),
			Action::Fill(args) => Some(&args.selector),
			Action::Hover(args) => Some(&args.selector),
			Action::Select(args) => Some(&args.selector),
			Action::Press(args) => args.selector.as_deref(),
			Action::Wait(args) => args.selector.as_deref(),
			Action::Screenshot(args) => args.selector.as_deref(),
			Action::Snapshot(args) => args.selector.as_deref(),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
	#[default]
	Load,
	DomContentLoaded,
	NetworkIdle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
	#[default]
	Left,
	Right,
	Middle,
}

/// Interaction applied to the element a semantic locator finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subaction {
	Click,
	Fill,
	Type,
	Hover,
	Check,
}

impl Subaction {
	/// Whether the subaction writes `value` into the element.
	pub fn takes_input(self) -> bool {
		matches!(self, Subaction::Fill | Subaction::Type)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
	Local,
	Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
	Up,
	Down,
	Left,
	Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateArgs {
	pub url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub wait_until: Option<WaitUntil>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickArgs {
	pub selector: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub button: Option<MouseButton>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub click_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeArgs {
	pub selector: String,
	pub text: String,
	/// Delay between keystrokes in milliseconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delay: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillArgs {
	pub selector: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoverArgs {
	pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectArgs {
	pub selector: String,
	#[serde(deserialize_with = "one_or_many")]
	pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressArgs {
	pub key: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetByRoleArgs {
	pub role: String,
	pub subaction: Subaction,
	/// Accessible name filter.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default)]
	pub exact: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetByTextArgs {
	pub text: String,
	pub subaction: Subaction,
	#[serde(default)]
	pub exact: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetByLabelArgs {
	pub label: String,
	pub subaction: Subaction,
	#[serde(default)]
	pub exact: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
}

/// Wait conditions. At least one is always set; when several are set they
/// combine, with `timeout` bounding the wait for the other conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selector: Option<String>,
	/// Milliseconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default)]
	pub full_page: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotArgs {
	/// Only enumerate interactive elements.
	#[serde(default)]
	pub interactive: bool,
	/// Scope the snapshot to a subtree.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfArgs {
	pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreencastStartArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiesGetArgs {
	#[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
	pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookiesSetArgs {
	pub cookies: Vec<Cookie>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageGetArgs {
	#[serde(rename = "type")]
	pub area: StorageArea,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSetArgs {
	#[serde(rename = "type")]
	pub area: StorageArea,
	pub key: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabNewArgs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSwitchArgs {
	pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabCloseArgs {
	/// Defaults to the active tab.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeArgs {
	pub direction: SwipeDirection,
	/// Pixels.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub distance: Option<u64>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}

	Ok(match OneOrMany::deserialize(deserializer)? {
		OneOrMany::One(value) => vec![value],
		OneOrMany::Many(values) => values,
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::schema;

	#[test]
	fn enum_value_sets_match_serde_names() {
		for name in schema::WAIT_UNTIL {
			serde_json::from_value::<WaitUntil>(json!(name)).unwrap();
		}
		for name in schema::MOUSE_BUTTONS {
			serde_json::from_value::<MouseButton>(json!(name)).unwrap();
		}
		for name in schema::SUBACTIONS {
			serde_json::from_value::<Subaction>(json!(name)).unwrap();
		}
		for name in schema::STORAGE_AREAS {
			serde_json::from_value::<StorageArea>(json!(name)).unwrap();
		}
		for name in schema::SWIPE_DIRECTIONS {
			serde_json::from_value::<SwipeDirection>(json!(name)).unwrap();
		}
		for name in schema::SAME_SITE {
			serde_json::from_value::<crate::cookie::SameSite>(json!(name)).unwrap();
		}
	}

	#[test]
	fn input_subactions_match_takes_input() {
		for name in schema::SUBACTIONS {
			let sub: Subaction = serde_json::from_value(json!(name)).unwrap();
			assert_eq!(sub.takes_input(), schema::INPUT_SUBACTIONS.contains(name));
		}
	}

	#[test]
	fn select_accepts_single_value() {
		let args: SelectArgs = serde_json::from_value(json!({"selector": "#s", "values": "a"})).unwrap();
		assert_eq!(args.values, vec!["a".to_string()]);
	}

	#[test]
	fn command_serializes_with_action_tag() {
		let command = Command {
			id: "7".into(),
			session: DEFAULT_SESSION.into(),
			action: Action::GetByRole(GetByRoleArgs {
				role: "button".into(),
				subaction: Subaction::Click,
				name: None,
				exact: false,
				value: None,
			}),
		};

		let value = serde_json::to_value(&command).unwrap();
		assert_eq!(value["action"], "getbyrole");
		assert_eq!(value["role"], "button");
		assert_eq!(value["id"], "7");
	}
}
