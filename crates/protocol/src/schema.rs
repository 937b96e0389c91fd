//! Action catalog: field requirements for every command shape.
//!
//! The registry is pure data. The validator in [`crate::parse`] walks an
//! [`ActionSchema`] to decide whether a raw object is a well-formed command;
//! nothing else in the workspace consults it.
//!
//! Lookups are exact and case-sensitive: `"Navigate"` is not `"navigate"`.

use std::fmt;

/// Discriminant of every command shape the protocol accepts.
///
/// Aliases (`open`, `tap`) map onto an existing kind; they do not introduce
/// a new shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
	Navigate,
	Back,
	Forward,
	Reload,
	Click,
	Type,
	Fill,
	Hover,
	Select,
	Press,
	GetByRole,
	GetByText,
	GetByLabel,
	Wait,
	Screenshot,
	Snapshot,
	Pdf,
	ScreencastStart,
	ScreencastStop,
	CookiesGet,
	CookiesSet,
	CookiesClear,
	StorageGet,
	StorageSet,
	TabNew,
	TabList,
	TabSwitch,
	TabClose,
	Swipe,
	Close,
}

impl ActionKind {
	/// Canonical wire name.
	pub fn name(self) -> &'static str {
		match self {
			ActionKind::Navigate => "navigate",
			ActionKind::Back => "back",
			ActionKind::Forward => "forward",
			ActionKind::Reload => "reload",
			ActionKind::Click => "click",
			ActionKind::Type => "type",
			ActionKind::Fill => "fill",
			ActionKind::Hover => "hover",
			ActionKind::Select => "select",
			ActionKind::Press => "press",
			ActionKind::GetByRole => "getbyrole",
			ActionKind::GetByText => "getbytext",
			ActionKind::GetByLabel => "getbylabel",
			ActionKind::Wait => "wait",
			ActionKind::Screenshot => "screenshot",
			ActionKind::Snapshot => "snapshot",
			ActionKind::Pdf => "pdf",
			ActionKind::ScreencastStart => "screencast_start",
			ActionKind::ScreencastStop => "screencast_stop",
			ActionKind::CookiesGet => "cookies_get",
			ActionKind::CookiesSet => "cookies_set",
			ActionKind::CookiesClear => "cookies_clear",
			ActionKind::StorageGet => "storage_get",
			ActionKind::StorageSet => "storage_set",
			ActionKind::TabNew => "tab_new",
			ActionKind::TabList => "tab_list",
			ActionKind::TabSwitch => "tab_switch",
			ActionKind::TabClose => "tab_close",
			ActionKind::Swipe => "swipe",
			ActionKind::Close => "close",
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Grouping used for documentation and `abr actions` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
	Navigation,
	Interaction,
	SemanticLocator,
	Waiting,
	Capture,
	Cookies,
	Storage,
	Tabs,
	Gestures,
	Lifecycle,
}

impl fmt::Display for Family {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Family::Navigation => "navigation",
			Family::Interaction => "interaction",
			Family::SemanticLocator => "semantic-locator",
			Family::Waiting => "waiting",
			Family::Capture => "capture",
			Family::Cookies => "cookies",
			Family::Storage => "storage",
			Family::Tabs => "tabs",
			Family::Gestures => "gestures",
			Family::Lifecycle => "lifecycle",
		};
		f.write_str(name)
	}
}

/// Primitive shape a field value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
	/// Any string, including `""`.
	String,
	/// A string with at least one character. `""` is treated as absent.
	NonEmptyString,
	Bool,
	/// Unsigned integer `>= 1`. Numeric strings are rejected.
	PositiveInt,
	/// Unsigned integer `>= 0`.
	NonNegativeInt,
	/// One of a closed, case-sensitive set of strings.
	Enum(&'static [&'static str]),
	/// Ordered array of cookie objects, each with string `name` and `value`.
	Cookies,
	/// A string or a non-empty array of strings.
	Strings,
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldType::String => f.write_str("string"),
			FieldType::NonEmptyString => f.write_str("non-empty string"),
			FieldType::Bool => f.write_str("boolean"),
			FieldType::PositiveInt => f.write_str("positive integer"),
			FieldType::NonNegativeInt => f.write_str("non-negative integer"),
			FieldType::Enum(values) => write!(f, "one of {}", values.join("|")),
			FieldType::Cookies => f.write_str("array of cookies"),
			FieldType::Strings => f.write_str("string or array of strings"),
		}
	}
}

/// A named, typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
	pub name: &'static str,
	pub ty: FieldType,
}

impl FieldSpec {
	pub const fn new(name: &'static str, ty: FieldType) -> Self {
		Self { name, ty }
	}
}

/// Constraints that span more than one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
	/// At least one of the listed fields must be present.
	AtLeastOneOf(&'static [&'static str]),
	/// At most one of the listed fields may be present.
	AtMostOneOf(&'static [&'static str]),
	/// `then` is required whenever `field` holds one of `values`.
	RequiredWhen {
		field: &'static str,
		values: &'static [&'static str],
		then: &'static str,
	},
}

/// Field requirements for one action.
#[derive(Debug, Clone, Copy)]
pub struct ActionSchema {
	/// Wire names accepted for this shape; the first is canonical.
	pub names: &'static [&'static str],
	pub kind: ActionKind,
	pub family: Family,
	pub required: &'static [FieldSpec],
	pub optional: &'static [FieldSpec],
	pub rules: &'static [Rule],
}

impl ActionSchema {
	/// Canonical wire name.
	pub fn name(&self) -> &'static str {
		self.names[0]
	}

	/// Looks up a declared field, required or optional.
	pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
		self.required.iter().chain(self.optional.iter()).find(|spec| spec.name == name)
	}
}

pub const WAIT_UNTIL: &[&str] = &["load", "domcontentloaded", "networkidle"];
pub const MOUSE_BUTTONS: &[&str] = &["left", "right", "middle"];
pub const SUBACTIONS: &[&str] = &["click", "fill", "type", "hover", "check"];
/// Subactions that write text into the located element.
pub const INPUT_SUBACTIONS: &[&str] = &["fill", "type"];
pub const STORAGE_AREAS: &[&str] = &["local", "session"];
pub const SWIPE_DIRECTIONS: &[&str] = &["up", "down", "left", "right"];
pub const SAME_SITE: &[&str] = &["Strict", "Lax", "None"];

const SELECTOR: FieldSpec = FieldSpec::new("selector", FieldType::NonEmptyString);
const PATH: FieldSpec = FieldSpec::new("path", FieldType::String);
const SUBACTION: FieldSpec = FieldSpec::new("subaction", FieldType::Enum(SUBACTIONS));
const LOCATOR_VALUE: FieldSpec = FieldSpec::new("value", FieldType::String);
const EXACT: FieldSpec = FieldSpec::new("exact", FieldType::Bool);
const STORAGE_TYPE: FieldSpec = FieldSpec::new("type", FieldType::Enum(STORAGE_AREAS));
const TAB_INDEX: FieldSpec = FieldSpec::new("index", FieldType::NonNegativeInt);
const VALUE_FOR_INPUT: Rule = Rule::RequiredWhen {
	field: "subaction",
	values: INPUT_SUBACTIONS,
	then: "value",
};

const fn bare(names: &'static [&'static str], kind: ActionKind, family: Family) -> ActionSchema {
	ActionSchema {
		names,
		kind,
		family,
		required: &[],
		optional: &[],
		rules: &[],
	}
}

static REGISTRY: &[ActionSchema] = &[
	ActionSchema {
		names: &["navigate", "open"],
		kind: ActionKind::Navigate,
		family: Family::Navigation,
		required: &[FieldSpec::new("url", FieldType::NonEmptyString)],
		optional: &[FieldSpec::new("waitUntil", FieldType::Enum(WAIT_UNTIL))],
		rules: &[],
	},
	bare(&["back"], ActionKind::Back, Family::Navigation),
	bare(&["forward"], ActionKind::Forward, Family::Navigation),
	bare(&["reload"], ActionKind::Reload, Family::Navigation),
	ActionSchema {
		names: &["click", "tap"],
		kind: ActionKind::Click,
		family: Family::Interaction,
		required: &[SELECTOR],
		optional: &[
			FieldSpec::new("button", FieldType::Enum(MOUSE_BUTTONS)),
			FieldSpec::new("clickCount", FieldType::PositiveInt),
		],
		rules: &[],
	},
	ActionSchema {
		names: &["type"],
		kind: ActionKind::Type,
		family: Family::Interaction,
		required: &[SELECTOR, FieldSpec::new("text", FieldType::String)],
		optional: &[FieldSpec::new("delay", FieldType::NonNegativeInt)],
		rules: &[],
	},
	ActionSchema {
		names: &["fill"],
		kind: ActionKind::Fill,
		family: Family::Interaction,
		required: &[SELECTOR, FieldSpec::new("value", FieldType::String)],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["hover"],
		kind: ActionKind::Hover,
		family: Family::Interaction,
		required: &[SELECTOR],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["select"],
		kind: ActionKind::Select,
		family: Family::Interaction,
		required: &[SELECTOR, FieldSpec::new("values", FieldType::Strings)],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["press"],
		kind: ActionKind::Press,
		family: Family::Interaction,
		required: &[FieldSpec::new("key", FieldType::NonEmptyString)],
		optional: &[SELECTOR],
		rules: &[],
	},
	ActionSchema {
		names: &["getbyrole"],
		kind: ActionKind::GetByRole,
		family: Family::SemanticLocator,
		required: &[FieldSpec::new("role", FieldType::NonEmptyString), SUBACTION],
		optional: &[FieldSpec::new("name", FieldType::String), EXACT, LOCATOR_VALUE],
		rules: &[VALUE_FOR_INPUT],
	},
	ActionSchema {
		names: &["getbytext"],
		kind: ActionKind::GetByText,
		family: Family::SemanticLocator,
		required: &[FieldSpec::new("text", FieldType::NonEmptyString), SUBACTION],
		optional: &[EXACT, LOCATOR_VALUE],
		rules: &[VALUE_FOR_INPUT],
	},
	ActionSchema {
		names: &["getbylabel"],
		kind: ActionKind::GetByLabel,
		family: Family::SemanticLocator,
		required: &[FieldSpec::new("label", FieldType::NonEmptyString), SUBACTION],
		optional: &[EXACT, LOCATOR_VALUE],
		rules: &[VALUE_FOR_INPUT],
	},
	ActionSchema {
		names: &["wait"],
		kind: ActionKind::Wait,
		family: Family::Waiting,
		required: &[],
		optional: &[
			SELECTOR,
			FieldSpec::new("timeout", FieldType::PositiveInt),
			FieldSpec::new("text", FieldType::NonEmptyString),
		],
		rules: &[Rule::AtLeastOneOf(&["selector", "timeout", "text"])],
	},
	ActionSchema {
		names: &["screenshot"],
		kind: ActionKind::Screenshot,
		family: Family::Capture,
		required: &[],
		optional: &[PATH, FieldSpec::new("fullPage", FieldType::Bool), SELECTOR],
		rules: &[],
	},
	ActionSchema {
		names: &["snapshot"],
		kind: ActionKind::Snapshot,
		family: Family::Capture,
		required: &[],
		optional: &[FieldSpec::new("interactive", FieldType::Bool), SELECTOR],
		rules: &[],
	},
	ActionSchema {
		names: &["pdf"],
		kind: ActionKind::Pdf,
		family: Family::Capture,
		required: &[FieldSpec::new("path", FieldType::NonEmptyString)],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["screencast_start"],
		kind: ActionKind::ScreencastStart,
		family: Family::Capture,
		required: &[],
		optional: &[PATH],
		rules: &[],
	},
	bare(&["screencast_stop"], ActionKind::ScreencastStop, Family::Capture),
	ActionSchema {
		names: &["cookies_get"],
		kind: ActionKind::CookiesGet,
		family: Family::Cookies,
		required: &[],
		optional: &[FieldSpec::new("urls", FieldType::Strings)],
		rules: &[],
	},
	ActionSchema {
		names: &["cookies_set"],
		kind: ActionKind::CookiesSet,
		family: Family::Cookies,
		required: &[FieldSpec::new("cookies", FieldType::Cookies)],
		optional: &[],
		rules: &[],
	},
	bare(&["cookies_clear"], ActionKind::CookiesClear, Family::Cookies),
	ActionSchema {
		names: &["storage_get"],
		kind: ActionKind::StorageGet,
		family: Family::Storage,
		required: &[STORAGE_TYPE],
		optional: &[FieldSpec::new("key", FieldType::String)],
		rules: &[],
	},
	ActionSchema {
		names: &["storage_set"],
		kind: ActionKind::StorageSet,
		family: Family::Storage,
		required: &[
			STORAGE_TYPE,
			FieldSpec::new("key", FieldType::NonEmptyString),
			FieldSpec::new("value", FieldType::String),
		],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["tab_new"],
		kind: ActionKind::TabNew,
		family: Family::Tabs,
		required: &[],
		optional: &[FieldSpec::new("url", FieldType::NonEmptyString)],
		rules: &[],
	},
	bare(&["tab_list"], ActionKind::TabList, Family::Tabs),
	ActionSchema {
		names: &["tab_switch"],
		kind: ActionKind::TabSwitch,
		family: Family::Tabs,
		required: &[TAB_INDEX],
		optional: &[],
		rules: &[],
	},
	ActionSchema {
		names: &["tab_close"],
		kind: ActionKind::TabClose,
		family: Family::Tabs,
		required: &[],
		optional: &[TAB_INDEX],
		rules: &[],
	},
	ActionSchema {
		names: &["swipe"],
		kind: ActionKind::Swipe,
		family: Family::Gestures,
		required: &[FieldSpec::new("direction", FieldType::Enum(SWIPE_DIRECTIONS))],
		optional: &[FieldSpec::new("distance", FieldType::PositiveInt)],
		rules: &[],
	},
	bare(&["close"], ActionKind::Close, Family::Lifecycle),
];

/// Returns the schema registered under `action`, matching names exactly.
pub fn schema_for(action: &str) -> Option<&'static ActionSchema> {
	REGISTRY.iter().find(|schema| schema.names.contains(&action))
}

/// Every registered schema, in catalog order.
pub fn schemas() -> &'static [ActionSchema] {
	REGISTRY
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn lookup_by_canonical_name() {
		assert_eq!(schema_for("navigate").map(|s| s.kind), Some(ActionKind::Navigate));
		assert_eq!(schema_for("tab_switch").map(|s| s.kind), Some(ActionKind::TabSwitch));
		assert_eq!(schema_for("getbylabel").map(|s| s.kind), Some(ActionKind::GetByLabel));
	}

	#[test]
	fn lookup_by_alias() {
		assert_eq!(schema_for("open").map(|s| s.kind), Some(ActionKind::Navigate));
		assert_eq!(schema_for("tap").map(|s| s.kind), Some(ActionKind::Click));
		assert_eq!(schema_for("open").map(|s| s.name()), Some("navigate"));
	}

	#[test]
	fn lookup_is_case_sensitive() {
		assert!(schema_for("Navigate").is_none());
		assert!(schema_for("CLICK").is_none());
		assert!(schema_for("").is_none());
		assert!(schema_for("unknown").is_none());
	}

	#[test]
	fn names_are_unique_and_canonical_matches_kind() {
		let mut seen = HashSet::new();
		for schema in schemas() {
			assert_eq!(schema.name(), schema.kind.name());
			for name in schema.names {
				assert!(seen.insert(*name), "duplicate action name {name}");
			}
		}
	}

	#[test]
	fn every_kind_is_registered_once() {
		let kinds: HashSet<_> = schemas().iter().map(|s| s.kind).collect();
		assert_eq!(kinds.len(), schemas().len());
		assert_eq!(kinds.len(), 30);
	}

	#[test]
	fn rule_fields_are_declared() {
		for schema in schemas() {
			for rule in schema.rules {
				let fields: Vec<&str> = match rule {
					Rule::AtLeastOneOf(fields) | Rule::AtMostOneOf(fields) => fields.to_vec(),
					Rule::RequiredWhen { field, then, .. } => vec![*field, *then],
				};
				for field in fields {
					assert!(schema.field(field).is_some(), "{} rule names undeclared field {field}", schema.name());
				}
			}
		}
	}
}
