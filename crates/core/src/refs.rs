//! Per-session element reference table.
//!
//! A snapshot hands the table an ordered list of [`ElementHandle`]s; the
//! table numbers them `e1..eN` and bumps the session [`Epoch`]. Issued refs
//! carry their epoch (`e3:7`), and commands address them as `@e3:7`. Refs
//! from an older epoch are rejected as stale rather than silently resolving
//! to whatever element now holds that ordinal.
//!
//! The bare form `@e<N>` has no epoch of its own. It is accepted only while
//! the table is still on the first epoch it ever issued, where it cannot
//! mean anything else; once a later snapshot or navigation supersedes that
//! epoch, a bare ref is stale.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot generation counter. Never decreases within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
	pub fn next(self) -> Self {
		Epoch(self.0 + 1)
	}
}

impl fmt::Display for Epoch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Provider-side handle for one discovered element.
///
/// `locator` is opaque to the core: whatever string the provider needs to
/// find the element again (a selector, an accessibility id, a node path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
	pub locator: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub role: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

impl ElementHandle {
	pub fn new(locator: impl Into<String>) -> Self {
		Self {
			locator: locator.into(),
			role: None,
			name: None,
		}
	}

	pub fn with_role(mut self, role: impl Into<String>) -> Self {
		self.role = Some(role.into());
		self
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}
}

/// A ref as reported back to the client after a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedRef {
	/// Epoch-scoped token without the `@` sigil, e.g. `e3:7`.
	#[serde(rename = "ref")]
	pub token: String,
	#[serde(flatten)]
	pub element: ElementHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefError {
	#[error("reference {token} was issued in epoch {issued}, current epoch is {current}")]
	Stale { token: String, issued: Epoch, current: Epoch },

	#[error("reference {token} predates epoch {current}; use the epoch-scoped ref from the latest snapshot")]
	Superseded { token: String, current: Epoch },

	#[error("reference {token} does not name an element in epoch {current}")]
	Unknown { token: String, current: Epoch },
}

/// Ordinal and optional pinned epoch parsed from `@e<N>[:<epoch>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RefToken {
	ordinal: usize,
	epoch: Option<Epoch>,
}

impl RefToken {
	fn parse(raw: &str) -> Option<Self> {
		let body = raw.strip_prefix("@e")?;
		let (ordinal, epoch) = match body.split_once(':') {
			Some((ordinal, epoch)) => (ordinal, Some(epoch)),
			None => (body, None),
		};
		let ordinal = parse_digits(ordinal)?;
		let epoch = match epoch {
			Some(epoch) => Some(Epoch(parse_digits(epoch)? as u64)),
			None => None,
		};
		Some(Self { ordinal, epoch })
	}
}

fn parse_digits(raw: &str) -> Option<usize> {
	if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	raw.parse().ok()
}

/// Whether a selector string is meant as an element reference.
///
/// Anything starting with `@e` and a digit is claimed by the reference
/// layer, even if the remainder is malformed; everything else is a plain
/// selector passed straight to the provider.
pub fn is_ref(selector: &str) -> bool {
	selector.strip_prefix("@e").and_then(|rest| rest.bytes().next()).is_some_and(|b| b.is_ascii_digit())
}

#[derive(Debug, Default)]
pub struct ReferenceTable {
	epoch: Epoch,
	entries: Vec<ElementHandle>,
	issued_any: bool,
	/// Epoch in which bare refs are unambiguous, while it is still current.
	bare_epoch: Option<Epoch>,
}

impl ReferenceTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn epoch(&self) -> Epoch {
		self.epoch
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Replaces the table with `elements`, numbered in the given order.
	pub fn issue(&mut self, elements: Vec<ElementHandle>) -> Vec<IssuedRef> {
		self.epoch = self.epoch.next();
		self.entries = elements;
		self.bare_epoch = (!self.issued_any).then_some(self.epoch);
		self.issued_any = true;

		let epoch = self.epoch;
		self.entries
			.iter()
			.enumerate()
			.map(|(index, element)| IssuedRef {
				token: format!("e{}:{epoch}", index + 1),
				element: element.clone(),
			})
			.collect()
	}

	pub fn resolve(&self, raw: &str) -> Result<&ElementHandle, RefError> {
		let unknown = || RefError::Unknown {
			token: raw.to_string(),
			current: self.epoch,
		};

		let token = RefToken::parse(raw).ok_or_else(unknown)?;
		match token.epoch {
			Some(issued) if issued < self.epoch => {
				return Err(RefError::Stale {
					token: raw.to_string(),
					issued,
					current: self.epoch,
				});
			}
			Some(issued) if issued > self.epoch => return Err(unknown()),
			Some(_) => {}
			None if self.bare_epoch == Some(self.epoch) || !self.issued_any => {}
			None => {
				return Err(RefError::Superseded {
					token: raw.to_string(),
					current: self.epoch,
				});
			}
		}

		token.ordinal.checked_sub(1).and_then(|index| self.entries.get(index)).ok_or_else(unknown)
	}

	/// Drops every entry. The epoch advances so issued refs stay stale.
	pub fn invalidate(&mut self) {
		self.entries.clear();
		self.epoch = self.epoch.next();
		self.bare_epoch = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn handles(names: &[&str]) -> Vec<ElementHandle> {
		names.iter().map(|name| ElementHandle::new(format!("#{name}"))).collect()
	}

	#[test]
	fn issue_numbers_in_discovery_order() {
		let mut table = ReferenceTable::new();
		let refs = table.issue(handles(&["a", "b", "c"]));

		assert_eq!(table.epoch(), Epoch(1));
		let tokens: Vec<_> = refs.iter().map(|r| r.token.as_str()).collect();
		assert_eq!(tokens, ["e1:1", "e2:1", "e3:1"]);
		assert_eq!(table.resolve("@e2:1").unwrap().locator, "#b");
		assert_eq!(table.resolve("@e2").unwrap().locator, "#b");
	}

	#[test]
	fn numbering_restarts_each_epoch() {
		let mut table = ReferenceTable::new();
		table.issue(handles(&["a", "b"]));
		let refs = table.issue(handles(&["x"]));

		assert_eq!(refs[0].token, "e1:2");
		assert_eq!(table.epoch(), Epoch(2));
		assert_eq!(table.resolve("@e1:2").unwrap().locator, "#x");
	}

	#[test]
	fn bare_ref_after_resnapshot_is_stale() {
		let mut table = ReferenceTable::new();
		table.issue(handles(&["delete-account"]));
		table.issue(handles(&["confirm-purchase"]));

		assert_eq!(
			table.resolve("@e1").unwrap_err(),
			RefError::Superseded {
				token: "@e1".into(),
				current: Epoch(2)
			}
		);
	}

	#[test]
	fn bare_ref_works_for_first_snapshot_after_navigation() {
		let mut table = ReferenceTable::new();
		table.invalidate();
		table.issue(handles(&["a"]));
		assert_eq!(table.resolve("@e1").unwrap().locator, "#a");
	}

	#[test]
	fn pinned_ref_from_older_epoch_is_stale() {
		let mut table = ReferenceTable::new();
		let first = table.issue(handles(&["a", "b"]));
		table.issue(handles(&["x", "y"]));

		let err = table.resolve(&format!("@{}", first[0].token)).unwrap_err();
		assert_eq!(
			err,
			RefError::Stale {
				token: "@e1:1".into(),
				issued: Epoch(1),
				current: Epoch(2)
			}
		);
	}

	#[test]
	fn pinned_ref_in_current_epoch_resolves() {
		let mut table = ReferenceTable::new();
		table.issue(handles(&["a"]));
		let refs = table.issue(handles(&["x", "y"]));
		assert_eq!(table.resolve(&format!("@{}", refs[1].token)).unwrap().locator, "#y");
	}

	#[test]
	fn out_of_range_and_malformed_are_unknown() {
		let mut table = ReferenceTable::new();
		table.issue(handles(&["a"]));

		for raw in ["@e0", "@e2", "@e1:9", "@e1x", "@e1:", "@e", "e1", "@e-1"] {
			assert!(matches!(table.resolve(raw), Err(RefError::Unknown { .. })), "{raw}");
		}
	}

	#[test]
	fn empty_table_knows_nothing() {
		let table = ReferenceTable::new();
		assert!(matches!(table.resolve("@e1"), Err(RefError::Unknown { .. })));
		assert_eq!(table.epoch(), Epoch(0));
	}

	#[test]
	fn invalidate_discards_and_advances() {
		let mut table = ReferenceTable::new();
		let refs = table.issue(handles(&["a"]));
		table.invalidate();

		assert!(table.is_empty());
		assert!(matches!(table.resolve("@e1"), Err(RefError::Superseded { .. })));
		assert!(matches!(table.resolve(&format!("@{}", refs[0].token)), Err(RefError::Stale { .. })));
	}

	#[test]
	fn ref_detection() {
		assert!(is_ref("@e1"));
		assert!(is_ref("@e12:3"));
		assert!(is_ref("@e1x"));
		assert!(!is_ref("@email"));
		assert!(!is_ref("#btn"));
		assert!(!is_ref("@e"));
	}

	#[test]
	fn issued_ref_serializes_flat() {
		let mut table = ReferenceTable::new();
		let refs = table.issue(vec![ElementHandle::new("#go").with_role("button").with_name("Go")]);
		let value = serde_json::to_value(&refs[0]).unwrap();
		assert_eq!(value, serde_json::json!({"ref": "e1:1", "locator": "#go", "role": "button", "name": "Go"}));
	}
}
